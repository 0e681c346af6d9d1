// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary loops in a triangle's local frame
//!
//! Each intersection record of a triangle becomes one [`Loop`]: either a
//! single point (the segment is no longer than `loop_epsilon` in model units)
//! or an oriented edge.
//! Loops of one triangle are independent fragments; nothing here assumes
//! they chain into a closed polygon.

use crate::config::{IntersectConfig, LoopWinding};
use crate::intersection::MeshIntersectionRecord;
use crate::projection::LocalFrame;
use nalgebra::{Point2, Point3, Vector3};

/// Binormal lengths below this are treated as parallel planes
const PARALLEL_EPSILON: f64 = 1e-12;

/// Intersection boundary fragment in local 2D coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loop {
    /// Segment that collapsed to a point
    Point(Point2<f64>),
    /// Oriented edge
    Edge {
        start: Point2<f64>,
        end: Point2<f64>,
    },
}

impl Loop {
    #[inline]
    pub fn is_point(&self) -> bool {
        matches!(self, Loop::Point(_))
    }

    /// First point of the loop
    #[inline]
    pub fn start(&self) -> Point2<f64> {
        match *self {
            Loop::Point(p) => p,
            Loop::Edge { start, .. } => start,
        }
    }
}

/// Convert the records of triangle (a, b, c) into local-frame loops
///
/// Output order follows record order.
pub fn build_loops(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    records: &[MeshIntersectionRecord],
    config: &IntersectConfig,
) -> Vec<Loop> {
    let frame = LocalFrame::new(a, b, c, config.projection_scale);

    records
        .iter()
        .map(|record| {
            let seg = &record.segment;
            let ps = frame.project(&seg.start);
            let pe = frame.project(&seg.end);

            // Measured before conditioning: local lengths are 1/scale of model lengths
            if (seg.end - seg.start).norm() <= config.loop_epsilon {
                return Loop::Point(ps);
            }

            let keep_order = match config.loop_winding {
                LoopWinding::Preserved => true,
                LoopWinding::Reversed => false,
                LoopWinding::Computed => {
                    follows_cut_direction(&frame.normal, &record.other_normal, &(seg.end - seg.start))
                }
            };

            if keep_order {
                Loop::Edge { start: ps, end: pe }
            } else {
                Loop::Edge { start: pe, end: ps }
            }
        })
        .collect()
}

/// True when `direction` runs along `own_normal × other_normal`
///
/// Degenerate binormals keep the reported order.
fn follows_cut_direction(
    own_normal: &Vector3<f64>,
    other_normal: &Vector3<f64>,
    direction: &Vector3<f64>,
) -> bool {
    let binormal = own_normal.cross(other_normal);
    if !(binormal.norm() > PARALLEL_EPSILON) {
        return true;
    }
    direction.dot(&binormal) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tri_tri::IntersectionSegment;
    use approx::assert_relative_eq;

    fn ground() -> [Point3<f64>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    fn record(start: Point3<f64>, end: Point3<f64>, other_normal: Vector3<f64>) -> MeshIntersectionRecord {
        MeshIntersectionRecord {
            segment: IntersectionSegment::new(start, end),
            other_triangle_index: 0,
            other_normal,
        }
    }

    fn config(winding: LoopWinding) -> IntersectConfig {
        IntersectConfig::new().with_loop_winding(winding)
    }

    #[test]
    fn test_collapsed_segment_becomes_point() {
        let [a, b, c] = ground();
        let p = Point3::new(0.25, 0.25, 0.0);
        let q = Point3::new(0.25 + 5e-8, 0.25, 0.0);
        let loops = build_loops(&a, &b, &c, &[record(p, q, Vector3::y())], &IntersectConfig::new());

        assert_eq!(loops.len(), 1);
        assert!(loops[0].is_point());
        assert_relative_eq!(loops[0].start(), Point2::new(0.00025, 0.00025), epsilon = 1e-15);
    }

    #[test]
    fn test_short_cut_above_weld_radius_stays_an_edge() {
        let [a, b, c] = ground();
        let config = IntersectConfig::new();
        // 1e-4 model units: far above the weld radius, 1e-7 once conditioned
        for len in [1e-4, 1e-5, 1e-6] {
            let p = Point3::new(0.25, 0.25, 0.0);
            let q = Point3::new(0.25 + len, 0.25, 0.0);
            assert!(len > config.weld_radius);

            let loops = build_loops(&a, &b, &c, &[record(p, q, Vector3::y())], &config);
            match loops[0] {
                Loop::Edge { start, end } => {
                    assert_relative_eq!((end - start).norm(), len / 1000.0, epsilon = 1e-15);
                }
                Loop::Point(_) => panic!("cut of length {len} collapsed"),
            }
        }
    }

    #[test]
    fn test_millimetre_preset_collapses_the_same_cuts() {
        let scale = 1000.0;
        let [a, b, c] = ground().map(|p| Point3::from(p.coords * scale));
        let config = IntersectConfig::for_millimetres();

        let p = Point3::new(250.0, 250.0, 0.0);
        let short = Point3::new(250.0 + 5e-5, 250.0, 0.0);
        let long = Point3::new(250.0 + 1e-3, 250.0, 0.0);
        let loops = build_loops(
            &a,
            &b,
            &c,
            &[record(p, short, Vector3::y()), record(p, long, Vector3::y())],
            &config,
        );
        assert!(loops[0].is_point());
        assert!(!loops[1].is_point());
    }

    #[test]
    fn test_reversed_winding_swaps_endpoints() {
        let [a, b, c] = ground();
        let s = Point3::new(0.2, 0.25, 0.0);
        let e = Point3::new(0.45, 0.25, 0.0);
        let loops = build_loops(&a, &b, &c, &[record(s, e, Vector3::y())], &config(LoopWinding::Reversed));

        match loops[0] {
            Loop::Edge { start, end } => {
                assert_relative_eq!(start, Point2::new(0.00045, 0.00025), epsilon = 1e-15);
                assert_relative_eq!(end, Point2::new(0.0002, 0.00025), epsilon = 1e-15);
            }
            Loop::Point(_) => panic!("expected an edge loop"),
        }
    }

    #[test]
    fn test_preserved_winding_keeps_endpoints() {
        let [a, b, c] = ground();
        let s = Point3::new(0.2, 0.25, 0.0);
        let e = Point3::new(0.45, 0.25, 0.0);
        let loops = build_loops(&a, &b, &c, &[record(s, e, Vector3::y())], &config(LoopWinding::Preserved));
        assert_relative_eq!(loops[0].start(), Point2::new(0.0002, 0.00025), epsilon = 1e-15);
    }

    #[test]
    fn test_computed_winding_follows_binormal() {
        let [a, b, c] = ground();
        let s = Point3::new(0.2, 0.25, 0.0);
        let e = Point3::new(0.45, 0.25, 0.0);
        let cfg = config(LoopWinding::Computed);

        // z × y = -x: the edge must run towards -x
        let with_y = build_loops(&a, &b, &c, &[record(s, e, Vector3::y())], &cfg);
        let with_neg_y = build_loops(&a, &b, &c, &[record(s, e, -Vector3::y())], &cfg);

        match (with_y[0], with_neg_y[0]) {
            (Loop::Edge { start: s1, end: e1 }, Loop::Edge { start: s2, end: e2 }) => {
                assert!(e1.x < s1.x);
                assert!(e2.x > s2.x);
            }
            _ => panic!("expected edge loops"),
        }
    }

    #[test]
    fn test_computed_winding_is_opposite_across_meshes() {
        // Shared cut along x between the ground (normal +z) and a wall (normal -y)
        let n_ground = Vector3::z();
        let n_wall = -Vector3::y();
        let dir = Vector3::x();
        assert_ne!(
            follows_cut_direction(&n_ground, &n_wall, &dir),
            follows_cut_direction(&n_wall, &n_ground, &dir)
        );
    }

    #[test]
    fn test_parallel_normals_keep_order() {
        assert!(follows_cut_direction(&Vector3::z(), &Vector3::z(), &-Vector3::x()));
        assert!(follows_cut_direction(&Vector3::z(), &Vector3::zeros(), &-Vector3::x()));
    }

    #[test]
    fn test_loops_follow_record_order() {
        let [a, b, c] = ground();
        let records = [
            record(Point3::new(0.1, 0.1, 0.0), Point3::new(0.1, 0.1, 0.0), Vector3::x()),
            record(Point3::new(0.1, 0.5, 0.0), Point3::new(0.4, 0.5, 0.0), Vector3::y()),
        ];
        let loops = build_loops(&a, &b, &c, &records, &IntersectConfig::new());
        assert_eq!(loops.len(), 2);
        assert!(loops[0].is_point());
        assert!(!loops[1].is_point());
    }
}
