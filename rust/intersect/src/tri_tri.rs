// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle-triangle intersection
//!
//! [`TriangleIntersector`] is the seam the pairwise pass calls for every
//! triangle pair. [`TriTriIntersector`] is the default implementation: it
//! rejects pairs that lie on one side of the other's plane, gathers every
//! point where an edge of one triangle crosses the other triangle, and
//! reports the two points farthest apart as the intersection segment.
//! Triangles touching at a single point yield a degenerate segment with
//! `start == end`.

use crate::config::EPS_TINY;
use crate::error::Result;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Result of testing two triangles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionSegment {
    pub has_intersection: bool,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl IntersectionSegment {
    /// No intersection
    pub fn none() -> Self {
        Self {
            has_intersection: false,
            start: Point3::origin(),
            end: Point3::origin(),
        }
    }

    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            has_intersection: true,
            start,
            end,
        }
    }

    /// Intersection collapsed to a single point
    pub fn point(p: Point3<f64>) -> Self {
        Self::new(p, p)
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    #[inline]
    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.length() <= epsilon
    }
}

/// Triangle-triangle intersection primitive
pub trait TriangleIntersector {
    /// Intersect triangle `a` with triangle `b` (world coordinates)
    fn intersect(
        &self,
        a: &[Point3<f64>; 3],
        b: &[Point3<f64>; 3],
    ) -> Result<IntersectionSegment>;
}

/// Default [`TriangleIntersector`]
#[derive(Debug, Clone, Copy)]
pub struct TriTriIntersector {
    /// Length tolerance relative to the larger triangle extent
    pub tolerance: f64,
}

impl TriTriIntersector {
    pub fn new() -> Self {
        Self { tolerance: EPS_TINY }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for TriTriIntersector {
    fn default() -> Self {
        Self::new()
    }
}

impl TriangleIntersector for TriTriIntersector {
    fn intersect(
        &self,
        a: &[Point3<f64>; 3],
        b: &[Point3<f64>; 3],
    ) -> Result<IntersectionSegment> {
        Ok(intersect_triangles(a, b, self.tolerance))
    }
}

/// Unit normal of a triangle, `None` for zero-area input
#[inline]
pub fn triangle_normal(tri: &[Point3<f64>; 3]) -> Option<Vector3<f64>> {
    (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).try_normalize(0.0)
}

#[inline]
fn longest_edge(tri: &[Point3<f64>; 3]) -> f64 {
    (tri[1] - tri[0])
        .norm()
        .max((tri[2] - tri[1]).norm())
        .max((tri[0] - tri[2]).norm())
}

/// Classify a signed distance as -1, 0, or +1 with tolerance
#[inline]
fn classify(d: f64, tol: f64) -> i8 {
    if d > tol {
        1
    } else if d < -tol {
        -1
    } else {
        0
    }
}

#[inline]
fn all_one_side(signs: &[i8; 3]) -> bool {
    signs[0] != 0 && signs[0] == signs[1] && signs[1] == signs[2]
}

/// Intersect two triangles
///
/// `tolerance` is relative to the longest edge of either triangle. Coplanar
/// pairs and zero-area triangles report no intersection.
pub fn intersect_triangles(
    a: &[Point3<f64>; 3],
    b: &[Point3<f64>; 3],
    tolerance: f64,
) -> IntersectionSegment {
    let extent = longest_edge(a).max(longest_edge(b));
    if !extent.is_finite() || extent <= 0.0 {
        return IntersectionSegment::none();
    }
    let tol = tolerance * extent;

    let (Some(na), Some(nb)) = (triangle_normal(a), triangle_normal(b)) else {
        return IntersectionSegment::none();
    };

    // Signed distances of each triangle's corners to the other's plane
    let da = a.map(|p| nb.dot(&(p - b[0])));
    let sa = da.map(|d| classify(d, tol));
    if all_one_side(&sa) {
        return IntersectionSegment::none();
    }

    let db = b.map(|p| na.dot(&(p - a[0])));
    let sb = db.map(|d| classify(d, tol));
    if all_one_side(&sb) {
        return IntersectionSegment::none();
    }

    if sa == [0, 0, 0] || sb == [0, 0, 0] {
        return IntersectionSegment::none();
    }

    let mut points: SmallVec<[Point3<f64>; 8]> = SmallVec::new();
    edge_crossings(a, &da, &sa, b, &nb, tol, &mut points);
    edge_crossings(b, &db, &sb, a, &na, tol, &mut points);

    let mut unique: SmallVec<[Point3<f64>; 6]> = SmallVec::new();
    for p in points {
        if !unique.iter().any(|q| (p - q).norm() <= tol) {
            unique.push(p);
        }
    }

    match unique.len() {
        0 => IntersectionSegment::none(),
        1 => IntersectionSegment::point(unique[0]),
        _ => {
            let mut best = (0, 1);
            let mut best_dist = 0.0;
            for i in 0..unique.len() {
                for j in i + 1..unique.len() {
                    let dist = (unique[j] - unique[i]).norm_squared();
                    if dist > best_dist {
                        best_dist = dist;
                        best = (i, j);
                    }
                }
            }
            IntersectionSegment::new(unique[best.0], unique[best.1])
        }
    }
}

/// Points where the edges of `tri` meet triangle `other`
fn edge_crossings(
    tri: &[Point3<f64>; 3],
    dists: &[f64; 3],
    signs: &[i8; 3],
    other: &[Point3<f64>; 3],
    other_normal: &Vector3<f64>,
    tol: f64,
    out: &mut SmallVec<[Point3<f64>; 8]>,
) {
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (p, q) = (tri[i], tri[j]);

        let candidate = match (signs[i], signs[j]) {
            (0, 0) => {
                // Edge lies in the other plane
                if let Some((s, e)) = clip_segment_to_triangle(&p, &q, other, other_normal, tol) {
                    out.push(s);
                    out.push(e);
                }
                continue;
            }
            (0, _) => p,
            (_, 0) => q,
            (si, sj) if si != sj => {
                let t = dists[i] / (dists[i] - dists[j]);
                p + (q - p) * t
            }
            _ => continue,
        };

        if point_in_triangle(&candidate, other, other_normal, tol) {
            out.push(candidate);
        }
    }
}

/// Inward edge normal of a triangle wound counter-clockwise about `normal`
#[inline]
fn inward_normal(tri: &[Point3<f64>; 3], k: usize, normal: &Vector3<f64>) -> Vector3<f64> {
    let edge = tri[(k + 1) % 3] - tri[k];
    normal.cross(&edge).normalize()
}

/// Test a point lying (approximately) in the triangle's plane
fn point_in_triangle(
    p: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    tol: f64,
) -> bool {
    (0..3).all(|k| inward_normal(tri, k, normal).dot(&(p - tri[k])) >= -tol)
}

/// Clip a segment lying in the triangle's plane to the triangle
fn clip_segment_to_triangle(
    p: &Point3<f64>,
    q: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    tol: f64,
) -> Option<(Point3<f64>, Point3<f64>)> {
    let dir = q - p;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    for k in 0..3 {
        let m = inward_normal(tri, k, normal);
        let num = m.dot(&(p - tri[k])) + tol;
        let den = m.dot(&dir);

        if den.abs() <= f64::EPSILON * dir.norm() {
            if num < 0.0 {
                return None;
            }
        } else if den > 0.0 {
            t0 = t0.max(-num / den);
        } else {
            t1 = t1.min(-num / den);
        }

        if t0 > t1 {
            return None;
        }
    }

    Some((p + dir * t0, p + dir * t1))
}
