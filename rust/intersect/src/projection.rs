// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle-local 2D frames
//!
//! A triangle (a, b, c) defines an orthonormal basis in its own plane: the
//! first axis runs along `b - a`, the second is `normal × first`, so `c`
//! always projects to a positive second coordinate and the projected
//! triangle is counter-clockwise. Coordinates are divided by a conditioning
//! factor on the way in and multiplied by it on the way out.
//!
//! Both directions rebuild the basis from the corners; callers must pass the
//! same (a, b, c) in the same order to get a round trip. Zero-area triangles
//! produce NaN.

use nalgebra::{Point2, Point3, Vector3};

/// Orthonormal basis tangent to a triangle
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    pub origin: Point3<f64>,
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub scale: f64,
}

impl LocalFrame {
    /// Build the frame of triangle (a, b, c)
    #[inline]
    pub fn new(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, scale: f64) -> Self {
        let u_axis = (b - a).normalize();
        let raw_v = (c - a).normalize();

        let normal = u_axis.cross(&raw_v).normalize();
        let v_axis = normal.cross(&u_axis);

        Self {
            origin: *a,
            u_axis,
            v_axis,
            normal,
            scale,
        }
    }

    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Point2<f64> {
        let rel = point - self.origin;
        Point2::new(
            self.u_axis.dot(&rel) / self.scale,
            self.v_axis.dot(&rel) / self.scale,
        )
    }

    #[inline]
    pub fn unproject(&self, point: &Point2<f64>) -> Point3<f64> {
        self.origin + self.u_axis * (point.x * self.scale) + self.v_axis * (point.y * self.scale)
    }
}

/// Map `point` into the local frame of triangle (a, b, c)
#[inline]
pub fn project_to_local_2d(
    point: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    scale: f64,
) -> Point2<f64> {
    LocalFrame::new(a, b, c, scale).project(point)
}

/// Map a local-frame point of triangle (a, b, c) back to 3D
#[inline]
pub fn unproject_from_local_2d(
    point: &Point2<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    scale: f64,
) -> Point3<f64> {
    LocalFrame::new(a, b, c, scale).unproject(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROJECTION_SCALE;
    use approx::assert_relative_eq;

    const S: f64 = DEFAULT_PROJECTION_SCALE;

    fn tilted() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(12.5, -3.0, 7.25),
            Point3::new(15.0, 1.0, 6.0),
            Point3::new(11.0, 2.5, 9.5),
        )
    }

    #[test]
    fn test_corners_round_trip() {
        let (a, b, c) = tilted();
        for p in [a, b, c] {
            let local = project_to_local_2d(&p, &a, &b, &c, S);
            let back = unproject_from_local_2d(&local, &a, &b, &c, S);
            assert_relative_eq!(back, p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_projected_triangle_is_counter_clockwise() {
        let (a, b, c) = tilted();
        let frame = LocalFrame::new(&a, &b, &c, S);
        let pa = frame.project(&a);
        let pb = frame.project(&b);
        let pc = frame.project(&c);

        assert_relative_eq!(pa, Point2::<f64>::origin());
        assert!(pb.y.abs() < 1e-15);
        assert!(pb.x > 0.0);
        assert!(pc.y > 0.0);
    }

    #[test]
    fn test_scale_conditioning() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2000.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1000.0, 0.0);
        let local = project_to_local_2d(&Point3::new(500.0, 250.0, 0.0), &a, &b, &c, S);
        assert_relative_eq!(local, Point2::new(0.5, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let (a, b, c) = tilted();
        let frame = LocalFrame::new(&a, &b, &c, S);
        assert_relative_eq!(frame.u_axis.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.v_axis.norm(), 1.0, epsilon = 1e-12);
        assert!(frame.u_axis.dot(&frame.v_axis).abs() < 1e-12);
        assert!(frame.normal.dot(&(c - a)).abs() < 1e-9);
    }

    #[test]
    fn test_interior_point_round_trip() {
        let (a, b, c) = tilted();
        let p = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        let back = unproject_from_local_2d(&project_to_local_2d(&p, &a, &b, &c, S), &a, &b, &c, S);
        assert_relative_eq!(back, p, epsilon = 1e-9);
    }
}
