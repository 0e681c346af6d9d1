// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary-constrained triangulation
//!
//! Retiles one triangle in its local 2D frame so that every loop becomes a
//! chain of triangle edges. [`ConformingTriangulator`] starts from the outer
//! triangle and only ever splits: loop points are inserted as vertices, then
//! each loop edge is walked through the mesh and every edge it crosses is
//! split at the crossing. Splits are applied to all triangles sharing the
//! split edge, so the result never has T-junctions and covers exactly the
//! outer triangle.

use crate::config::EPS_TINY;
use crate::error::{Error, Result};
use crate::loops::Loop;
use nalgebra::{Point2, Vector2};

/// Id carried by pieces that should not be emitted
pub const DISCARD_ID: i32 = -1;

/// One output piece of a triangulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangulated2D {
    pub points: [Point2<f64>; 3],
    /// Piece id, or [`DISCARD_ID`]
    pub id: i32,
}

impl Triangulated2D {
    #[inline]
    pub fn a(&self) -> &Point2<f64> {
        &self.points[0]
    }

    #[inline]
    pub fn b(&self) -> &Point2<f64> {
        &self.points[1]
    }

    #[inline]
    pub fn c(&self) -> &Point2<f64> {
        &self.points[2]
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        self.id == DISCARD_ID
    }

    /// Signed area, positive for counter-clockwise pieces
    #[inline]
    pub fn signed_area(&self) -> f64 {
        0.5 * cross2(&(self.b() - self.a()), &(self.c() - self.a()))
    }
}

/// Boundary-constrained triangulation primitive
pub trait BoundaryTriangulator {
    /// Cover `outer` with pieces whose edges respect `loops`
    ///
    /// Pieces keep the winding of `outer`.
    fn triangulate(&self, outer: &[Point2<f64>; 3], loops: &[Loop]) -> Result<Vec<Triangulated2D>>;
}

/// Default [`BoundaryTriangulator`]
#[derive(Debug, Clone, Copy)]
pub struct ConformingTriangulator {
    /// Snapping and sliver tolerance, relative to the longest outer edge
    pub tolerance: f64,
}

impl ConformingTriangulator {
    pub fn new() -> Self {
        Self { tolerance: EPS_TINY }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for ConformingTriangulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryTriangulator for ConformingTriangulator {
    fn triangulate(&self, outer: &[Point2<f64>; 3], loops: &[Loop]) -> Result<Vec<Triangulated2D>> {
        triangulate_with_loops(outer, loops, self.tolerance)
    }
}

#[inline]
fn cross2(u: &Vector2<f64>, v: &Vector2<f64>) -> f64 {
    u.x * v.y - u.y * v.x
}

#[inline]
fn is_finite(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

#[inline]
fn longest_edge(tri: &[Point2<f64>; 3]) -> f64 {
    (tri[1] - tri[0])
        .norm()
        .max((tri[2] - tri[1]).norm())
        .max((tri[0] - tri[2]).norm())
}

/// Triangulate `outer` around `loops`
///
/// Loops are clipped to the outer triangle; parts outside it are dropped.
/// Pieces thinner than the tolerance are returned with [`DISCARD_ID`], the
/// rest are numbered from 0 in output order.
pub fn triangulate_with_loops(
    outer: &[Point2<f64>; 3],
    loops: &[Loop],
    tolerance: f64,
) -> Result<Vec<Triangulated2D>> {
    if !outer.iter().all(is_finite) {
        return Err(Error::TriangulationError(
            "non-finite outer boundary".to_string(),
        ));
    }

    let longest = longest_edge(outer);
    let tol = tolerance * longest;
    let area2 = cross2(&(outer[1] - outer[0]), &(outer[2] - outer[0]));
    if !(longest > 0.0) || area2.abs() <= tol * longest {
        return Err(Error::TriangulationError(format!(
            "degenerate outer boundary (area {:e})",
            area2 * 0.5
        )));
    }

    // Work counter-clockwise, restore the caller's winding on output
    let reversed = area2 < 0.0;
    let ccw = if reversed {
        [outer[0], outer[2], outer[1]]
    } else {
        *outer
    };

    let mut workspace = Workspace::new(ccw, tol);
    for lp in loops {
        match *lp {
            Loop::Point(p) => {
                if !is_finite(&p) {
                    return Err(Error::TriangulationError(
                        "non-finite loop point".to_string(),
                    ));
                }
                if workspace.insert_point(p).is_none() {
                    tracing::trace!(x = p.x, y = p.y, "Point loop outside triangle dropped");
                }
            }
            Loop::Edge { start, end } => {
                if !is_finite(&start) || !is_finite(&end) {
                    return Err(Error::TriangulationError(
                        "non-finite loop edge".to_string(),
                    ));
                }
                let Some((s, e)) = clip_to_triangle(&ccw, &start, &end, 0.5 * tol) else {
                    tracing::trace!("Edge loop outside triangle dropped");
                    continue;
                };
                match (workspace.insert_point(s), workspace.insert_point(e)) {
                    (Some(si), Some(ei)) => workspace.insert_segment(si, ei),
                    _ => tracing::trace!("Clipped edge loop could not be located"),
                }
            }
        }
    }

    Ok(workspace.into_pieces(reversed))
}

/// Clip segment `start`-`end` to a counter-clockwise triangle grown by `margin`
fn clip_to_triangle(
    tri: &[Point2<f64>; 3],
    start: &Point2<f64>,
    end: &Point2<f64>,
    margin: f64,
) -> Option<(Point2<f64>, Point2<f64>)> {
    let d = end - start;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    for k in 0..3 {
        let a = tri[k];
        let edge = tri[(k + 1) % 3] - a;
        let fs = cross2(&edge, &(start - a)) + margin * edge.norm();
        let fd = cross2(&edge, &d);

        if fd == 0.0 {
            if fs < 0.0 {
                return None;
            }
            continue;
        }

        let t = -fs / fd;
        if fd > 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((start + d * t0, start + d * t1))
}

/// Growing triangulation of the outer triangle
struct Workspace {
    points: Vec<Point2<f64>>,
    tris: Vec<[usize; 3]>,
    tol: f64,
}

impl Workspace {
    fn new(outer: [Point2<f64>; 3], tol: f64) -> Self {
        Self {
            points: outer.to_vec(),
            tris: vec![[0, 1, 2]],
            tol,
        }
    }

    /// Signed distances of `p` to the three edges of `tri` (positive inside)
    fn edge_distances(&self, tri: &[usize; 3], p: &Point2<f64>) -> [f64; 3] {
        std::array::from_fn(|k| {
            let a = self.points[tri[k]];
            let edge = self.points[tri[(k + 1) % 3]] - a;
            cross2(&edge, &(p - a)) / edge.norm()
        })
    }

    fn locate(&self, p: &Point2<f64>) -> Option<(usize, [f64; 3])> {
        self.tris
            .iter()
            .enumerate()
            .map(|(t, tri)| (t, self.edge_distances(tri, p)))
            .find(|(_, d)| d.iter().all(|&x| x >= -self.tol))
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.tris.iter().any(|t| t.contains(&u) && t.contains(&v))
    }

    /// Insert `p` as a vertex, returning its index
    ///
    /// Snaps to an existing vertex within tolerance. Returns `None` when `p`
    /// lies outside the triangulated area.
    fn insert_point(&mut self, p: Point2<f64>) -> Option<usize> {
        if let Some(existing) = self.points.iter().position(|q| (q - p).norm() <= self.tol) {
            return Some(existing);
        }

        let (t, dist) = self.locate(&p)?;
        let tri = self.tris[t];

        let mut nearest = 0;
        for k in 1..3 {
            if dist[k].abs() < dist[nearest].abs() {
                nearest = k;
            }
        }

        let w = self.points.len();
        if dist[nearest].abs() <= self.tol {
            let (u, v) = (tri[nearest], tri[(nearest + 1) % 3]);
            let pu = self.points[u];
            let edge = self.points[v] - pu;
            let along = ((p - pu).dot(&edge) / edge.norm_squared()).clamp(0.0, 1.0);
            self.points.push(pu + edge * along);
            self.split_edge(u, v, w);
        } else {
            let [i, j, k] = tri;
            self.points.push(p);
            self.tris[t] = [i, j, w];
            self.tris.push([j, k, w]);
            self.tris.push([k, i, w]);
        }
        Some(w)
    }

    /// Split edge `u`-`v` at vertex `w` in every triangle that uses it
    fn split_edge(&mut self, u: usize, v: usize, w: usize) {
        for t in 0..self.tris.len() {
            let tri = self.tris[t];
            for k in 0..3 {
                let (p, q, r) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
                if (p == u && q == v) || (p == v && q == u) {
                    self.tris[t] = [p, w, r];
                    self.tris.push([w, q, r]);
                    break;
                }
            }
        }
    }

    /// Make `start`-`end` a chain of triangulation edges
    fn insert_segment(&mut self, start: usize, end: usize) {
        let limit = 8 * self.tris.len() + 64;
        let mut cur = start;

        for _ in 0..limit {
            if cur == end || self.has_edge(cur, end) {
                return;
            }

            let pc = self.points[cur];
            let d = self.points[end] - pc;
            let len = d.norm();

            if let Some(next) = self.vertex_on_segment(cur, &pc, &d, len) {
                cur = next;
                continue;
            }

            match self.crossed_edge(cur, &pc, &d, len) {
                Some((p, q, crossing)) => {
                    let w = self.points.len();
                    self.points.push(crossing);
                    self.split_edge(p, q, w);
                    cur = w;
                }
                None => {
                    tracing::warn!(
                        from = cur,
                        to = end,
                        "Constraint walk stalled, edge left partially inserted"
                    );
                    return;
                }
            }
        }

        tracing::warn!(from = start, to = end, "Constraint walk hit iteration limit");
    }

    /// Nearest neighbour of `cur` lying strictly inside the segment
    fn vertex_on_segment(&self, cur: usize, pc: &Point2<f64>, d: &Vector2<f64>, len: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for tri in self.tris.iter().filter(|t| t.contains(&cur)) {
            for &n in tri.iter().filter(|&&n| n != cur) {
                let rel = self.points[n] - pc;
                let along = rel.dot(d) / len;
                let off = cross2(d, &rel).abs() / len;
                if off <= self.tol
                    && along > self.tol
                    && along < len - self.tol
                    && best.map_or(true, |(_, b)| along < b)
                {
                    best = Some((n, along));
                }
            }
        }
        best.map(|(n, _)| n)
    }

    /// Edge opposite `cur` that the segment leaves through, with the crossing
    fn crossed_edge(
        &self,
        cur: usize,
        pc: &Point2<f64>,
        d: &Vector2<f64>,
        len: f64,
    ) -> Option<(usize, usize, Point2<f64>)> {
        for tri in &self.tris {
            let Some(k) = tri.iter().position(|&i| i == cur) else {
                continue;
            };
            let (p, q) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            let rp = self.points[p] - pc;
            let rq = self.points[q] - pc;

            // Direction must lie strictly inside the corner at `cur`
            if cross2(&rp, d) / len <= self.tol || cross2(d, &rq) / len <= self.tol {
                continue;
            }

            let pq = self.points[q] - self.points[p];
            let denom = cross2(d, &pq);
            if denom == 0.0 {
                continue;
            }
            let t = cross2(&rp, &pq) / denom;
            if t * len >= len - self.tol {
                return None;
            }
            return Some((p, q, pc + d * t));
        }
        None
    }

    fn into_pieces(self, reversed: bool) -> Vec<Triangulated2D> {
        let mut next_id = 0;
        self.tris
            .iter()
            .map(|tri| {
                let [a, b, c] = [self.points[tri[0]], self.points[tri[1]], self.points[tri[2]]];
                let points = if reversed { [a, c, b] } else { [a, b, c] };
                let area2 = cross2(&(b - a), &(c - a));
                let id = if area2 <= self.tol * longest_edge(&points) {
                    DISCARD_ID
                } else {
                    next_id += 1;
                    next_id - 1
                };
                Triangulated2D { points, id }
            })
            .collect()
    }
}
