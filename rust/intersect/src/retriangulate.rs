// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-triangle retriangulation and output assembly
//!
//! Faces are visited in their original order. The output starts from a copy
//! of the input's vertex buffer, so a face without records keeps its exact
//! indices; a cut face is projected into its own frame, retiled by the
//! triangulation collaborator and unprojected through the same frame.

use crate::config::IntersectConfig;
use crate::error::Result;
use crate::intersection::IntersectionIndex;
use crate::loops::{build_loops, Loop};
use crate::mesh::{Face, Mesh};
use crate::projection::LocalFrame;
use crate::triangulation::{BoundaryTriangulator, Triangulated2D};
use nalgebra::Point2;

/// Counters collected while rebuilding one mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetriangulationStats {
    /// Faces copied without change, including single-point triangles
    pub verbatim: usize,
    /// Faces handed to the triangulator
    pub retriangulated: usize,
    /// Pieces appended for retriangulated faces
    pub emitted: usize,
    /// Pieces dropped because they carried the discard id
    pub discarded: usize,
    /// Pieces dropped because welding merged two of their corners
    pub collapsed: usize,
    /// Faces whose only loop was a single interior point
    pub single_point: usize,
}

/// Builds an output mesh face by face
pub struct MeshAssembler {
    mesh: Mesh,
    stats: RetriangulationStats,
}

impl MeshAssembler {
    /// Assembler starting from an empty vertex buffer
    pub fn new(weld_radius: f64) -> Self {
        Self {
            mesh: Mesh::with_weld_radius(weld_radius),
            stats: RetriangulationStats::default(),
        }
    }

    /// Assembler seeded with the vertex buffer of `source`
    ///
    /// Verbatim faces of `source` can then be appended by index, and new
    /// piece corners weld onto the seeded vertices.
    pub fn seeded(source: &Mesh, weld_radius: f64) -> Self {
        Self {
            mesh: source.vertices_only(weld_radius),
            stats: RetriangulationStats::default(),
        }
    }

    /// Copy an untouched face by index
    ///
    /// # Panics
    /// Panics if the face refers to a vertex the assembler does not hold.
    pub fn append_verbatim(&mut self, face: Face) {
        self.mesh.push_face(face);
        self.stats.verbatim += 1;
    }

    /// Unproject a retriangulated piece through `frame`; discarded pieces
    /// are only counted
    pub fn append_piece(&mut self, frame: &LocalFrame, piece: &Triangulated2D) {
        if piece.is_discarded() {
            self.stats.discarded += 1;
            return;
        }
        let [i0, i1, i2] = piece
            .points
            .map(|p| self.mesh.add_point(frame.unproject(&p)));
        if i0 == i1 || i1 == i2 || i2 == i0 {
            self.stats.collapsed += 1;
            return;
        }
        self.mesh.push_face(Face::new(i0, i1, i2));
        self.stats.emitted += 1;
    }

    pub fn stats(&self) -> &RetriangulationStats {
        &self.stats
    }

    pub fn finish(self) -> (Mesh, RetriangulationStats) {
        (self.mesh, self.stats)
    }
}

/// True when `p` lies on an edge of `outer` away from its corners
///
/// Such a point splits an edge the neighbouring face also owns, so the face
/// cannot be copied unchanged.
fn splits_boundary(outer: &[Point2<f64>; 3], p: &Point2<f64>, eps: f64) -> bool {
    if outer.iter().any(|corner| (corner - p).norm() <= eps) {
        return false;
    }
    (0..3).any(|i| {
        let a = outer[i];
        let ab = outer[(i + 1) % 3] - a;
        let len_sq = ab.norm_squared();
        if !(len_sq > 0.0) {
            return false;
        }
        let t = (p - a).dot(&ab) / len_sq;
        (0.0..=1.0).contains(&t) && (p - (a + ab * t)).norm() <= eps
    })
}

/// Rebuild `mesh` with every intersected triangle retiled around its loops
///
/// The result is a new mesh; `mesh` and `index` are only read. Faces without
/// records keep their vertex indices, so a mesh with no intersections comes
/// back equal to its input. A triangulator error aborts the whole rebuild.
///
/// # Panics
/// Panics if `index` was not built for a mesh with `mesh.face_count()` faces.
pub fn retriangulate_mesh<T: BoundaryTriangulator + ?Sized>(
    mesh: &Mesh,
    index: &IntersectionIndex,
    triangulator: &T,
    config: &IntersectConfig,
) -> Result<(Mesh, RetriangulationStats)> {
    assert_eq!(
        index.face_count(),
        mesh.face_count(),
        "intersection index does not match the mesh"
    );
    let mut assembler = MeshAssembler::seeded(mesh, config.weld_radius);

    for face in 0..mesh.face_count() as u32 {
        let records = index.records(face);
        if records.is_empty() {
            assembler.append_verbatim(mesh.face(face));
            continue;
        }

        let [a, b, c] = mesh.triangle(face);
        let loops = build_loops(&a, &b, &c, records, config);

        let frame = LocalFrame::new(&a, &b, &c, config.projection_scale);
        let outer = [frame.project(&a), frame.project(&b), frame.project(&c)];

        if let [Loop::Point(p)] = loops.as_slice() {
            let longest = (0..3)
                .map(|i| (outer[(i + 1) % 3] - outer[i]).norm())
                .fold(0.0, f64::max);
            let eps = (config.weld_radius / config.projection_scale)
                .max(config.triangulation_tolerance * longest);
            if !splits_boundary(&outer, p, eps) {
                assembler.append_verbatim(mesh.face(face));
                assembler.stats.single_point += 1;
                continue;
            }
        }

        let pieces = triangulator.triangulate(&outer, &loops)?;

        assembler.stats.retriangulated += 1;
        for piece in &pieces {
            assembler.append_piece(&frame, piece);
        }
    }

    let (out, stats) = assembler.finish();
    tracing::debug!(
        faces_in = mesh.face_count(),
        faces_out = out.face_count(),
        retriangulated = stats.retriangulated,
        emitted = stats.emitted,
        discarded = stats.discarded,
        collapsed = stats.collapsed,
        "Mesh retriangulated"
    );
    Ok((out, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::intersection::MeshIntersectionRecord;
    use crate::triangulation::{ConformingTriangulator, DISCARD_ID};
    use crate::tri_tri::IntersectionSegment;
    use nalgebra::{Point3, Vector3};

    fn ground() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_face(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        mesh.add_face(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        mesh
    }

    fn record(start: Point3<f64>, end: Point3<f64>) -> MeshIntersectionRecord {
        MeshIntersectionRecord {
            segment: IntersectionSegment::new(start, end),
            other_triangle_index: 0,
            other_normal: Vector3::y(),
        }
    }

    #[test]
    fn test_untouched_mesh_is_copied() {
        let mesh = ground();
        let index = IntersectionIndex::with_face_count(mesh.face_count());
        let (out, stats) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();

        assert_eq!(out, mesh);
        assert_eq!(stats.verbatim, 2);
        assert_eq!(stats.retriangulated, 0);
    }

    #[test]
    fn test_cut_face_is_retiled_in_place() {
        let mesh = ground();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        index.push(0, record(Point3::new(0.2, 0.25, 0.0), Point3::new(0.45, 0.25, 0.0)));

        let (out, stats) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();

        assert_eq!(stats.retriangulated, 1);
        assert_eq!(stats.verbatim, 1);
        assert!(stats.emitted >= 2);
        assert_eq!(out.face_count(), stats.emitted + 1);
        assert!((out.area() - mesh.area()).abs() < 1e-9);
        for p in out.points() {
            assert!(p.z.abs() < 1e-12);
        }
        // Untouched face follows the pieces of face 0
        let last = out.triangle(out.face_count() as u32 - 1);
        for (p, q) in last.iter().zip(mesh.triangle(1).iter()) {
            assert!((p - q).norm() < 1e-12);
        }
    }

    #[test]
    fn test_single_point_face_is_copied() {
        let mesh = ground();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        let p = Point3::new(0.3, 0.3, 0.0);
        index.push(0, record(p, p));

        let (out, stats) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();

        assert_eq!(out, mesh);
        assert_eq!(stats.single_point, 1);
        assert_eq!(stats.retriangulated, 0);
    }

    #[test]
    fn test_untouched_faces_keep_buffer_numbering() {
        // Flat-shaded quad with duplicated corners, listed in reverse order
        let positions = [
            0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
        ];
        let mesh = Mesh::from_buffers(&positions, &[3, 2, 1, 5, 4, 0]).unwrap();
        let index = IntersectionIndex::with_face_count(mesh.face_count());

        let (out, stats) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();
        assert_eq!(out, mesh);
        assert_eq!(out.vertex_count(), 6);
        assert_eq!(stats.verbatim, 2);
    }

    #[test]
    fn test_cut_keeps_numbering_of_untouched_faces() {
        let positions = [
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let mesh = Mesh::from_buffers(&positions, &[0, 1, 2, 3, 4, 5]).unwrap();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        index.push(0, record(Point3::new(0.2, 0.25, 0.0), Point3::new(0.45, 0.25, 0.0)));

        let (out, _) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();
        assert_eq!(&out.points()[..6], mesh.points());
        assert_eq!(out.face(out.face_count() as u32 - 1), Face::new(3, 4, 5));
        // Pieces of face 0 reuse its seeded corners
        for face in &out.faces()[..out.face_count() - 1] {
            for i in face.indices() {
                assert!(i < 3 || i >= 6);
            }
        }
    }

    #[test]
    fn test_single_point_on_shared_edge_splits_both_faces() {
        let mesh = ground();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        let p = Point3::new(0.5, 0.5, 0.0);
        index.push(0, record(p, p));
        index.push(1, record(p, p));

        let (out, stats) = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        )
        .unwrap();

        assert_eq!(stats.single_point, 0);
        assert_eq!(stats.retriangulated, 2);
        assert_eq!(out.face_count(), 4);
        assert!((out.area() - mesh.area()).abs() < 1e-12);
        assert!(out.points().iter().any(|q| (q - p).norm() < 1e-12));
    }

    #[test]
    fn test_boundary_test_ignores_corners_and_interior() {
        let outer = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert!(splits_boundary(&outer, &Point2::new(0.5, 0.0), 1e-9));
        assert!(splits_boundary(&outer, &Point2::new(0.5, 0.5), 1e-9));
        assert!(!splits_boundary(&outer, &Point2::new(1.0, 0.0), 1e-9));
        assert!(!splits_boundary(&outer, &Point2::new(0.25, 0.25), 1e-9));
        assert!(!splits_boundary(&outer, &Point2::new(1.5, 0.0), 1e-9));
    }

    #[test]
    #[should_panic]
    fn test_index_for_another_mesh_panics() {
        let mesh = ground();
        let index = IntersectionIndex::with_face_count(1);
        let _ = retriangulate_mesh(
            &mesh,
            &index,
            &ConformingTriangulator::new(),
            &IntersectConfig::new(),
        );
    }

    struct SentinelTriangulator;

    impl BoundaryTriangulator for SentinelTriangulator {
        fn triangulate(&self, outer: &[Point2<f64>; 3], _loops: &[Loop]) -> Result<Vec<Triangulated2D>> {
            let [a, b, c] = *outer;
            let m = Point2::from((a.coords + b.coords) * 0.5);
            Ok(vec![
                Triangulated2D { points: [a, m, c], id: 0 },
                Triangulated2D { points: [m, b, c], id: DISCARD_ID },
            ])
        }
    }

    #[test]
    fn test_discarded_pieces_are_not_emitted() {
        let mesh = ground();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        index.push(0, record(Point3::new(0.2, 0.25, 0.0), Point3::new(0.45, 0.25, 0.0)));

        let (out, stats) =
            retriangulate_mesh(&mesh, &index, &SentinelTriangulator, &IntersectConfig::new()).unwrap();

        assert_eq!(stats.emitted, 1);
        assert_eq!(stats.discarded, 1);
        assert_eq!(out.face_count(), 2);
        // Emitted half is unprojected through the original corners
        let [a, m, c] = out.triangle(0);
        assert!((a - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((m - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-12);
        assert!((c - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    struct FailingTriangulator;

    impl BoundaryTriangulator for FailingTriangulator {
        fn triangulate(&self, _outer: &[Point2<f64>; 3], _loops: &[Loop]) -> Result<Vec<Triangulated2D>> {
            Err(Error::TriangulationError("rejected".to_string()))
        }
    }

    #[test]
    fn test_triangulator_error_propagates() {
        let mesh = ground();
        let mut index = IntersectionIndex::with_face_count(mesh.face_count());
        index.push(1, record(Point3::new(0.6, 0.5, 0.0), Point3::new(0.9, 0.5, 0.0)));

        let result = retriangulate_mesh(&mesh, &index, &FailingTriangulator, &IntersectConfig::new());
        assert!(matches!(result, Err(Error::TriangulationError(_))));
    }
}
