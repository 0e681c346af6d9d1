// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pairwise mesh intersection
//!
//! Every triangle of the first mesh is tested against every triangle of the
//! second. Hits are recorded for both triangles in the same step, so the two
//! resulting indices always mirror each other. There is no spatial pruning:
//! the pass is O(F_A × F_B), which is fine for the coarse per-element meshes
//! this runs on.

use crate::error::Result;
use crate::mesh::Mesh;
use crate::tri_tri::{triangle_normal, IntersectionSegment, TriangleIntersector};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// One recorded hit of a triangle against a triangle of the other mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshIntersectionRecord {
    pub segment: IntersectionSegment,
    pub other_triangle_index: u32,
    /// Unit normal of the other triangle, used to orient loops
    pub other_normal: Vector3<f64>,
}

pub type RecordList = SmallVec<[MeshIntersectionRecord; 2]>;

/// Per-triangle intersection records for one mesh
///
/// One slot per face of the mesh; untouched triangles keep an empty slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionIndex {
    slots: Vec<RecordList>,
}

impl IntersectionIndex {
    /// Create an empty index for a mesh with `face_count` faces
    pub fn with_face_count(face_count: usize) -> Self {
        Self {
            slots: vec![RecordList::new(); face_count],
        }
    }

    /// Append a record for `triangle`
    ///
    /// # Panics
    /// Panics if `triangle` is not a face of the indexed mesh.
    #[inline]
    pub fn push(&mut self, triangle: u32, record: MeshIntersectionRecord) {
        self.slots[triangle as usize].push(record);
    }

    /// Records of `triangle`; empty when it was not hit
    ///
    /// # Panics
    /// Panics if `triangle` is not a face of the indexed mesh.
    #[inline]
    pub fn records(&self, triangle: u32) -> &[MeshIntersectionRecord] {
        self.slots[triangle as usize].as_slice()
    }

    #[inline]
    pub fn is_intersected(&self, triangle: u32) -> bool {
        !self.records(triangle).is_empty()
    }

    /// Check whether `triangle` has a record referencing `other`
    pub fn contains_pair(&self, triangle: u32, other: u32) -> bool {
        self.records(triangle)
            .iter()
            .any(|r| r.other_triangle_index == other)
    }

    /// Number of faces the index was sized for
    #[inline]
    pub fn face_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of triangles with at least one record
    pub fn intersected_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Total number of records
    pub fn record_count(&self) -> usize {
        self.slots.iter().map(|s| s.len()).sum()
    }

    /// True when no triangle was hit
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_empty())
    }

    /// Intersected triangles in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[MeshIntersectionRecord])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, s)| (i as u32, s.as_slice()))
    }
}

/// Test every triangle pair of `mesh_a` × `mesh_b`
///
/// Returns one index per mesh. Triangle `i` of `mesh_a` references `j` iff
/// triangle `j` of `mesh_b` references `i`. The first intersector error
/// aborts the pass.
pub fn intersect_meshes<I: TriangleIntersector + ?Sized>(
    mesh_a: &Mesh,
    mesh_b: &Mesh,
    intersector: &I,
) -> Result<(IntersectionIndex, IntersectionIndex)> {
    let mut index_a = IntersectionIndex::with_face_count(mesh_a.face_count());
    let mut index_b = IntersectionIndex::with_face_count(mesh_b.face_count());

    let triangles_b: Vec<[Point3<f64>; 3]> = (0..mesh_b.face_count() as u32)
        .map(|j| mesh_b.triangle(j))
        .collect();
    let normals_b: Vec<Vector3<f64>> = triangles_b
        .iter()
        .map(|t| triangle_normal(t).unwrap_or_else(Vector3::zeros))
        .collect();

    for i in 0..mesh_a.face_count() as u32 {
        let tri_a = mesh_a.triangle(i);
        let normal_a = triangle_normal(&tri_a).unwrap_or_else(Vector3::zeros);

        for (j, tri_b) in triangles_b.iter().enumerate() {
            let segment = intersector.intersect(&tri_a, tri_b)?;
            if !segment.has_intersection {
                continue;
            }

            index_a.push(
                i,
                MeshIntersectionRecord {
                    segment,
                    other_triangle_index: j as u32,
                    other_normal: normals_b[j],
                },
            );
            index_b.push(
                j as u32,
                MeshIntersectionRecord {
                    segment,
                    other_triangle_index: i,
                    other_normal: normal_a,
                },
            );
        }
    }

    tracing::debug!(
        faces_a = mesh_a.face_count(),
        faces_b = mesh_b.face_count(),
        hit_a = index_a.intersected_count(),
        hit_b = index_b.intersected_count(),
        records = index_a.record_count(),
        "Pairwise intersection pass complete"
    );

    Ok((index_a, index_b))
}
