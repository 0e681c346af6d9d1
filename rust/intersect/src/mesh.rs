// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! [`Mesh`] is an indexed triangle mesh in f64 precision. Faces are appended
//! by corner coordinates; the mesh owns vertex numbering and merges corners
//! that fall within its weld radius onto an existing vertex.

use crate::config::DEFAULT_WELD_RADIUS;
use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Triangle as three indices into a mesh's vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Face {
    pub i0: u32,
    pub i1: u32,
    pub i2: u32,
}

impl Face {
    #[inline]
    pub fn new(i0: u32, i1: u32, i2: u32) -> Self {
        Self { i0, i1, i2 }
    }

    #[inline]
    pub fn indices(&self) -> [u32; 3] {
        [self.i0, self.i1, self.i2]
    }
}

type CellKey = (i64, i64, i64);

/// Spatial hash used to merge nearby vertices
///
/// Points are bucketed on a grid whose cell size equals the weld radius, so
/// any vertex within the radius lives in one of the 27 cells around a query.
/// A zero radius degrades to exact matching keyed on the coordinate bits.
#[derive(Debug, Clone)]
struct VertexWelder {
    radius: f64,
    cells: FxHashMap<CellKey, SmallVec<[u32; 2]>>,
}

impl VertexWelder {
    fn new(radius: f64) -> Self {
        Self {
            radius: if radius.is_finite() { radius.max(0.0) } else { 0.0 },
            cells: FxHashMap::default(),
        }
    }

    #[inline]
    fn cell(&self, p: &Point3<f64>) -> CellKey {
        if self.radius > 0.0 {
            (
                (p.x / self.radius).floor() as i64,
                (p.y / self.radius).floor() as i64,
                (p.z / self.radius).floor() as i64,
            )
        } else {
            (
                p.x.to_bits() as i64,
                p.y.to_bits() as i64,
                p.z.to_bits() as i64,
            )
        }
    }

    /// Lowest-numbered vertex within the radius of `p`
    fn find(&self, p: &Point3<f64>, points: &[Point3<f64>]) -> Option<u32> {
        let key = self.cell(p);

        if self.radius == 0.0 {
            return self
                .cells
                .get(&key)
                .and_then(|cell| cell.iter().copied().find(|&i| points[i as usize] == *p));
        }

        let radius_sq = self.radius * self.radius;
        let mut best: Option<u32> = None;
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    let neighbour = (
                        key.0.saturating_add(dx),
                        key.1.saturating_add(dy),
                        key.2.saturating_add(dz),
                    );
                    let Some(cell) = self.cells.get(&neighbour) else {
                        continue;
                    };
                    for &i in cell {
                        if (points[i as usize] - p).norm_squared() <= radius_sq
                            && best.map_or(true, |b| i < b)
                        {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        best
    }

    fn insert(&mut self, p: &Point3<f64>, index: u32) {
        let key = self.cell(p);
        self.cells.entry(key).or_default().push(index);
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    points: Vec<Point3<f64>>,
    faces: Vec<Face>,
    welder: VertexWelder,
}

impl Mesh {
    /// Create a new empty mesh with the default weld radius
    pub fn new() -> Self {
        Self::with_weld_radius(DEFAULT_WELD_RADIUS)
    }

    /// Create a new empty mesh merging corners within `radius`
    pub fn with_weld_radius(radius: f64) -> Self {
        Self {
            points: Vec::new(),
            faces: Vec::new(),
            welder: VertexWelder::new(radius),
        }
    }

    /// Build a mesh from flat `[x, y, z, ...]` positions and `[i0, i1, i2, ...]` indices
    ///
    /// The vertex buffer is taken as-is (no merging); later calls to
    /// [`Mesh::add_face`] weld against it.
    pub fn from_buffers(positions: &[f64], indices: &[u32]) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(v) = positions.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidMesh(format!("non-finite coordinate {}", v)));
        }

        let vertex_count = positions.len() / 3;
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        let points = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let mut mesh = Self::with_points(points, DEFAULT_WELD_RADIUS);
        mesh.faces = indices
            .chunks_exact(3)
            .map(|f| Face::new(f[0], f[1], f[2]))
            .collect();

        Ok(mesh)
    }

    /// Weld radius used by [`Mesh::add_face`]
    #[inline]
    pub fn weld_radius(&self) -> f64 {
        self.welder.radius
    }

    /// Vertex buffer
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Face list
    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Vertex by index
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    pub fn point(&self, index: u32) -> &Point3<f64> {
        &self.points[index as usize]
    }

    /// Face by index
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    pub fn face(&self, index: u32) -> Face {
        self.faces[index as usize]
    }

    /// Corner points of a face
    ///
    /// # Panics
    /// Panics if `index` or one of the face's vertex indices is out of range.
    #[inline]
    pub fn triangle(&self, index: u32) -> [Point3<f64>; 3] {
        let f = self.face(index);
        [*self.point(f.i0), *self.point(f.i1), *self.point(f.i2)]
    }

    /// Return the index of a vertex at `p`, creating one if none lies within
    /// the weld radius
    pub fn add_point(&mut self, p: Point3<f64>) -> u32 {
        if let Some(existing) = self.welder.find(&p, &self.points) {
            return existing;
        }
        let index = self.points.len() as u32;
        self.welder.insert(&p, index);
        self.points.push(p);
        index
    }

    /// Append a face by vertex indices; returns the new face index
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn push_face(&mut self, face: Face) -> u32 {
        let count = self.points.len();
        assert!(
            face.indices().iter().all(|&i| (i as usize) < count),
            "face {:?} out of range for {} vertices",
            face,
            count
        );
        self.faces.push(face);
        (self.faces.len() - 1) as u32
    }

    /// Append a face given its corner coordinates; returns the new face index
    pub fn add_face(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> u32 {
        let i0 = self.add_point(a);
        let i1 = self.add_point(b);
        let i2 = self.add_point(c);
        self.push_face(Face::new(i0, i1, i2))
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// Get face count
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh has no faces
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Calculate bounds (min, max) of the vertex buffer
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.points.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
        for p in &self.points {
            min = min.inf(p);
            max = max.sup(p);
        }
        (min, max)
    }

    /// Total surface area
    pub fn area(&self) -> f64 {
        (0..self.faces.len() as u32)
            .map(|i| {
                let [a, b, c] = self.triangle(i);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Copy of this mesh with every vertex mapped through `f`
    ///
    /// Topology and numbering are kept; vertices that land on top of each
    /// other are not merged.
    pub fn map_points<F>(&self, f: F) -> Mesh
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        let mut mesh = Mesh::with_points(self.points.iter().map(f).collect(), self.welder.radius);
        mesh.faces = self.faces.clone();
        mesh
    }

    /// Face-less copy of this mesh's vertex buffer, numbering kept
    ///
    /// Faces added afterwards through [`Mesh::add_face`] weld against the
    /// copied vertices using `radius`.
    pub fn vertices_only(&self, radius: f64) -> Mesh {
        Mesh::with_points(self.points.clone(), radius)
    }

    /// Take `points` as the vertex buffer without merging any of them
    fn with_points(points: Vec<Point3<f64>>, radius: f64) -> Mesh {
        let mut mesh = Mesh::with_weld_radius(radius);
        for (i, p) in points.iter().enumerate() {
            mesh.welder.insert(p, i as u32);
        }
        mesh.points = points;
        mesh
    }

    /// Reverse the winding of every face
    pub fn flip_winding(&mut self) {
        for f in &mut self.faces {
            std::mem::swap(&mut f.i1, &mut f.i2);
        }
    }

    /// Convert to f32 render buffers with area-weighted smooth normals
    pub fn to_buffers(&self) -> MeshBuffers {
        let mut normals = vec![Vector3::<f64>::zeros(); self.points.len()];

        for f in &self.faces {
            let [i0, i1, i2] = f.indices().map(|i| i as usize);
            let edge1 = self.points[i1] - self.points[i0];
            let edge2 = self.points[i2] - self.points[i0];
            // Unnormalized cross product weights each face by its area
            let n = edge1.cross(&edge2);
            normals[i0] += n;
            normals[i1] += n;
            normals[i2] += n;
        }

        let mut buffers = MeshBuffers {
            positions: Vec::with_capacity(self.points.len() * 3),
            normals: Vec::with_capacity(self.points.len() * 3),
            indices: Vec::with_capacity(self.faces.len() * 3),
        };

        for (p, n) in self.points.iter().zip(normals) {
            let n = n.try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
            buffers.positions.extend([p.x as f32, p.y as f32, p.z as f32]);
            buffers.normals.extend([n.x as f32, n.y as f32, n.z as f32]);
        }
        for f in &self.faces {
            buffers.indices.extend(f.indices());
        }

        buffers
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Meshes compare by vertex buffer and face list; the weld radius is ignored.
impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points && self.faces == other.faces
    }
}

/// Render-ready f32 buffers
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaved `[x, y, z, nx, ny, nz]` per vertex
    pub fn vertex_data(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.positions.len() * 2);
        for (p, n) in self
            .positions
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
        {
            data.extend_from_slice(p);
            data.extend_from_slice(n);
        }
        data
    }

    #[inline]
    pub fn index_data(&self) -> &[u32] {
        &self.indices
    }
}
