// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-model geometry storage
//!
//! A [`GeometryRegistry`] owns the meshes of every open model together with
//! the model's placement transform. Handles are issued sequentially and are
//! never reused, so a stale handle can only ever fail, not reach another
//! model's data. Closing a model drops its entry; any id below the next
//! handle that has no entry was closed.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::processor::IntersectionProcessor;
use crate::transform::{matrix_from_column_major, transform_mesh};
use crate::tri_tri::TriangleIntersector;
use crate::triangulation::BoundaryTriangulator;
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;

/// Opaque model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(u32);

impl ModelHandle {
    #[inline]
    pub fn id(&self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct ModelEntry {
    geometries: FxHashMap<u32, Mesh>,
    transformation: Matrix4<f64>,
}

/// Store of open models and their geometry
#[derive(Debug, Default)]
pub struct GeometryRegistry {
    models: FxHashMap<u32, ModelEntry>,
    next_id: u32,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new, empty model with an identity transform
    pub fn open_model(&mut self) -> ModelHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.models.insert(
            id,
            ModelEntry {
                geometries: FxHashMap::default(),
                transformation: Matrix4::identity(),
            },
        );
        tracing::debug!(model = id, "Model opened");
        ModelHandle(id)
    }

    /// Close a model and drop its geometry
    pub fn close_model(&mut self, handle: ModelHandle) -> Result<()> {
        match self.models.remove(&handle.0) {
            Some(_) => {
                tracing::debug!(model = handle.0, "Model closed");
                Ok(())
            }
            None => Err(self.missing(handle)),
        }
    }

    pub fn is_model_open(&self, handle: ModelHandle) -> bool {
        self.models.contains_key(&handle.0)
    }

    /// Number of models currently open
    pub fn open_model_count(&self) -> usize {
        self.models.len()
    }

    fn missing(&self, handle: ModelHandle) -> Error {
        if handle.0 < self.next_id {
            Error::ModelClosed(handle.0)
        } else {
            Error::UnknownModel(handle.0)
        }
    }

    fn entry(&self, handle: ModelHandle) -> Result<&ModelEntry> {
        self.models.get(&handle.0).ok_or_else(|| self.missing(handle))
    }

    fn entry_mut(&mut self, handle: ModelHandle) -> Result<&mut ModelEntry> {
        let missing = self.missing(handle);
        self.models.get_mut(&handle.0).ok_or(missing)
    }

    /// Store `mesh` under `id`, returning the mesh it replaced
    pub fn insert_geometry(&mut self, handle: ModelHandle, id: u32, mesh: Mesh) -> Result<Option<Mesh>> {
        Ok(self.entry_mut(handle)?.geometries.insert(id, mesh))
    }

    /// Geometry `id` in model-local coordinates
    pub fn geometry(&self, handle: ModelHandle, id: u32) -> Result<&Mesh> {
        self.entry(handle)?
            .geometries
            .get(&id)
            .ok_or(Error::UnknownGeometry {
                model: handle.0,
                id,
            })
    }

    /// Ids of all stored geometry, ascending
    pub fn geometry_ids(&self, handle: ModelHandle) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = self.entry(handle)?.geometries.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Set the model placement from 16 column-major values
    pub fn set_transformation(&mut self, handle: ModelHandle, values: &[f64; 16]) -> Result<()> {
        let matrix = matrix_from_column_major(values)?;
        self.entry_mut(handle)?.transformation = matrix;
        Ok(())
    }

    pub fn transformation(&self, handle: ModelHandle) -> Result<&Matrix4<f64>> {
        Ok(&self.entry(handle)?.transformation)
    }

    /// Geometry `id` with the model placement applied
    pub fn placed_geometry(&self, handle: ModelHandle, id: u32) -> Result<Mesh> {
        let entry = self.entry(handle)?;
        let mesh = self.geometry(handle, id)?;
        Ok(transform_mesh(mesh, &entry.transformation))
    }

    /// Intersect two placed geometries of the same model
    pub fn intersect<I, T>(
        &self,
        handle: ModelHandle,
        id_a: u32,
        id_b: u32,
        processor: &IntersectionProcessor<I, T>,
    ) -> Result<(Mesh, Mesh)>
    where
        I: TriangleIntersector,
        T: BoundaryTriangulator,
    {
        let mesh_a = self.placed_geometry(handle, id_a)?;
        let mesh_b = self.placed_geometry(handle, id_b)?;
        processor.intersect_mesh_mesh(&mesh_a, &mesh_b)
    }
}
