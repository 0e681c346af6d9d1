// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh-mesh intersection pipeline
//!
//! [`IntersectionProcessor`] ties the stages together: one pairwise pass
//! fills both intersection indices, then each mesh is retriangulated from
//! its own index. Retriangulation only starts once the pass is complete.

use crate::config::IntersectConfig;
use crate::error::Result;
use crate::intersection::{intersect_meshes, IntersectionIndex};
use crate::mesh::Mesh;
use crate::retriangulate::{retriangulate_mesh, RetriangulationStats};
use crate::tri_tri::{TriTriIntersector, TriangleIntersector};
use crate::triangulation::{BoundaryTriangulator, ConformingTriangulator};

/// Both rebuilt meshes with their statistics
#[derive(Debug, Clone)]
pub struct IntersectionOutput {
    pub mesh_a: Mesh,
    pub mesh_b: Mesh,
    pub stats_a: RetriangulationStats,
    pub stats_b: RetriangulationStats,
}

impl IntersectionOutput {
    pub fn into_meshes(self) -> (Mesh, Mesh) {
        (self.mesh_a, self.mesh_b)
    }
}

/// Intersects two meshes and retiles both along the cut
pub struct IntersectionProcessor<I = TriTriIntersector, T = ConformingTriangulator> {
    config: IntersectConfig,
    intersector: I,
    triangulator: T,
}

impl IntersectionProcessor {
    /// Create a processor with the default collaborators
    pub fn new() -> Self {
        Self::with_config(IntersectConfig::default())
    }

    /// Create a processor whose default collaborators follow `config`
    pub fn with_config(config: IntersectConfig) -> Self {
        Self {
            intersector: TriTriIntersector::with_tolerance(config.intersection_tolerance),
            triangulator: ConformingTriangulator::with_tolerance(config.triangulation_tolerance),
            config,
        }
    }
}

impl Default for IntersectionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: TriangleIntersector, T: BoundaryTriangulator> IntersectionProcessor<I, T> {
    /// Create a processor with custom collaborators
    pub fn with_collaborators(config: IntersectConfig, intersector: I, triangulator: T) -> Self {
        Self {
            config,
            intersector,
            triangulator,
        }
    }

    pub fn config(&self) -> &IntersectConfig {
        &self.config
    }

    /// Run the pairwise pass only
    pub fn intersect_meshes(&self, mesh_a: &Mesh, mesh_b: &Mesh) -> Result<(IntersectionIndex, IntersectionIndex)> {
        intersect_meshes(mesh_a, mesh_b, &self.intersector)
    }

    /// Rebuild one mesh from a completed index
    ///
    /// # Panics
    /// Panics if `index` was built for a mesh with a different face count.
    pub fn retriangulate(&self, mesh: &Mesh, index: &IntersectionIndex) -> Result<(Mesh, RetriangulationStats)> {
        retriangulate_mesh(mesh, index, &self.triangulator, &self.config)
    }

    /// Intersect `mesh_a` with `mesh_b` and return both retiled meshes
    pub fn intersect_mesh_mesh(&self, mesh_a: &Mesh, mesh_b: &Mesh) -> Result<(Mesh, Mesh)> {
        Ok(self.intersect_with_stats(mesh_a, mesh_b)?.into_meshes())
    }

    /// Same as [`Self::intersect_mesh_mesh`], keeping per-mesh statistics
    pub fn intersect_with_stats(&self, mesh_a: &Mesh, mesh_b: &Mesh) -> Result<IntersectionOutput> {
        let (index_a, index_b) = self.intersect_meshes(mesh_a, mesh_b)?;
        let (out_a, stats_a) = self.retriangulate(mesh_a, &index_a)?;
        let (out_b, stats_b) = self.retriangulate(mesh_b, &index_b)?;

        Ok(IntersectionOutput {
            mesh_a: out_a,
            mesh_b: out_b,
            stats_a,
            stats_b,
        })
    }
}

/// Intersect two meshes with default settings
pub fn intersect_mesh_mesh(mesh_a: &Mesh, mesh_b: &Mesh) -> Result<(Mesh, Mesh)> {
    IntersectionProcessor::new().intersect_mesh_mesh(mesh_a, mesh_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopWinding;
    use crate::error::Error;
    use crate::tri_tri::IntersectionSegment;
    use nalgebra::Point3;

    fn ground() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_face(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        mesh
    }

    fn wall() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_face(
            Point3::new(0.1, 0.25, -0.5),
            Point3::new(0.6, 0.25, -0.5),
            Point3::new(0.3, 0.25, 0.5),
        );
        mesh
    }

    #[test]
    fn test_default_pipeline_cuts_both_meshes() {
        let output = IntersectionProcessor::new()
            .intersect_with_stats(&ground(), &wall())
            .unwrap();

        assert_eq!(output.stats_a.retriangulated, 1);
        assert_eq!(output.stats_b.retriangulated, 1);
        assert!(output.mesh_a.face_count() >= 2);
        assert!(output.mesh_b.face_count() >= 2);
        assert!((output.mesh_a.area() - ground().area()).abs() < 1e-9);
        assert!((output.mesh_b.area() - wall().area()).abs() < 1e-9);
    }

    #[test]
    fn test_free_function_matches_processor() {
        let (a1, b1) = intersect_mesh_mesh(&ground(), &wall()).unwrap();
        let (a2, b2) = IntersectionProcessor::default()
            .intersect_mesh_mesh(&ground(), &wall())
            .unwrap();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_config_reaches_collaborators() {
        let config = IntersectConfig::new()
            .with_loop_winding(LoopWinding::Reversed)
            .with_triangulation_tolerance(1e-6);
        let processor = IntersectionProcessor::with_config(config);
        assert_eq!(processor.config().loop_winding, LoopWinding::Reversed);
        assert_eq!(processor.triangulator.tolerance, 1e-6);
    }

    struct Refusing;

    impl TriangleIntersector for Refusing {
        fn intersect(
            &self,
            _a: &[Point3<f64>; 3],
            _b: &[Point3<f64>; 3],
        ) -> Result<IntersectionSegment> {
            Err(Error::IntersectionFailed("refused".to_string()))
        }
    }

    #[test]
    fn test_custom_intersector_error_aborts() {
        let processor = IntersectionProcessor::with_collaborators(
            IntersectConfig::new(),
            Refusing,
            ConformingTriangulator::new(),
        );
        assert!(processor.intersect_mesh_mesh(&ground(), &wall()).is_err());
    }
}
