// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Mesh Intersection
//!
//! Boolean intersection and retriangulation of two triangle meshes. Every
//! triangle pair is tested, each cut triangle is retiled in its own plane
//! around the cut segments, and both meshes are rebuilt with the cut
//! regions replaced by pieces that share the cut as an edge chain.
//!
//! ```no_run
//! use ifc_lite_intersect::{IntersectionProcessor, Mesh, Point3};
//!
//! let mut wall = Mesh::new();
//! wall.add_face(
//!     Point3::new(0.1, 0.25, -0.5),
//!     Point3::new(0.6, 0.25, -0.5),
//!     Point3::new(0.3, 0.25, 0.5),
//! );
//! let mut slab = Mesh::new();
//! slab.add_face(
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! );
//!
//! let (wall, slab) = IntersectionProcessor::new().intersect_mesh_mesh(&wall, &slab)?;
//! # Ok::<(), ifc_lite_intersect::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod intersection;
pub mod loops;
pub mod mesh;
pub mod processor;
pub mod projection;
pub mod registry;
pub mod retriangulate;
pub mod transform;
pub mod tri_tri;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use config::{IntersectConfig, LoopWinding};
pub use error::{Error, Result};
pub use intersection::{intersect_meshes, IntersectionIndex, MeshIntersectionRecord};
pub use loops::{build_loops, Loop};
pub use mesh::{Face, Mesh, MeshBuffers};
pub use processor::{intersect_mesh_mesh, IntersectionOutput, IntersectionProcessor};
pub use projection::{project_to_local_2d, unproject_from_local_2d, LocalFrame};
pub use registry::{GeometryRegistry, ModelHandle};
pub use retriangulate::{retriangulate_mesh, MeshAssembler, RetriangulationStats};
pub use transform::{matrix_from_column_major, transform_mesh};
pub use tri_tri::{intersect_triangles, IntersectionSegment, TriTriIntersector, TriangleIntersector};
pub use triangulation::{
    triangulate_with_loops, BoundaryTriangulator, ConformingTriangulator, Triangulated2D, DISCARD_ID,
};
