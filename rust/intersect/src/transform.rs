// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement transforms for meshes
//!
//! Hosts pass placements as 16 doubles in column-major order (the layout of
//! a flattened 4x4 matrix in most graphics APIs).

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use nalgebra::Matrix4;

/// Build an affine transform from 16 column-major values
///
/// Rejects non-finite entries and matrices whose bottom row is not
/// `(0, 0, 0, 1)`.
pub fn matrix_from_column_major(values: &[f64; 16]) -> Result<Matrix4<f64>> {
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::InvalidTransformation(format!(
            "non-finite matrix entry {}",
            v
        )));
    }

    let matrix = Matrix4::from_column_slice(values);
    let bottom = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
    if bottom != [0.0, 0.0, 0.0, 1.0] {
        return Err(Error::InvalidTransformation(format!(
            "not an affine transform, bottom row {:?}",
            bottom
        )));
    }

    Ok(matrix)
}

/// Apply `transform` to every vertex of `mesh`
///
/// Mirroring transforms (negative determinant) also reverse face winding so
/// outward normals stay outward.
pub fn transform_mesh(mesh: &Mesh, transform: &Matrix4<f64>) -> Mesh {
    let mut out = mesh.map_points(|p| transform.transform_point(p));

    let linear = transform.fixed_view::<3, 3>(0, 0);
    if linear.determinant() < 0.0 {
        out.flip_winding();
    }
    out
}
