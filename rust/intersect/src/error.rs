// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for intersection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mesh intersection
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Triangle intersection failed: {0}")]
    IntersectionFailed(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    #[error("Unknown model handle {0}")]
    UnknownModel(u32),

    #[error("Model {0} is closed")]
    ModelClosed(u32),

    #[error("Model {model} has no geometry #{id}")]
    UnknownGeometry { model: u32, id: u32 },
}
