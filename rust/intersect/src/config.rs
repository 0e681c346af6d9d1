// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerances and policies for mesh-mesh intersection.
//!
//! All numeric knobs of the pipeline live in [`IntersectConfig`]. The defaults
//! target meshes expressed in metres; [`IntersectConfig::for_millimetres`]
//! widens the absolute tolerances for models authored in millimetres.
//! Absolute lengths (`loop_epsilon`, `weld_radius`) are in model units.
//! Relative tolerances scale with triangle extent and need no preset.

/// Conditioning factor applied when projecting into a triangle's local frame
pub const DEFAULT_PROJECTION_SCALE: f64 = 1000.0;

/// Cut segments no longer than this, in model units, collapse into a point
pub const DEFAULT_LOOP_EPSILON: f64 = 1e-7;

/// Relative tolerance used by the intersection and triangulation primitives
pub const EPS_TINY: f64 = 1e-9;

/// Default radius for merging output vertices, in model units
pub const DEFAULT_WELD_RADIUS: f64 = 1e-7;

/// How edge loops are oriented inside a triangle's local frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopWinding {
    /// Orient along `n_self × n_other`, so the two meshes traverse a shared
    /// cut in opposite directions.
    #[default]
    Computed,
    /// Always swap the segment endpoints (legacy behaviour).
    Reversed,
    /// Keep the order reported by the intersection primitive.
    Preserved,
}

/// Configuration for the intersection pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectConfig {
    /// Local-frame coordinates are divided by this factor on projection and
    /// multiplied back on unprojection.
    pub projection_scale: f64,
    /// Cut segments no longer than this (model units) collapse into a point
    /// loop. Should not exceed `weld_radius`.
    pub loop_epsilon: f64,
    /// Tri-tri tolerance, relative to the larger triangle extent.
    pub intersection_tolerance: f64,
    /// Snapping and sliver tolerance, relative to the outer triangle extent.
    pub triangulation_tolerance: f64,
    /// Output vertices closer than this are merged. `0.0` merges only
    /// bit-identical points.
    pub weld_radius: f64,
    /// Orientation policy for edge loops.
    pub loop_winding: LoopWinding,
}

impl IntersectConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            projection_scale: DEFAULT_PROJECTION_SCALE,
            loop_epsilon: DEFAULT_LOOP_EPSILON,
            intersection_tolerance: EPS_TINY,
            triangulation_tolerance: EPS_TINY,
            weld_radius: DEFAULT_WELD_RADIUS,
            loop_winding: LoopWinding::Computed,
        }
    }

    /// Preset for models authored in millimetres
    ///
    /// Every model-unit length is scaled by 1000 so a millimetre scene is
    /// cut exactly like the same scene in metres.
    pub fn for_millimetres() -> Self {
        Self {
            loop_epsilon: DEFAULT_LOOP_EPSILON * 1000.0,
            weld_radius: DEFAULT_WELD_RADIUS * 1000.0,
            ..Self::new()
        }
    }

    pub fn with_projection_scale(mut self, scale: f64) -> Self {
        self.projection_scale = scale;
        self
    }

    pub fn with_loop_epsilon(mut self, epsilon: f64) -> Self {
        self.loop_epsilon = epsilon;
        self
    }

    pub fn with_intersection_tolerance(mut self, tolerance: f64) -> Self {
        self.intersection_tolerance = tolerance;
        self
    }

    pub fn with_triangulation_tolerance(mut self, tolerance: f64) -> Self {
        self.triangulation_tolerance = tolerance;
        self
    }

    pub fn with_weld_radius(mut self, radius: f64) -> Self {
        self.weld_radius = radius;
        self
    }

    pub fn with_loop_winding(mut self, winding: LoopWinding) -> Self {
        self.loop_winding = winding;
        self
    }
}

impl Default for IntersectConfig {
    fn default() -> Self {
        Self::new()
    }
}
