// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Projection module - constrained projection onto a target surface

mod coloring;
mod normals;
mod position;
mod projector;
mod refine;

pub use projector::MeshProjector;

use serde::{Deserialize, Serialize};

/// Numeric tolerance shared by the solvers
pub(crate) const ZERO_THRES: f64 = 1e-9;

/// Projection tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Residual tolerance for edge splitting, as a fraction of the
    /// characteristic edge length
    pub refine_ratio: f64,
    /// Maximum number of adaptive refinement rounds
    pub max_refine_rounds: usize,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            refine_ratio: 1e-3,
            max_refine_rounds: 4,
        }
    }
}
