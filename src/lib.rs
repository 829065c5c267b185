// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Meshfit
//!
//! Projects a watertight triangle mesh onto a target triangle surface. The
//! output keeps the working mesh's combinatorial structure up to locally
//! adaptive refinement, never flips a triangle, and lands every vertex on or
//! arbitrarily close to the target.

pub mod geometry;
pub mod io;
pub mod projection;

pub use geometry::{AabbTree, HalfEdgeTopology, Mesh, NearestHit};
pub use projection::{MeshProjector, ProjectionParams};

use anyhow::Result;

/// Project `working` onto `target` with default parameters
pub fn project(target: &Mesh, working: &Mesh) -> Result<Mesh> {
    project_with_params(target, working, &ProjectionParams::default())
}

/// Project `working` onto `target`
pub fn project_with_params(
    target: &Mesh,
    working: &Mesh,
    params: &ProjectionParams,
) -> Result<Mesh> {
    let mut projector = MeshProjector::new(target, working)?;
    projector.run(params)?;
    Ok(projector.into_mesh())
}
