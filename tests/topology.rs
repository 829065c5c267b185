// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Topology invariants across build, repair, and refinement

use anyhow::Result;
use meshfit::geometry::{edge_dest, edge_source, primitives};
use meshfit::{HalfEdgeTopology, MeshProjector, ProjectionParams};

#[test]
fn test_involution_after_build() -> Result<()> {
    let mesh = primitives::sphere(1.0, 10, 14);
    let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count())?;

    for d in 0..mesh.face_count() as u32 * 3 {
        let opp = topo.e2e[d as usize];
        assert_eq!(topo.e2e[opp as usize], d);
        assert_eq!(edge_source(&mesh.faces, opp), edge_dest(&mesh.faces, d));
    }
    Ok(())
}

#[test]
fn test_involution_and_manifoldness_survive_refinement() -> Result<()> {
    let target = primitives::sphere(1.0, 16, 24);
    let working = primitives::sphere(1.0, 4, 6);

    let mut projector = MeshProjector::new(&target, &working)?;
    projector.run(&ProjectionParams::default())?;

    // Refinement must have triggered for this check to mean anything
    assert!(projector.mesh().face_count() > working.face_count());

    let faces = &projector.mesh().faces;
    let topo = projector.topology();
    topo.validate(faces)?;
    for v in 0..projector.mesh().vertex_count() as u32 {
        assert!(topo.is_vertex_manifold(faces, v), "vertex {v} not manifold");
    }

    // A rebuild from the refined faces agrees with the incremental arrays
    let rebuilt = HalfEdgeTopology::build(faces, projector.mesh().vertex_count())?;
    assert_eq!(rebuilt.e2e, topo.e2e);
    Ok(())
}

#[test]
fn test_face_count_never_decreases() -> Result<()> {
    let target = primitives::sphere(1.0, 12, 18);
    for (rings, segments) in [(4, 6), (6, 9), (8, 12)] {
        let working = primitives::sphere(1.0, rings, segments);
        let mut projector = MeshProjector::new(&target, &working)?;
        projector.run(&ProjectionParams::default())?;
        assert!(projector.mesh().face_count() >= working.face_count());
    }
    Ok(())
}

#[test]
fn test_residuals_bounded_after_convergence() -> Result<()> {
    let target = primitives::sphere(1.0, 16, 24);
    let working = primitives::sphere(1.0, 5, 8);

    let params = ProjectionParams::default();
    let mut projector = MeshProjector::new(&target, &working)?;
    projector.run(&params)?;

    // Characteristic length of the run, recomputed the same way
    let f0 = working.faces[0];
    let len = (target.vertices[f0[0] as usize] - target.vertices[f0[1] as usize]).norm();
    let tolerance = len * params.refine_ratio;

    for (v, &sqr) in projector.residuals().iter().enumerate() {
        assert!(
            sqr.sqrt() <= tolerance,
            "vertex {v} residual {} above the refinement tolerance {tolerance}",
            sqr.sqrt()
        );
    }
    Ok(())
}
