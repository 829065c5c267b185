// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Smoothed vertex normals and the constrained normal step

use super::ZERO_THRES;
use crate::geometry::{HalfEdgeTopology, Mesh};
use nalgebra::Vector3;

/// Angle-weighted smoothed normal at vertex `v`.
///
/// Each incident face contributes its normal scaled by the interior angle at
/// `v`. With `conservative` set, a second pass removes any component that
/// dips below an incident face plane, then the sum is unit-normalized.
pub(crate) fn smoothed_vertex_normal(
    mesh: &Mesh,
    topo: &HalfEdgeTopology,
    v: u32,
    conservative: bool,
) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for d in topo.ring_edges(v) {
        let f = (d / 3) as usize;
        let k = (d % 3) as usize;
        let v0 = mesh.faces[f][k] as usize;
        let v1 = mesh.faces[f][(k + 1) % 3] as usize;
        let v2 = mesh.faces[f][(k + 2) % 3] as usize;

        let mut d0 = mesh.vertices[v1] - mesh.vertices[v0];
        let mut d1 = mesh.vertices[v2] - mesh.vertices[v0];
        if d0.normalize_mut() < ZERO_THRES || d1.normalize_mut() < ZERO_THRES {
            continue;
        }
        let cross = d0.cross(&d1);
        let l = cross.norm();
        if l > 0.0 {
            // asin(l)/l turns the cross product into an angle weight
            n += cross * (l.min(1.0).asin() / l);
        }
    }

    if conservative {
        for d in topo.ring_edges(v) {
            let f = (d / 3) as usize;
            let fnm = mesh.face_normal(f);
            let dot = n.dot(&fnm);
            if dot < 0.0 {
                n -= dot * fnm;
            }
        }
    }

    let len = n.norm();
    if len > 0.0 {
        n / len
    } else {
        n
    }
}

/// Step the stored vertex normal toward `target` as far as every incident
/// face normal allows.
///
/// Picks the largest `alpha` in `[0, 1]` keeping
/// `fn . (prev + alpha * (target - prev)) >= 0` for all incident faces. The
/// result is intentionally not renormalized; the next smoothing pass does
/// that.
pub(crate) fn optimize_normal(
    topo: &HalfEdgeTopology,
    face_normals: &[Vector3<f64>],
    v: u32,
    prev: Vector3<f64>,
    target: Vector3<f64>,
) -> Vector3<f64> {
    let d = target - prev;
    let mut max_step: f64 = 1.0;
    for e in topo.ring_edges(v) {
        let fnm = face_normals[(e / 3) as usize];
        let den = d.dot(&fnm);
        if den < -ZERO_THRES {
            let step = -fnm.dot(&prev) / den;
            if step < max_step {
                max_step = step;
            }
        }
    }
    if max_step < 0.0 {
        max_step = 0.0;
    }
    prev + max_step * d
}
