// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Constrained per-vertex position step
//!
//! Moves one vertex as far as possible toward its foot point on the target
//! without flipping any incident triangle or reversing any incident plane
//! against the smoothed vertex normals. Each incident corner contributes
//! three linear half-space constraints on the displacement; the step slides
//! along the boundaries of up to three simultaneously tight constraints
//! before the feasible cone collapses.

use super::ZERO_THRES;
use crate::geometry::{HalfEdgeTopology, Mesh};
use nalgebra::{Point3, Vector3};

/// Constraints closer than this to the projected direction are treated as
/// still binding and re-enforced.
const BOUNDARY_THRES: f64 = 1e-3;

/// Steps below this are clipped to zero (the vertex is pinned).
const MIN_STEP: f64 = 1e-6;

pub(crate) fn optimize_position(
    mesh: &mut Mesh,
    topo: &HalfEdgeTopology,
    vertex_normals: &[Vector3<f64>],
    v: u32,
    target: Point3<f64>,
) {
    // One half-space row `a . delta <= b` per incident corner and vertex
    // normal. Rows that cannot be normalized belong to degenerate triangles
    // and are dropped.
    let mut rows_a: Vec<Vector3<f64>> = Vec::new();
    let mut rows_b: Vec<f64> = Vec::new();
    for d in topo.ring_edges(v) {
        let f = (d / 3) as usize;
        let k = (d % 3) as usize;
        let v0 = mesh.faces[f][k] as usize;
        let v1 = mesh.faces[f][(k + 1) % 3] as usize;
        let v2 = mesh.faces[f][(k + 2) % 3] as usize;

        let edge = mesh.vertices[v2] - mesh.vertices[v1];
        for n in [
            vertex_normals[v0],
            vertex_normals[v1],
            vertex_normals[v2],
        ] {
            let a = edge.cross(&n);
            let len = a.norm();
            if len < ZERO_THRES {
                continue;
            }
            let a = a / len;
            rows_a.push(a);
            rows_b.push(a.dot(&(mesh.vertices[v1] - mesh.vertices[v0])));
        }
    }

    let mut attached = vec![false; rows_a.len()];
    let mut constraints: Vec<Vector3<f64>> = Vec::with_capacity(3);

    // Each pass either completes the remaining step or attaches at least one
    // new constraint, so the row count bounds the iterations.
    for _ in 0..rows_a.len() {
        let offset = target - mesh.vertices[v as usize];
        let mut tar_step = offset.norm();
        if tar_step < ZERO_THRES {
            return;
        }
        let mut tar_dir = offset / tar_step;

        if !constraints.is_empty() {
            // Pull the direction onto the boundary of the most recently
            // attached constraint.
            let last = *constraints.last().unwrap();
            let mut temp_dir = tar_dir - tar_dir.dot(&last) * last;
            let mut shrink = temp_dir.norm();
            if shrink < ZERO_THRES {
                return;
            }
            temp_dir /= shrink;

            // Tight constraints the projected direction would re-enter
            let boundary: Vec<Vector3<f64>> = constraints
                .iter()
                .copied()
                .filter(|c| c.dot(&temp_dir) > -BOUNDARY_THRES)
                .collect();
            if boundary.len() == 3 {
                return;
            }
            if boundary.len() == 2 {
                // Slide along the intersection line of the two boundaries
                temp_dir = boundary[0].cross(&boundary[1]);
                if temp_dir.dot(&tar_dir) < 0.0 {
                    temp_dir = -temp_dir;
                }
                let n = temp_dir.norm();
                if n < ZERO_THRES {
                    return;
                }
                temp_dir /= n;
                let still_binding = constraints
                    .iter()
                    .filter(|c| c.dot(&temp_dir) > -BOUNDARY_THRES)
                    .count();
                if still_binding == 3 {
                    return;
                }
            }

            // Constraints the direction moves strictly away from stop
            // binding and are released.
            constraints.retain(|c| c.dot(&temp_dir) > -BOUNDARY_THRES);
            match constraints.len() {
                3 => return,
                2 => {
                    let line = constraints[0].cross(&constraints[1]).normalize();
                    temp_dir = tar_dir.dot(&line) * line;
                    shrink = temp_dir.norm();
                    if shrink < ZERO_THRES {
                        return;
                    }
                    temp_dir /= shrink;
                }
                _ => {}
            }
            tar_step *= shrink;
            tar_dir = temp_dir;
        }

        // Largest step along the direction before any free row goes tight
        let mut max_step = tar_step;
        for j in 0..rows_a.len() {
            if attached[j] {
                continue;
            }
            let den = rows_a[j].dot(&tar_dir);
            if den < ZERO_THRES {
                continue;
            }
            let step = rows_b[j] / den;
            if step < max_step {
                max_step = step;
            }
        }
        if max_step < MIN_STEP {
            max_step = 0.0;
        }

        mesh.vertices[v as usize] += max_step * tar_dir;

        if max_step == tar_step {
            return;
        }

        // Shift the free rows by the taken step and attach one newly tight,
        // linearly independent row. Dependent tight rows are marked attached
        // without entering the active set.
        let constraint_count = constraints.len();
        let mut pushed = false;
        for j in 0..rows_a.len() {
            if attached[j] {
                continue;
            }
            let den = rows_a[j].dot(&tar_dir);
            rows_b[j] -= den * max_step;

            if rows_b[j] < ZERO_THRES && den >= ZERO_THRES {
                let dependent = match constraint_count {
                    1 => constraints[0].cross(&rows_a[j]).norm() < ZERO_THRES,
                    2 => {
                        let n = constraints[0].cross(&constraints[1]);
                        n.normalize().dot(&rows_a[j]).abs() < ZERO_THRES
                    }
                    _ => false,
                };
                if !dependent {
                    if !pushed {
                        constraints.push(rows_a[j]);
                        attached[j] = true;
                        pushed = true;
                    }
                } else {
                    attached[j] = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;

    fn signed_volume(mesh: &Mesh) -> f64 {
        let mut volume = 0.0;
        for f in 0..mesh.face_count() {
            let [a, b, c] = mesh.face_points(f);
            volume += a.coords.dot(&b.coords.cross(&c.coords)) / 6.0;
        }
        volume
    }

    fn setup(mesh: &Mesh) -> (HalfEdgeTopology, Vec<Vector3<f64>>) {
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count()).unwrap();
        let normals = (0..mesh.vertex_count() as u32)
            .map(|v| crate::projection::normals::smoothed_vertex_normal(mesh, &topo, v, true))
            .collect();
        (topo, normals)
    }

    #[test]
    fn test_unconstrained_step_reaches_target() {
        // Pushing a cube corner slightly outward is unconstrained
        let mut mesh = primitives::cube(2.0);
        let (topo, normals) = setup(&mesh);
        let target = mesh.vertices[6] + Vector3::new(0.05, 0.05, 0.05);
        optimize_position(&mut mesh, &topo, &normals, 6, target);
        assert!((mesh.vertices[6] - target).norm() < 1e-12);
    }

    #[test]
    fn test_step_never_inverts_tetrahedron() {
        // Drag the apex far through the opposite face; the constraints must
        // stop it before any triangle flips.
        let mut mesh = primitives::tetrahedron();
        let (topo, normals) = setup(&mesh);
        let before = mesh.vertices[0];
        let target = Point3::new(-3.0, -3.0, -3.0);
        optimize_position(&mut mesh, &topo, &normals, 0, target);

        // Real progress toward the target, but never through the base plane
        assert!((mesh.vertices[0] - before).norm() > 0.1);
        assert!(signed_volume(&mesh) >= 0.0);
    }

    #[test]
    fn test_zero_residual_is_left_in_place() {
        let mut mesh = primitives::cube(2.0);
        let (topo, normals) = setup(&mesh);
        let before = mesh.vertices[3];
        optimize_position(&mut mesh, &topo, &normals, 3, before);
        assert_eq!(mesh.vertices[3], before);
    }
}
