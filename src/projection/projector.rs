// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Projection engine state and the active-set convergence loop

use super::coloring::compute_vertex_groups;
use super::normals::{optimize_normal, smoothed_vertex_normal};
use super::position::optimize_position;
use super::{ProjectionParams, ZERO_THRES};
use crate::geometry::{edge_dest, AabbTree, HalfEdgeTopology, Mesh};
use anyhow::{bail, Result};
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;

/// Per-sweep movements below this leave the mesh considered converged.
const CONVERGENCE_THRES: f64 = 1e-6;

/// Projects a working mesh onto a fixed target surface.
///
/// Owns every per-vertex and per-face buffer for the duration of the run and
/// hands the projected mesh back through [`MeshProjector::into_mesh`].
pub struct MeshProjector {
    tree: AabbTree,
    /// First input edge length, measured against the target vertex array
    characteristic_len: f64,
    pub(crate) mesh: Mesh,
    pub(crate) topo: HalfEdgeTopology,
    /// Smoothed unit normal per working vertex
    pub(crate) vertex_normals: Vec<Vector3<f64>>,
    /// Unit normal per working face
    pub(crate) face_normals: Vec<Vector3<f64>>,
    /// Foot point of each working vertex on the target
    pub(crate) foot_points: Vec<Point3<f64>>,
    /// Squared distance to the foot point
    pub(crate) sqr_dist: Vec<f64>,
    /// Target face containing the foot point
    pub(crate) source_faces: Vec<u32>,
    groups: Vec<Vec<u32>>,
    /// Vertices scheduled for the next sweep
    pub(crate) active: Vec<u32>,
}

impl MeshProjector {
    /// Prepare a projection of `working` onto `target`: build the target
    /// tree, repair non-manifold vertices of the working copy, and color its
    /// vertices.
    pub fn new(target: &Mesh, working: &Mesh) -> Result<Self> {
        let tree = AabbTree::build(target)?;

        // Characteristic length: the first input edge, measured against the
        // target vertex array. Taken before the non-manifold repair so it
        // always refers to the input indexing.
        let Some(face) = working.faces.first() else {
            bail!("working mesh has no faces");
        };
        let (v0, v1) = (face[0] as usize, face[1] as usize);
        if v0 >= target.vertex_count() || v1 >= target.vertex_count() {
            bail!("working mesh indices exceed the target vertex count");
        }
        let characteristic_len = (target.vertices[v0] - target.vertices[v1]).norm();

        let mut mesh = working.clone();
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count())?;
        topo.split_nonmanifold_vertices(&mut mesh);
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count())?;

        let groups = compute_vertex_groups(&mesh.faces, &topo, mesh.vertex_count());

        let num_v = mesh.vertex_count();
        Ok(Self {
            tree,
            characteristic_len,
            mesh,
            topo,
            vertex_normals: vec![Vector3::zeros(); num_v],
            face_normals: Vec::new(),
            foot_points: vec![Point3::origin(); num_v],
            sqr_dist: vec![0.0; num_v],
            source_faces: vec![0; num_v],
            groups,
            active: Vec::new(),
        })
    }

    /// Run the projection to convergence, then adaptively refine.
    pub fn run(&mut self, params: &ProjectionParams) -> Result<()> {
        self.iterative_optimize(false);
        self.adaptive_refine(self.characteristic_len, params)?;
        Ok(())
    }

    /// Consume the projector and return the projected mesh
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn topology(&self) -> &HalfEdgeTopology {
        &self.topo
    }

    /// Independent vertex groups computed before the first convergence
    pub fn vertex_groups(&self) -> &[Vec<u32>] {
        &self.groups
    }

    /// Squared residual per working vertex
    pub fn residuals(&self) -> &[f64] {
        &self.sqr_dist
    }

    /// Largest vertex-to-target distance
    pub fn max_residual(&self) -> f64 {
        self.sqr_dist
            .iter()
            .fold(0.0f64, |acc, &d| acc.max(d))
            .sqrt()
    }

    /// Re-query the oracle for every working vertex
    pub(crate) fn update_nearest_all(&mut self) {
        let hits = self.tree.query(&self.mesh.vertices);
        for (v, hit) in hits.iter().enumerate() {
            self.foot_points[v] = hit.point;
            self.sqr_dist[v] = hit.sqr_dist;
            self.source_faces[v] = hit.face;
        }
    }

    /// Batched oracle access for refinement midpoints
    pub(crate) fn query_points(&self, points: &[Point3<f64>]) -> Vec<crate::geometry::NearestHit> {
        self.tree.query(points)
    }

    /// Converge the active vertices.
    ///
    /// Each sweep walks the active set in descending residual order, steps
    /// every vertex toward its foot point, refreshes the incident face
    /// normals and the smoothed vertex normal, then constrains the stored
    /// normal. Vertices that moved (or rotated their normal) re-activate
    /// together with their one-rings, and their residuals are re-queried.
    pub(crate) fn iterative_optimize(&mut self, initialized: bool) {
        let num_v = self.mesh.vertex_count();
        if !initialized {
            self.vertex_normals = (0..num_v)
                .map(|v| smoothed_vertex_normal(&self.mesh, &self.topo, v as u32, true))
                .collect();
            self.update_nearest_all();
            self.face_normals = self.mesh.face_normals();
            self.active = (0..num_v as u32).collect();
        }

        loop {
            let mut order: Vec<(f64, u32)> = self
                .active
                .iter()
                .map(|&v| (self.sqr_dist[v as usize], v))
                .collect();
            order.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());

            let mut changed = false;
            let mut moved: Vec<u32> = Vec::new();

            for &(_, vid) in order.iter().rev() {
                let vi = vid as usize;

                let d0 = (self.mesh.vertices[vi] - self.foot_points[vi]).norm();
                optimize_position(
                    &mut self.mesh,
                    &self.topo,
                    &self.vertex_normals,
                    vid,
                    self.foot_points[vi],
                );
                let d1 = (self.mesh.vertices[vi] - self.foot_points[vi]).norm();

                for d in self.topo.ring_edges(vid) {
                    let f = (d / 3) as usize;
                    self.face_normals[f] = self.mesh.face_normal(f);
                }

                let prev_normal = self.vertex_normals[vi];
                let smoothed = smoothed_vertex_normal(&self.mesh, &self.topo, vid, false);
                self.vertex_normals[vi] =
                    optimize_normal(&self.topo, &self.face_normals, vid, prev_normal, smoothed);

                if (d1 - d0).abs() > ZERO_THRES
                    || prev_normal.dot(&self.vertex_normals[vi]) < 1.0 - ZERO_THRES
                {
                    if (d1 - d0).abs() > CONVERGENCE_THRES {
                        changed = true;
                    }
                    moved.push(vid);
                }
            }

            // Refresh residuals: everything if most of the mesh moved,
            // otherwise only the moved vertices.
            if moved.len() > num_v / 2 {
                self.update_nearest_all();
            } else if !moved.is_empty() {
                let points: Vec<Point3<f64>> = moved
                    .iter()
                    .map(|&v| self.mesh.vertices[v as usize])
                    .collect();
                let hits = self.tree.query(&points);
                for (&v, hit) in moved.iter().zip(&hits) {
                    self.foot_points[v as usize] = hit.point;
                    self.sqr_dist[v as usize] = hit.sqr_dist;
                    self.source_faces[v as usize] = hit.face;
                }
            }

            // Next generation: every moved vertex plus its one-ring
            let mut next: HashSet<u32> = HashSet::new();
            for &v in &moved {
                next.insert(v);
                for d in self.topo.ring_edges(v) {
                    next.insert(edge_dest(&self.mesh.faces, d));
                }
            }
            self.active = next.into_iter().collect();

            if !changed {
                break;
            }
        }
    }

    /// Re-smooth every vertex normal and constrain it against the incident
    /// face planes.
    pub fn optimize_normals(&mut self) {
        let prev: Vec<Vector3<f64>> = self.vertex_normals.clone();
        for v in 0..self.mesh.vertex_count() {
            self.vertex_normals[v] = smoothed_vertex_normal(&self.mesh, &self.topo, v as u32, false);
        }
        self.face_normals = self.mesh.face_normals();
        for v in 0..self.mesh.vertex_count() {
            self.vertex_normals[v] = optimize_normal(
                &self.topo,
                &self.face_normals,
                v as u32,
                prev[v],
                self.vertex_normals[v],
            );
        }
    }

    /// Count vertex/face-normal pairs that ended up inconsistent.
    ///
    /// Zero means no incident face plane reverses against any smoothed
    /// vertex normal.
    pub fn boundary_check(&mut self) -> usize {
        self.face_normals = self.mesh.face_normals();
        let mut inconsistent = 0;
        for v in 0..self.mesh.vertex_count() {
            let n = self.vertex_normals[v];
            for d in self.topo.ring_edges(v as u32) {
                let fnm = self.face_normals[(d / 3) as usize];
                if n.dot(&fnm) < -ZERO_THRES {
                    inconsistent += 1;
                }
            }
        }
        inconsistent
    }
}
