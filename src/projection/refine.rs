// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Adaptive edge-split refinement
//!
//! Densifies the working mesh wherever the projection residual stays above
//! the tolerance: edges whose midpoint lies too far from the target are
//! split, split faces are retriangulated in place, the directed-edge arrays
//! are patched incrementally, and the solver re-converges on the inserted
//! vertices.

use super::projector::MeshProjector;
use super::ProjectionParams;
use crate::geometry::{edge_dest, edge_source, NearestHit, INVALID};
use anyhow::{anyhow, Result};
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};

impl MeshProjector {
    pub(crate) fn adaptive_refine(&mut self, len: f64, params: &ProjectionParams) -> Result<()> {
        let tolerance = len * params.refine_ratio;

        // Canonical orientation: one directed edge per undirected edge
        let mut candidates: Vec<u32> = (0..self.mesh.face_count() as u32 * 3)
            .filter(|&d| self.topo.e2e[d as usize] > d)
            .collect();

        for _ in 0..params.max_refine_rounds {
            if candidates.is_empty() {
                break;
            }

            let midpoints: Vec<Point3<f64>> = candidates
                .iter()
                .map(|&d| {
                    let v0 = edge_source(&self.mesh.faces, d) as usize;
                    let v1 = edge_dest(&self.mesh.faces, d) as usize;
                    nalgebra::center(&self.mesh.vertices[v0], &self.mesh.vertices[v1])
                })
                .collect();
            let hits = self.query_points(&midpoints);

            // Only midpoints still far off the target survive
            let survivors: Vec<(u32, Point3<f64>, NearestHit)> = candidates
                .iter()
                .zip(&midpoints)
                .zip(&hits)
                .filter(|(_, hit)| hit.sqr_dist.sqrt() > tolerance)
                .map(|((&d, &p), &hit)| (d, p, hit))
                .collect();
            if survivors.is_empty() {
                break;
            }

            let prev_vertex_num = self.mesh.vertex_count() as u32;
            let prev_face_num = self.mesh.face_count() as u32;

            // Insert one midpoint vertex per surviving edge, registering the
            // split with the faces on both sides.
            let mut face_splits: BTreeMap<u32, [u32; 3]> = BTreeMap::new();
            for &(d, p, hit) in &survivors {
                let nv = self.mesh.vertex_count() as u32;
                let mut deid = d;
                for _ in 0..2 {
                    let f = deid / 3;
                    let slot = (deid % 3) as usize;
                    face_splits.entry(f).or_insert([INVALID; 3])[slot] = nv;
                    deid = self.topo.e2e[deid as usize];
                }

                // Back at the original edge; the new vertex inherits the
                // smoothed normal of the edge source.
                let v0 = edge_source(&self.mesh.faces, deid) as usize;
                self.mesh.add_vertex(p);
                let n = self.vertex_normals[v0];
                self.vertex_normals.push(n);
                self.foot_points.push(hit.point);
                self.sqr_dist.push(hit.sqr_dist);
                self.source_faces.push(hit.face);
            }

            // Retriangulate each split face in place. Unsplit edges that
            // cross into untouched neighbors keep their old pairing through
            // the stub entries.
            let mut dedges: HashMap<(u32, u32), u32> = HashMap::new();
            for (&f, splits) in &face_splits {
                let fi = f as usize;
                let fnm = self.face_normals[fi];
                let face = self.mesh.faces[fi];
                let count = splits.iter().filter(|&&s| s != INVALID).count();
                match count {
                    3 => {
                        let [v0, v1, v2] = face;
                        let [nv0, nv1, nv2] = *splits;
                        self.mesh.faces[fi] = [v0, nv0, nv2];
                        self.mesh.add_face([nv0, nv1, nv2]);
                        self.mesh.add_face([nv0, v1, nv1]);
                        self.mesh.add_face([nv2, nv1, v2]);
                        self.face_normals.extend([fnm, fnm, fnm]);
                    }
                    2 => {
                        let j = splits.iter().position(|&s| s == INVALID).unwrap();
                        let v0 = face[j];
                        let v1 = face[(j + 1) % 3];
                        let v2 = face[(j + 2) % 3];
                        let nv0 = splits[(j + 1) % 3];
                        let nv1 = splits[(j + 2) % 3];

                        dedges.insert((v1, v0), self.topo.e2e[fi * 3 + j]);

                        self.mesh.faces[fi] = [v0, v1, nv0];
                        self.mesh.add_face([v0, nv0, nv1]);
                        self.mesh.add_face([nv1, nv0, v2]);
                        self.face_normals.extend([fnm, fnm]);
                    }
                    1 => {
                        let j = splits.iter().position(|&s| s != INVALID).unwrap();
                        let v0 = face[j];
                        let v1 = face[(j + 1) % 3];
                        let v2 = face[(j + 2) % 3];
                        let nv0 = splits[j];

                        dedges.insert((v2, v1), self.topo.e2e[fi * 3 + (j + 1) % 3]);
                        dedges.insert((v0, v2), self.topo.e2e[fi * 3 + (j + 2) % 3]);

                        self.mesh.faces[fi] = [v0, nv0, v2];
                        self.mesh.add_face([nv0, v1, v2]);
                        self.face_normals.push(fnm);
                    }
                    _ => unreachable!("face registered without a split"),
                }
            }

            // Patch connectivity: register every directed edge of the
            // rewritten and new faces, then pair everything through the map.
            self.topo.v2e.resize(self.mesh.vertex_count(), INVALID);
            self.topo.e2e.resize(self.mesh.face_count() * 3, INVALID);

            let rewritten: Vec<u32> = face_splits
                .keys()
                .copied()
                .chain(prev_face_num..self.mesh.face_count() as u32)
                .collect();
            for &f in &rewritten {
                let face = self.mesh.faces[f as usize];
                for i in 0..3u32 {
                    let v0 = face[i as usize];
                    let v1 = face[((i + 1) % 3) as usize];
                    let dedge = f * 3 + i;
                    self.topo.v2e[v0 as usize] = dedge;
                    dedges.insert((v0, v1), dedge);
                }
            }
            for (&(a, b), &deid) in &dedges {
                let rdeid = *dedges
                    .get(&(b, a))
                    .ok_or_else(|| anyhow!("directed edge ({b}, {a}) lost its opposite in refinement"))?;
                self.topo.e2e[deid as usize] = rdeid;
                self.topo.e2e[rdeid as usize] = deid;
            }

            // Next round only re-tests edges touching a new vertex
            candidates.clear();
            for &f in &rewritten {
                let face = self.mesh.faces[f as usize];
                for i in 0..3u32 {
                    let v0 = face[i as usize];
                    let v1 = face[((i + 1) % 3) as usize];
                    if v0 >= prev_vertex_num || v1 >= prev_vertex_num {
                        let dedge = f * 3 + i;
                        if self.topo.e2e[dedge as usize] > dedge {
                            candidates.push(dedge);
                        }
                    }
                }
            }

            // Converge the inserted vertices; everything else carries over
            self.active = (prev_vertex_num..self.mesh.vertex_count() as u32).collect();
            self.iterative_optimize(true);
        }
        Ok(())
    }
}
