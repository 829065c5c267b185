// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Directed-edge connectivity for closed triangle meshes
//!
//! A directed edge is a triangle corner encoded as `3*f + k`, pointing from
//! corner `k` of face `f` to corner `(k+1)%3`. Connectivity lives in two flat
//! arrays indexed by vertex and directed-edge id, so growth during refinement
//! is plain reallocation and no cyclic ownership exists.

use super::Mesh;
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

/// Sentinel for "no edge"
pub const INVALID: u32 = u32::MAX;

/// Source vertex of a directed edge
#[inline]
pub fn edge_source(faces: &[[u32; 3]], d: u32) -> u32 {
    faces[(d / 3) as usize][(d % 3) as usize]
}

/// Destination vertex of a directed edge
#[inline]
pub fn edge_dest(faces: &[[u32; 3]], d: u32) -> u32 {
    faces[(d / 3) as usize][((d + 1) % 3) as usize]
}

/// Directed-edge topology of a closed triangle mesh
#[derive(Debug, Clone)]
pub struct HalfEdgeTopology {
    /// One outgoing directed edge per vertex
    pub v2e: Vec<u32>,
    /// Opposite directed edge of each directed edge
    pub e2e: Vec<u32>,
}

impl HalfEdgeTopology {
    /// Build connectivity from the face array.
    ///
    /// Fails on open or non-manifold edges: every directed edge must pair
    /// with exactly one opposite, and every vertex must have an incident
    /// face.
    pub fn build(faces: &[[u32; 3]], num_vertices: usize) -> Result<Self> {
        let mut v2e = vec![INVALID; num_vertices];
        let mut e2e = vec![INVALID; faces.len() * 3];

        let mut dedges: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3 / 2);
        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let v0 = face[k];
                let v1 = face[(k + 1) % 3];
                let d = (f * 3 + k) as u32;
                v2e[v0 as usize] = d;
                if let Some(&rid) = dedges.get(&(v1, v0)) {
                    if e2e[rid as usize] != INVALID {
                        bail!("edge ({v1}, {v0}) is shared by more than two faces");
                    }
                    e2e[d as usize] = rid;
                    e2e[rid as usize] = d;
                } else if dedges.insert((v0, v1), d).is_some() {
                    bail!("duplicate directed edge ({v0}, {v1}) at face {f}");
                }
            }
        }

        for (v, &d) in v2e.iter().enumerate() {
            if d == INVALID {
                bail!("vertex {v} has no incident face");
            }
        }
        for (d, &opp) in e2e.iter().enumerate() {
            if opp == INVALID {
                bail!("directed edge {d} has no opposite (mesh is not closed)");
            }
        }

        Ok(Self { v2e, e2e })
    }

    /// Next outgoing directed edge around the source vertex of `d`
    #[inline]
    pub fn next_around(&self, d: u32) -> u32 {
        self.e2e[(d / 3 * 3 + (d + 2) % 3) as usize]
    }

    /// Outgoing directed edges around vertex `v`, in rotation order
    pub fn ring_edges(&self, v: u32) -> RingEdges<'_> {
        let start = self.v2e[v as usize];
        RingEdges {
            topo: self,
            start,
            current: start,
            started: false,
        }
    }

    /// Check the involution and the source/destination symmetry of every
    /// directed edge.
    pub fn validate(&self, faces: &[[u32; 3]]) -> Result<()> {
        for d in 0..self.e2e.len() as u32 {
            let opp = self.e2e[d as usize];
            if self.e2e[opp as usize] != d {
                bail!("involution broken at directed edge {d}");
            }
            if edge_source(faces, opp) != edge_dest(faces, d)
                || edge_dest(faces, opp) != edge_source(faces, d)
            {
                bail!("opposite of directed edge {d} does not reverse it");
            }
        }
        Ok(())
    }

    /// Whether the incident corners of `v` form a single fan under rotation
    pub fn is_vertex_manifold(&self, faces: &[[u32; 3]], v: u32) -> bool {
        let corners = faces
            .iter()
            .flat_map(|f| f.iter())
            .filter(|&&c| c == v)
            .count();
        self.ring_edges(v).count() == corners
    }

    /// Duplicate every vertex whose incident corners split into several
    /// rotation fans, rewriting the extra fans onto fresh vertex ids.
    ///
    /// Returns the number of vertices added. Connectivity must be rebuilt
    /// from scratch afterwards.
    pub fn split_nonmanifold_vertices(&self, mesh: &mut Mesh) -> usize {
        let num_v = mesh.vertex_count();
        let mut incident: Vec<Vec<u32>> = vec![Vec::new(); num_v];
        for (f, face) in mesh.faces.iter().enumerate() {
            for k in 0..3 {
                incident[face[k] as usize].push((f * 3 + k) as u32);
            }
        }

        let mut added = 0;
        for v in 0..num_v {
            let ring_len = self.ring_edges(v as u32).count();
            if ring_len == incident[v].len() {
                continue;
            }

            let mut remaining: HashSet<u32> = incident[v].iter().copied().collect();
            let mut first_fan = true;
            while !remaining.is_empty() {
                let start = incident[v]
                    .iter()
                    .copied()
                    .find(|d| remaining.contains(d))
                    .unwrap();
                let mut fan = Vec::new();
                let mut d = start;
                loop {
                    fan.push(d);
                    d = self.next_around(d);
                    if d == start {
                        break;
                    }
                }
                for d in &fan {
                    remaining.remove(d);
                }

                // The first fan keeps the original vertex id
                if !first_fan {
                    let position = mesh.vertices[v];
                    let nv = mesh.add_vertex(position);
                    for &d in &fan {
                        mesh.faces[(d / 3) as usize][(d % 3) as usize] = nv;
                    }
                    added += 1;
                }
                first_fan = false;
            }
        }
        added
    }
}

/// Iterator over the outgoing directed edges of one vertex
pub struct RingEdges<'a> {
    topo: &'a HalfEdgeTopology,
    start: u32,
    current: u32,
    started: bool,
}

impl Iterator for RingEdges<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.started && self.current == self.start {
            return None;
        }
        self.started = true;
        let d = self.current;
        self.current = self.topo.next_around(d);
        Some(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;

    #[test]
    fn test_build_tetrahedron() {
        let mesh = primitives::tetrahedron();
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count()).unwrap();
        topo.validate(&mesh.faces).unwrap();

        // Every tetrahedron vertex has a three-edge ring
        for v in 0..4 {
            assert_eq!(topo.ring_edges(v).count(), 3);
            assert!(topo.is_vertex_manifold(&mesh.faces, v));
        }
    }

    #[test]
    fn test_build_rejects_open_mesh() {
        let faces = vec![[0u32, 1, 2]];
        assert!(HalfEdgeTopology::build(&faces, 3).is_err());
    }

    #[test]
    fn test_build_rejects_overshared_edge() {
        // Three faces around the same undirected edge (0, 1)
        let faces = vec![[0u32, 1, 2], [1, 0, 3], [0, 1, 4]];
        assert!(HalfEdgeTopology::build(&faces, 5).is_err());
    }

    #[test]
    fn test_ring_matches_corner_count() {
        let mesh = primitives::sphere(1.0, 8, 8);
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count()).unwrap();
        for v in 0..mesh.vertex_count() as u32 {
            assert!(topo.is_vertex_manifold(&mesh.faces, v));
        }
    }

    #[test]
    fn test_split_bowtie_vertex() {
        // Two tetrahedra glued at a single shared apex vertex
        let mut mesh = primitives::tetrahedron();
        let apex = 0u32;
        let offset = mesh.vertex_count() as u32;
        let second = primitives::tetrahedron();
        for (i, p) in second.vertices.iter().enumerate() {
            if i as u32 != apex {
                mesh.add_vertex(p + nalgebra::Vector3::new(3.0, 0.0, 0.0));
            }
        }
        // Remap the second tetrahedron's faces: apex stays shared, the rest
        // shift past the first tetrahedron's vertices.
        let remap = |v: u32| {
            if v == apex {
                apex
            } else if v < apex {
                offset + v
            } else {
                offset + v - 1
            }
        };
        for face in &second.faces {
            mesh.add_face([remap(face[0]), remap(face[1]), remap(face[2])]);
        }

        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count()).unwrap();
        assert!(!topo.is_vertex_manifold(&mesh.faces, apex));

        let before = mesh.vertex_count();
        let added = topo.split_nonmanifold_vertices(&mut mesh);
        assert_eq!(added, 1);
        assert_eq!(mesh.vertex_count(), before + 1);

        // After rebuilding, every vertex is a single fan
        let topo = HalfEdgeTopology::build(&mesh.faces, mesh.vertex_count()).unwrap();
        topo.validate(&mesh.faces).unwrap();
        for v in 0..mesh.vertex_count() as u32 {
            assert!(topo.is_vertex_manifold(&mesh.faces, v));
        }

        // Splitting again changes nothing
        let added = topo.split_nonmanifold_vertices(&mut mesh);
        assert_eq!(added, 0);
    }
}
