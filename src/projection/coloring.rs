// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Independent-set vertex coloring
//!
//! Partitions the vertices so that no two vertices in a group share an edge.
//! Groups gate a future parallel sweep; the serial solver orders by residual
//! instead, so the coloring is advisory.

use crate::geometry::{edge_dest, HalfEdgeTopology};
use rand::seq::SliceRandom;

const UNCOLORED: u32 = u32::MAX;

/// Greedy coloring over the one-ring adjacency. Members of each finished
/// group are shuffled to reduce sweep-order bias.
pub(crate) fn compute_vertex_groups(
    faces: &[[u32; 3]],
    topo: &HalfEdgeTopology,
    num_vertices: usize,
) -> Vec<Vec<u32>> {
    let mut colors = vec![UNCOLORED; num_vertices];
    let mut groups = Vec::new();
    let mut marked = 0;
    let mut color = 0;

    while marked < num_vertices {
        let mut group = Vec::new();
        for v in 0..num_vertices {
            if colors[v] != UNCOLORED {
                continue;
            }
            let conflict = topo
                .ring_edges(v as u32)
                .any(|d| colors[edge_dest(faces, d) as usize] == color);
            if !conflict {
                colors[v] = color;
                group.push(v as u32);
                marked += 1;
            }
        }
        group.shuffle(&mut rand::rng());
        groups.push(group);
        color += 1;
    }
    groups
}
