// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and spatial structures

mod bbox;
mod halfedge;
mod mesh;
mod nearest;
pub mod primitives;

pub use bbox::BoundingBox;
pub use halfedge::{edge_dest, edge_source, HalfEdgeTopology, RingEdges, INVALID};
pub use mesh::Mesh;
pub use nearest::{closest_point_on_triangle, AabbTree, NearestHit};
