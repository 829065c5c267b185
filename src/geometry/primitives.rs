// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Closed shared-vertex test shapes
//!
//! Projection input must be watertight, so unlike typical render-oriented
//! generators these share vertices between adjacent faces.

use super::Mesh;
use nalgebra::Point3;
use std::f64::consts::PI;

/// Regular tetrahedron inscribed in the unit cube corners
pub fn tetrahedron() -> Mesh {
    let mut mesh = Mesh::with_capacity(4, 4);
    mesh.add_vertex(Point3::new(1.0, 1.0, 1.0));
    mesh.add_vertex(Point3::new(1.0, -1.0, -1.0));
    mesh.add_vertex(Point3::new(-1.0, 1.0, -1.0));
    mesh.add_vertex(Point3::new(-1.0, -1.0, 1.0));
    mesh.add_face([0, 1, 2]);
    mesh.add_face([0, 3, 1]);
    mesh.add_face([0, 2, 3]);
    mesh.add_face([1, 3, 2]);
    mesh
}

/// Axis-aligned cube centered at the origin
pub fn cube(size: f64) -> Mesh {
    let h = size / 2.0;
    let mut mesh = Mesh::with_capacity(8, 12);
    let corners = [
        Point3::new(-h, -h, -h),
        Point3::new(h, -h, -h),
        Point3::new(h, h, -h),
        Point3::new(-h, h, -h),
        Point3::new(-h, -h, h),
        Point3::new(h, -h, h),
        Point3::new(h, h, h),
        Point3::new(-h, h, h),
    ];
    for corner in corners {
        mesh.add_vertex(corner);
    }
    let faces: [[u32; 3]; 12] = [
        // Front (z+)
        [4, 5, 6],
        [4, 6, 7],
        // Back (z-)
        [1, 0, 3],
        [1, 3, 2],
        // Right (x+)
        [5, 1, 2],
        [5, 2, 6],
        // Left (x-)
        [0, 4, 7],
        [0, 7, 3],
        // Top (y+)
        [7, 6, 2],
        [7, 2, 3],
        // Bottom (y-)
        [0, 1, 5],
        [0, 5, 4],
    ];
    for face in faces {
        mesh.add_face(face);
    }
    mesh
}

/// UV sphere with `rings` latitude bands and `segments` longitude steps
pub fn sphere(radius: f64, rings: u32, segments: u32) -> Mesh {
    assert!(rings >= 2 && segments >= 3);

    let mut mesh = Mesh::new();
    let north = mesh.add_vertex(Point3::new(0.0, 0.0, radius));
    for r in 1..rings {
        let theta = PI * r as f64 / rings as f64;
        for s in 0..segments {
            let phi = 2.0 * PI * s as f64 / segments as f64;
            mesh.add_vertex(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    let south = mesh.add_vertex(Point3::new(0.0, 0.0, -radius));

    let ring_vertex = |r: u32, s: u32| 1 + (r - 1) * segments + (s % segments);

    for s in 0..segments {
        mesh.add_face([north, ring_vertex(1, s), ring_vertex(1, s + 1)]);
    }
    for r in 1..rings - 1 {
        for s in 0..segments {
            let a = ring_vertex(r, s);
            let b = ring_vertex(r, s + 1);
            let c = ring_vertex(r + 1, s + 1);
            let d = ring_vertex(r + 1, s);
            mesh.add_face([a, d, c]);
            mesh.add_face([a, c, b]);
        }
    }
    for s in 0..segments {
        mesh.add_face([south, ring_vertex(rings - 1, s + 1), ring_vertex(rings - 1, s)]);
    }
    mesh
}
