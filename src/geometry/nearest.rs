// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Nearest-point queries against a static triangle mesh
//!
//! An AABB tree built once over the target surface answers
//! `point -> (squared distance, face, foot point)` for single points and for
//! batches. The tree is immutable after construction, so batched queries fan
//! out across threads.

use super::{BoundingBox, Mesh};
use anyhow::{bail, Result};
use nalgebra::Point3;
use rayon::prelude::*;

/// Result of a nearest-point query
#[derive(Debug, Clone, Copy)]
pub struct NearestHit {
    /// Squared distance from the query point to the surface
    pub sqr_dist: f64,
    /// Index of the target face containing the foot point
    pub face: u32,
    /// Nearest point on the surface
    pub point: Point3<f64>,
}

/// Tree node
#[derive(Debug, Clone)]
struct Node {
    bbox: BoundingBox,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
    /// Triangle indices (only for leaf nodes)
    triangles: Vec<u32>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// AABB tree over the faces of a fixed triangle mesh
#[derive(Debug, Clone)]
pub struct AabbTree {
    root: Node,
    /// Corner positions per face, resolved at build time
    corners: Vec<[Point3<f64>; 3]>,
}

impl AabbTree {
    /// Build the tree over every face of `mesh`
    pub fn build(mesh: &Mesh) -> Result<Self> {
        if mesh.face_count() == 0 {
            bail!("cannot build an AABB tree over an empty mesh");
        }

        let corners: Vec<[Point3<f64>; 3]> = (0..mesh.face_count())
            .map(|f| {
                let [p0, p1, p2] = mesh.face_points(f);
                [*p0, *p1, *p2]
            })
            .collect();

        let items: Vec<(u32, BoundingBox)> = corners
            .iter()
            .enumerate()
            .map(|(f, tri)| {
                let mut bbox = BoundingBox::empty();
                for p in tri {
                    bbox.expand_to_include(p);
                }
                (f as u32, bbox)
            })
            .collect();

        let root = Self::build_recursive(items, 0);
        Ok(Self { root, corners })
    }

    fn build_recursive(mut items: Vec<(u32, BoundingBox)>, depth: usize) -> Node {
        const MAX_DEPTH: usize = 32;
        const MIN_TRIANGLES: usize = 4;

        let bbox = items
            .iter()
            .fold(BoundingBox::empty(), |acc, (_, b)| acc.union(b));

        if items.len() <= MIN_TRIANGLES || depth >= MAX_DEPTH {
            let triangles = items.iter().map(|(f, _)| *f).collect();
            return Node {
                bbox,
                left: None,
                right: None,
                triangles,
            };
        }

        // Split at the median along the longest axis
        let size = bbox.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        items.sort_unstable_by(|(_, a), (_, b)| {
            a.center()[axis]
                .partial_cmp(&b.center()[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_items = items.split_off(items.len() / 2);
        let left = Box::new(Self::build_recursive(items, depth + 1));
        let right = Box::new(Self::build_recursive(right_items, depth + 1));

        Node {
            bbox,
            left: Some(left),
            right: Some(right),
            triangles: Vec::new(),
        }
    }

    /// Nearest point on the surface to a single query point
    pub fn query_one(&self, point: &Point3<f64>) -> NearestHit {
        let mut best = NearestHit {
            sqr_dist: f64::INFINITY,
            face: 0,
            point: *point,
        };
        self.query_recursive(&self.root, point, &mut best);
        best
    }

    /// Nearest points for a batch of queries
    pub fn query(&self, points: &[Point3<f64>]) -> Vec<NearestHit> {
        points.par_iter().map(|p| self.query_one(p)).collect()
    }

    fn query_recursive(&self, node: &Node, point: &Point3<f64>, best: &mut NearestHit) {
        if node.bbox.distance_squared_to(point) >= best.sqr_dist {
            return;
        }

        if node.is_leaf() {
            for &f in &node.triangles {
                let [a, b, c] = &self.corners[f as usize];
                let foot = closest_point_on_triangle(point, a, b, c);
                let d = (foot - point).norm_squared();
                if d < best.sqr_dist {
                    *best = NearestHit {
                        sqr_dist: d,
                        face: f,
                        point: foot,
                    };
                }
            }
            return;
        }

        // Descend into the nearer child first for tighter pruning
        let left = node.left.as_deref().unwrap();
        let right = node.right.as_deref().unwrap();
        let dl = left.bbox.distance_squared_to(point);
        let dr = right.bbox.distance_squared_to(point);
        if dl <= dr {
            self.query_recursive(left, point, best);
            self.query_recursive(right, point, best);
        } else {
            self.query_recursive(right, point, best);
            self.query_recursive(left, point, best);
        }
    }
}

/// Closest point on triangle `(a, b, c)` to `p`, classifying the closest
/// feature (interior, edge, or corner) through barycentric regions.
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;

    #[test]
    fn test_closest_point_regions() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);

        // Above the interior
        let p = Point3::new(0.5, 0.5, 1.0);
        let foot = closest_point_on_triangle(&p, &a, &b, &c);
        assert!((foot - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);

        // Beyond a corner
        let p = Point3::new(-1.0, -1.0, 0.0);
        let foot = closest_point_on_triangle(&p, &a, &b, &c);
        assert!((foot - a).norm() < 1e-12);

        // Beyond an edge
        let p = Point3::new(1.0, -1.0, 0.0);
        let foot = closest_point_on_triangle(&p, &a, &b, &c);
        assert!((foot - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_tree_matches_brute_force() {
        let mesh = primitives::sphere(1.0, 8, 12);
        let tree = AabbTree::build(&mesh).unwrap();

        let queries = [
            Point3::new(2.0, 0.3, -0.4),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-0.2, 1.5, 0.9),
            Point3::new(0.01, -0.02, 3.0),
        ];

        for q in &queries {
            let hit = tree.query_one(q);
            let mut best = f64::INFINITY;
            for f in 0..mesh.face_count() {
                let [a, b, c] = mesh.face_points(f);
                let foot = closest_point_on_triangle(q, a, b, c);
                best = best.min((foot - q).norm_squared());
            }
            assert!((hit.sqr_dist - best).abs() < 1e-12);
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let mesh = primitives::cube(2.0);
        let tree = AabbTree::build(&mesh).unwrap();
        let points = vec![
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-5.0, 2.0, 1.0),
        ];
        let hits = tree.query(&points);
        for (p, hit) in points.iter().zip(&hits) {
            let single = tree.query_one(p);
            assert_eq!(hit.face, single.face);
            assert_eq!(hit.sqr_dist, single.sqr_dist);
        }
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(AabbTree::build(&Mesh::new()).is_err());
    }
}
