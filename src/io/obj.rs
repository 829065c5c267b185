// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wavefront OBJ import and export
//!
//! Supports the subset the projection driver needs: `v x y z` and
//! triangular `f` lines. Face entries may carry `/vt/vn` suffixes, which are
//! ignored. Indices are 1-based; negative (relative) indices count from the
//! end of the vertex list.

use crate::geometry::Mesh;
use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read a triangle mesh from an OBJ file
pub fn read_obj<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut mesh = Mesh::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let mut coord = |name| -> Result<f64> {
                    parts
                        .next()
                        .with_context(|| format!("line {}: missing {name}", line_no + 1))?
                        .parse::<f64>()
                        .with_context(|| format!("line {}: bad {name}", line_no + 1))
                };
                let x = coord("x")?;
                let y = coord("y")?;
                let z = coord("z")?;
                mesh.add_vertex(Point3::new(x, y, z));
            }
            Some("f") => {
                let mut indices = Vec::with_capacity(3);
                for entry in parts {
                    // "7", "7/1", "7//3", "7/1/3" all reference vertex 7
                    let vertex = entry.split('/').next().unwrap_or(entry);
                    let idx: i64 = vertex
                        .parse()
                        .with_context(|| format!("line {}: bad face index", line_no + 1))?;
                    let resolved = if idx < 0 {
                        mesh.vertex_count() as i64 + idx
                    } else {
                        idx - 1
                    };
                    if resolved < 0 || resolved >= mesh.vertex_count() as i64 {
                        bail!("line {}: face index {idx} out of range", line_no + 1);
                    }
                    indices.push(resolved as u32);
                }
                if indices.len() != 3 {
                    bail!(
                        "line {}: only triangular faces are supported (got {} corners)",
                        line_no + 1,
                        indices.len()
                    );
                }
                mesh.add_face([indices[0], indices[1], indices[2]]);
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Write a triangle mesh to an OBJ file
pub fn write_obj<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for face in &mesh.faces {
        writeln!(out, "f {} {} {}", face[0] + 1, face[1] + 1, face[2] + 1)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip() -> Result<()> {
        let mesh = primitives::sphere(1.0, 5, 7);
        let file = NamedTempFile::new()?;
        write_obj(&mesh, file.path())?;
        let loaded = read_obj(file.path())?;

        assert_eq!(loaded.vertex_count(), mesh.vertex_count());
        assert_eq!(loaded.faces, mesh.faces);
        for (a, b) in mesh.vertices.iter().zip(&loaded.vertices) {
            assert!((a - b).norm() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_reads_slashed_faces() -> Result<()> {
        let file = NamedTempFile::new()?;
        std::fs::write(
            file.path(),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        )?;
        let mesh = read_obj(file.path())?;
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        Ok(())
    }

    #[test]
    fn test_rejects_quads() -> Result<()> {
        let file = NamedTempFile::new()?;
        std::fs::write(
            file.path(),
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )?;
        assert!(read_obj(file.path()).is_err());
        Ok(())
    }
}
