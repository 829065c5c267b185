// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Meshfit CLI

use anyhow::Result;
use clap::Parser;
use meshfit::{io, MeshProjector, ProjectionParams};

#[derive(Parser)]
#[command(name = "meshfit")]
#[command(about = "Project a triangle mesh onto a target surface", long_about = None)]
struct Cli {
    /// Target OBJ file (the surface to project onto)
    target: String,

    /// Working OBJ file (the mesh being projected)
    working: String,

    /// Output OBJ file
    #[arg(short, long, default_value = "projected.obj")]
    output: String,

    /// Residual tolerance as a fraction of the first input edge length
    #[arg(long, default_value_t = 1e-3)]
    ratio: f64,

    /// Maximum adaptive refinement rounds
    #[arg(long, default_value_t = 4)]
    rounds: usize,

    /// Print projection statistics as JSON
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = io::read_obj(&cli.target)?;
    let working = io::read_obj(&cli.working)?;

    let params = ProjectionParams {
        refine_ratio: cli.ratio,
        max_refine_rounds: cli.rounds,
    };

    let mut projector = MeshProjector::new(&target, &working)?;
    projector.run(&params)?;

    if cli.stats {
        let inconsistent = projector.boundary_check();
        let stats = serde_json::json!({
            "vertices": projector.mesh().vertex_count(),
            "faces": projector.mesh().face_count(),
            "max_residual": projector.max_residual(),
            "inconsistent_normals": inconsistent,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "projected {} vertices / {} faces, max residual {:.3e}",
            projector.mesh().vertex_count(),
            projector.mesh().face_count(),
            projector.max_residual()
        );
    }

    io::write_obj(&projector.into_mesh(), &cli.output)?;
    Ok(())
}
