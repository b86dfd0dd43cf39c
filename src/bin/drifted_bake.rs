//! Offline bake: `.tmx` map -> JSON asset.

use anyhow::{Context, Result};
use clap::Parser;
use drifted::{bake_tmx_file, BakeProfile};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drifted-bake")]
#[command(about = "Bake a Tiled .tmx map into a Drifted JSON asset")]
struct Args {
    /// Map to bake
    map: PathBuf,
    /// Which object records to extract
    #[arg(long, default_value = "game")]
    profile: BakeProfile,
    /// Output path; defaults to the map path with a .json extension
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("drifted=info".parse()?))
        .init();

    let args = Args::parse();
    let out = args.out.unwrap_or_else(|| args.map.with_extension("json"));

    let asset = bake_tmx_file(&args.map, args.profile)
        .with_context(|| format!("Baking {}", args.map.display()))?;
    asset
        .save(&out)
        .with_context(|| format!("Writing {}", out.display()))?;

    tracing::info!(
        "Baked {} ({} layers, profile {}) -> {}",
        args.map.display(),
        asset.map.layers.len(),
        args.profile,
        out.display()
    );
    Ok(())
}
