//! Stage 4 entry point: build the per-forest hydrography deliverables.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use fra_pipeline::config::RunConfig;
use fra_pipeline::engine::JsonStoreEngine;
use fra_pipeline::stages::wo_hydro;

#[derive(Parser)]
#[command(name = "wo-hydro", version)]
#[command(about = "Split the merged hydrography layers into one geodatabase per forest")]
struct Cli {
    /// Root workspace folder holding all staging containers
    workspace: PathBuf,

    /// Override the run year (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
}

fn main() -> anyhow::Result<()> {
    fra_pipeline::init_tracing();
    let cli = Cli::parse();

    let cfg = RunConfig::for_today(&cli.workspace).with_year(cli.year);
    tracing::info!(year = cfg.year, "Run year");

    let mut engine = JsonStoreEngine::new();
    let outcome = wo_hydro::run(&cfg, &mut engine).context("wo-hydro failed")?;

    tracing::info!(copies = outcome.copied.len(), "Forest deliverables complete");
    Ok(())
}
