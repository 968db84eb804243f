//! Stage 3 entry point: merge every staged category into the final
//! distributable and non-distributable stores.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use fra_pipeline::config::RunConfig;
use fra_pipeline::engine::JsonStoreEngine;
use fra_pipeline::stages::final_merge;

#[derive(Parser)]
#[command(name = "final-merge", version)]
#[command(about = "Merge per-rank staged feature classes into the final staging geodatabases")]
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
    let outcome = final_merge::run(&cfg, &mut engine).context("final-merge failed")?;

    for (rank, count) in &outcome.merged {
        tracing::info!(rank = rank.as_str(), records = count, "Merged rank");
    }
    tracing::info!("Merge and export complete, ready to run wo-hydro");
    Ok(())
}
