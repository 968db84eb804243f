//! Stage 2 entry point: intersect classified data with USFS ownership,
//! filter, dissolve and stage per-rank outputs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use fra_pipeline::config::RunConfig;
use fra_pipeline::engine::{FeatureClassRef, JsonStoreEngine};
use fra_pipeline::models::LayerKind;
use fra_pipeline::stages::intersect;

#[derive(Parser)]
#[command(name = "intersect-ownership", version)]
#[command(about = "Intersect a classified dataset with the USFS ownership layer and stage the dissolved results")]
struct Cli {
    /// Root workspace folder holding all staging containers
    workspace: PathBuf,

    /// Dataset category tag (TESP, Wildlife_Sites, Wildlife_Observations,
    /// Critical_Habitat_Lines, Critical_Habitat_Polygons, CNDDB, Local,
    /// NOAA_ESU, Condor_Nest, Condor_Hacking)
    layer_type: String,

    /// Path to the input feature class. Omitted for Local and NOAA_ESU,
    /// which iterate their source workspace.
    input: Option<PathBuf>,

    /// Species summary lookup table; defaults to
    /// <workspace>/csv_tables/AllMerge_SummaryTable.csv
    #[arg(long)]
    lookup: Option<PathBuf>,

    /// Override the run year (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
}

fn main() -> anyhow::Result<()> {
    fra_pipeline::init_tracing();
    let cli = Cli::parse();

    let cfg = RunConfig::for_today(&cli.workspace).with_year(cli.year);
    tracing::info!(year = cfg.year, "Run year");

    let kind: LayerKind = cli.layer_type.parse()?;
    let lookup = cli.lookup.unwrap_or_else(|| {
        cli.workspace
            .join("csv_tables")
            .join("AllMerge_SummaryTable.csv")
    });

    let input = match &cli.input {
        Some(path) => Some(
            FeatureClassRef::from_path(path)
                .context("input must name a feature class inside a workspace")?,
        ),
        None => None,
    };

    let mut engine = JsonStoreEngine::new();
    let outcome = intersect::run(&cfg, &mut engine, input.as_ref(), kind, &lookup)
        .with_context(|| format!("intersect-ownership failed for {}", kind.as_str()))?;

    tracing::info!(
        dissolved = outcome.dissolved.len(),
        excluded = outcome.exclusions.total(),
        "Completed script successfully"
    );
    Ok(())
}
