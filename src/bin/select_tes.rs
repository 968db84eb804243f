//! Stage 1 entry point: project, select, classify and buffer one
//! dataset category.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use fra_pipeline::config::RunConfig;
use fra_pipeline::engine::{FeatureClassRef, JsonStoreEngine};
use fra_pipeline::models::LayerKind;
use fra_pipeline::stages::select_tes;

#[derive(Parser)]
#[command(name = "select-tes", version)]
#[command(about = "Select, classify and buffer a TES dataset against the species lookup table")]
struct Cli {
    /// Root workspace folder holding all staging containers
    workspace: PathBuf,

    /// Path to the input feature class (workspace/name)
    input: PathBuf,

    /// Species summary lookup table (comma-separated, no header row)
    lookup: PathBuf,

    /// Dataset category tag (TESP, Wildlife_Sites, Wildlife_Observations,
    /// Critical_Habitat_Lines, Critical_Habitat_Polygons, CNDDB)
    layer_type: String,

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
    let input = FeatureClassRef::from_path(&cli.input)
        .context("input must name a feature class inside a workspace")?;

    let mut engine = JsonStoreEngine::new();
    let outcome = select_tes::run(&cfg, &mut engine, &input, &cli.lookup, kind)
        .with_context(|| format!("select-tes failed for {}", kind.as_str()))?;

    tracing::info!(
        selected = outcome.selected,
        endangered = outcome.tally.endangered,
        threatened = outcome.tally.threatened,
        sensitive = outcome.tally.sensitive,
        other = outcome.tally.other,
        geocomplete = %outcome.geocomplete,
        "Script complete, check data and proceed to intersection"
    );
    Ok(())
}
