//! Stage 1: project, select, classify, buffer.
//!
//! Takes one raw dataset, projects it into the category's output
//! workspace, keeps the records matching the species allow-list and the
//! category's attribute query, populates the derived fields from the
//! lookup table, stages per-rank no-buffer deliverables, then explodes,
//! repairs and buffers geometry into the `_geocomplete` feature class
//! the intersection stage consumes.

use std::path::Path;

use crate::config::RunConfig;
use crate::engine::{FeatureClassRef, SpatialEngine};
use crate::models::lookup::LookupTable;
use crate::models::record::fields;
use crate::models::{LayerKind, Rank};
use crate::rules::{Classifier, RankTally};
use crate::workspace;

use super::{copy_selection, StageError};

/// Shasta Crayfish hydrography merged into the CNDDB output.
const CRAYFISH_CLASSES: [&str; 2] = [
    "CNDDB_Endangered_ShastaCrayfish_NHDFlowlines",
    "CNDDB_Endangered_ShastaCrayfish_NHDWaterbodies",
];

/// MYLF study-area hydrography merged into the Wildlife Sites output.
const MYLF_CLASSES: [&str; 2] = [
    "EDW_WildlifeSites_NHDFlowlines_MYLF_StudyAreas_buffered",
    "EDW_WildlifeSites_NHDWaterbodys_MYLF_StudyAreas_buffered",
];

#[derive(Debug)]
pub struct SelectOutcome {
    /// The `_geocomplete` feature class ready for intersection.
    pub geocomplete: FeatureClassRef,
    pub selected: usize,
    pub tally: RankTally,
}

pub fn run(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    input: &FeatureClassRef,
    lookup_path: &Path,
    kind: LayerKind,
) -> Result<SelectOutcome, StageError> {
    if !kind.is_selectable() {
        return Err(StageError::UnsupportedLayer {
            stage: "select-tes",
            layer: kind.as_str().to_string(),
        });
    }

    tracing::info!(layer = kind.as_str(), input = %input, "Selecting TES layer");

    provision_containers(cfg, engine, kind)?;

    let tag = kind.as_str();
    let proj_ws = workspace::layer_gdb(cfg, tag);
    let fc_root = format!("{}_{}", tag, cfg.year);
    let original = FeatureClassRef::new(&proj_ws, format!("{fc_root}_original"));
    let selection = original.sibling(format!("{fc_root}_selection"));

    // Project to the working reference, or copy through when the data
    // already carries it.
    let spatial_ref = engine.spatial_reference(input)?;
    tracing::info!(current = %spatial_ref.name, "Checked input spatial reference");
    if spatial_ref.name != crate::config::CAALB83_NAME {
        tracing::info!("Reprojecting layer to NAD 1983 California Teale Albers");
        engine.project(input, &original, cfg.spatial_reference)?;
    } else {
        engine.copy_features(input, &original)?;
    }

    let table = LookupTable::from_csv_path(lookup_path)?;
    let Some(classifier) = Classifier::new(kind, &table, &cfg.pull_date()) else {
        return Err(StageError::UnsupportedLayer {
            stage: "select-tes",
            layer: kind.as_str().to_string(),
        });
    };

    // Selection: keep allow-listed records matching the category query.
    let records = engine.read_records(&original)?;
    let mut kept: Vec<_> = records
        .into_iter()
        .filter(|rec| classifier.selected(rec))
        .collect();
    let selected = kept.len();
    tracing::info!(records = selected, "Copied selected records to new feature class");

    // Classification: populate the derived attribute set in place.
    let mut tally = RankTally::default();
    for rec in &mut kept {
        classifier.classify(rec);
        tally.record(rec.rank());
    }
    let original_kind = engine.geometry_kind(&original)?;
    let original_sr = engine.spatial_reference(&original)?;
    engine.create_feature_class(&selection, original_kind, original_sr)?;
    engine.write_records(&selection, kept)?;
    tracing::info!(
        endangered = tally.endangered,
        threatened = tally.threatened,
        sensitive = tally.sensitive,
        other = tally.other,
        "Populated attributes"
    );

    stage_nobuf_deliverables(cfg, engine, &selection, kind)?;

    // Explode and repair before any buffering.
    let singlepart = original.sibling(format!("{fc_root}_singlepart"));
    engine.multipart_to_singlepart(&selection, &singlepart)?;
    let exploded = engine.count(&singlepart)? as i64 - engine.count(&selection)? as i64;
    tracing::info!(new_records = exploded, "Converted multipart geometry to singlepart");
    engine.repair_geometry(&singlepart)?;

    let geocomplete = original.sibling(format!("{fc_root}_geocomplete"));
    let buffered_single = original.sibling(format!("{fc_root}_buffered_single"));

    if kind == LayerKind::CriticalHabitatPolygons {
        // Polygon critical habitat ships unbuffered.
        engine.copy_features(&singlepart, &geocomplete)?;
    } else {
        tracing::info!("Buffering features");
        let buffer_fc = original.sibling(format!("{fc_root}_buffer"));
        engine.buffer(&singlepart, &buffer_fc, fields::BUFFM_FIRE)?;
        engine.multipart_to_singlepart(&buffer_fc, &buffered_single)?;
        engine.repair_geometry(&buffered_single)?;
        engine.copy_features(&buffered_single, &geocomplete)?;
    }

    match kind {
        LayerKind::Cnddb => merge_local_hydro(
            cfg,
            engine,
            "ShastaCrayfish",
            &CRAYFISH_CLASSES,
            &buffered_single,
            &fc_root,
            &geocomplete,
        )?,
        LayerKind::WildlifeSites => merge_local_hydro(
            cfg,
            engine,
            "MYLF",
            &MYLF_CLASSES,
            &buffered_single,
            &fc_root,
            &geocomplete,
        )?,
        LayerKind::WildlifeObservations => split_observations_by_rank(cfg, engine, &buffered_single)?,
        _ => {}
    }

    tracing::info!(geocomplete = %geocomplete, "Selection stage complete, proceed to intersection");

    Ok(SelectOutcome {
        geocomplete,
        selected,
        tally,
    })
}

/// Rank deliverable folders/GDBs plus this category's output workspace.
fn provision_containers(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    kind: LayerKind,
) -> Result<(), StageError> {
    for rank in Rank::ALL {
        workspace::ensure_dir(&workspace::rank_dir(cfg, rank))?;
        let gdb = workspace::nobuf_gdb(cfg, rank);
        ensure_gdb(engine, &gdb)?;
    }

    workspace::ensure_dir(&workspace::output_dir(cfg))?;
    workspace::ensure_dir(&workspace::output_dir(cfg).join(kind.as_str()))?;
    ensure_gdb(engine, &workspace::layer_gdb(cfg, kind.as_str()))?;
    Ok(())
}

fn ensure_gdb(engine: &mut dyn SpatialEngine, gdb: &Path) -> Result<(), StageError> {
    let (Some(parent), Some(name)) = (gdb.parent(), gdb.file_name().and_then(|n| n.to_str()))
    else {
        return Ok(());
    };
    workspace::ensure_file_gdb(engine, parent, name)?;
    Ok(())
}

/// Split the classified selection by rank into the FWS no-buffer
/// deliverable GDBs.
fn stage_nobuf_deliverables(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    selection: &FeatureClassRef,
    kind: LayerKind,
) -> Result<(), StageError> {
    for rank in Rank::ALL {
        let Some(name) = kind.nobuf_name(cfg.year, rank) else {
            continue;
        };
        let dst = FeatureClassRef::new(workspace::nobuf_gdb(cfg, rank), name);
        let count = copy_selection(engine, selection, &dst, |rec| {
            rec.rank() == Some(rank.as_str())
        })?;
        tracing::info!(
            rank = rank.as_str(),
            records = count,
            "Staged no-buffer deliverable"
        );
    }
    Ok(())
}

/// Pull locally maintained hydrography feature classes into the output
/// workspace and merge them with the buffered selection.
fn merge_local_hydro(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    local_tag: &str,
    class_names: &[&str],
    buffered_single: &FeatureClassRef,
    fc_root: &str,
    geocomplete: &FeatureClassRef,
) -> Result<(), StageError> {
    let local_gdb = workspace::local_data_gdb(cfg, local_tag);
    let sources: Vec<_> = class_names
        .iter()
        .map(|name| FeatureClassRef::new(&local_gdb, *name))
        .collect();

    tracing::info!(tag = local_tag, "Moving local hydrography into output workspace");
    engine.export_to_workspace(&sources, &buffered_single.workspace)?;

    let mut merge_inputs: Vec<_> = class_names
        .iter()
        .map(|name| buffered_single.sibling(*name))
        .collect();
    merge_inputs.push(buffered_single.clone());

    let merge_fc = buffered_single.sibling(format!("{fc_root}_merge"));
    tracing::info!(inputs = merge_inputs.len(), "Merging with local hydrography");
    engine.merge(&merge_inputs, &merge_fc)?;
    engine.repair_geometry(&merge_fc)?;
    engine.copy_features(&merge_fc, geocomplete)?;
    Ok(())
}

/// Wildlife Observations intersect per rank, so the buffered output is
/// split into three feature classes ahead of time.
fn split_observations_by_rank(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    buffered_single: &FeatureClassRef,
) -> Result<(), StageError> {
    for rank in Rank::ALL {
        let dst = buffered_single.sibling(format!(
            "EDW_FishWildlife_Observation_{}_{}",
            cfg.year,
            rank.initial()
        ));
        let count = copy_selection(engine, buffered_single, &dst, |rec| {
            rec.rank() == Some(rank.as_str())
        })?;
        tracing::info!(rank = rank.as_str(), records = count, "Split observations by rank");
    }
    Ok(())
}
