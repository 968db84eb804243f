//! Stage 2: intersect against USFS ownership, filter, dissolve, stage.
//!
//! Every record that survives intersection carries the ownership layer's
//! `UnitID_FS` and `FORESTNAME`; `UnitID` is populated from the former,
//! the dataset-specific exclusion rules run, and the result is dissolved
//! down to the descriptive field set before the per-rank staging copies.
//! Local and NOAA runs loop over every feature class in their source
//! workspace; Condor runs additionally archive their scratch outputs.

use std::path::Path;

use crate::config::RunConfig;
use crate::engine::{FeatureClassRef, SpatialEngine};
use crate::models::lookup::LookupTable;
use crate::models::record::fields;
use crate::models::{LayerKind, Rank};
use crate::rules::{apply_post_intersect, ExclusionTally};
use crate::workspace;

use super::{copy_rank_splits, StageError, StagingTarget};

/// Fields every stage-2 dissolve keeps.
const DISSOLVE_FIELDS: [&str; 9] = [
    fields::UNIT_ID,
    fields::GRANK_FIRE,
    fields::SNAME_FIRE,
    fields::CNAME_FIRE,
    fields::SOURCEFIRE,
    fields::BUFFT_FIRE,
    fields::BUFFM_FIRE,
    fields::CMNT_FIRE,
    fields::INST_FIRE,
];

#[derive(Debug)]
pub struct IntersectOutcome {
    /// The dissolved feature class produced for each processed input.
    pub dissolved: Vec<FeatureClassRef>,
    pub exclusions: ExclusionTally,
}

pub fn run(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    input: Option<&FeatureClassRef>,
    kind: LayerKind,
    lookup_path: &Path,
) -> Result<IntersectOutcome, StageError> {
    provision_containers(cfg, engine, kind)?;

    let table = LookupTable::from_csv_path(lookup_path)?;
    let ownership = workspace::ownership_fc(cfg);
    let sources = resolve_sources(cfg, engine, input, kind)?;

    let mut dissolved_outputs = Vec::with_capacity(sources.len());
    let mut exclusions = ExclusionTally::default();

    for (source, scratch_ws) in sources {
        tracing::info!(feature_class = %source, "Intersecting with USFS ownership");
        let intersect_fc = FeatureClassRef::new(&scratch_ws, format!("{}_intersect", source.name));
        engine.intersect(&source, &ownership, &intersect_fc)?;
        tracing::info!(records = engine.count(&intersect_fc)?, "Completed intersection");

        // Datasets without a filter pass stage their interim copy now;
        // the filtered ones export after deletion.
        if !kind.filters_after_intersect() {
            copy_rank_splits(cfg, engine, &intersect_fc, kind, &source.name, StagingTarget::Interim)?;
        }

        let tally = populate_and_filter(engine, &intersect_fc, kind, &table)?;
        if tally.total() > 0 {
            tracing::info!(
                coho = tally.coho,
                rana_muscosa = tally.rana_muscosa,
                plants_0512 = tally.plants_0512,
                rana_boylii = tally.rana_boylii,
                unprotected_forest = tally.unprotected_forest,
                "Removed records by exclusion rules"
            );
        }
        exclusions = exclusions.merged(tally);

        if kind.filters_after_intersect() {
            copy_rank_splits(cfg, engine, &intersect_fc, kind, &source.name, StagingTarget::Interim)?;
        }

        engine.repair_geometry(&intersect_fc)?;

        tracing::info!("Dissolving features");
        let dissolve_fc = intersect_fc.with_suffix("_dissolved");
        let mut dissolve_fields: Vec<&str> = DISSOLVE_FIELDS.to_vec();
        if kind.dissolve_includes_buff_dist() {
            dissolve_fields.push(fields::BUFF_DIST);
        }
        engine.dissolve(&intersect_fc, &dissolve_fc, &dissolve_fields)?;
        engine.repair_geometry(&dissolve_fc)?;

        copy_rank_splits(cfg, engine, &dissolve_fc, kind, &source.name, StagingTarget::Final)?;

        if kind.is_condor() {
            archive_condor_scratch(cfg, engine, &intersect_fc, &dissolve_fc)?;
        } else {
            dissolved_outputs.push(dissolve_fc);
        }
    }

    tracing::info!("Completed intersection stage");
    Ok(IntersectOutcome {
        dissolved: dissolved_outputs,
        exclusions,
    })
}

/// Per-rank staging GDBs, plus the Local/Condor output workspaces.
fn provision_containers(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    kind: LayerKind,
) -> Result<(), StageError> {
    for rank in Rank::ALL {
        workspace::ensure_dir(&workspace::rank_dir(cfg, rank))?;
        for gdb in [workspace::ident_gdb(cfg, rank), workspace::interim_gdb(cfg, rank)] {
            if let (Some(parent), Some(name)) =
                (gdb.parent(), gdb.file_name().and_then(|n| n.to_str()))
            {
                workspace::ensure_file_gdb(engine, parent, name)?;
            }
        }
    }

    let output_tag = match kind {
        LayerKind::Local => Some("Local"),
        LayerKind::CondorNest | LayerKind::CondorHacking => Some("Condor"),
        _ => None,
    };
    if let Some(tag) = output_tag {
        workspace::ensure_dir(&workspace::output_dir(cfg))?;
        workspace::ensure_dir(&workspace::output_dir(cfg).join(tag))?;
        let gdb = workspace::layer_gdb(cfg, tag);
        if let (Some(parent), Some(name)) = (gdb.parent(), gdb.file_name().and_then(|n| n.to_str()))
        {
            workspace::ensure_file_gdb(engine, parent, name)?;
        }
    }
    Ok(())
}

/// Which feature classes this run processes, paired with the workspace
/// their scratch outputs land in.
fn resolve_sources(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    input: Option<&FeatureClassRef>,
    kind: LayerKind,
) -> Result<Vec<(FeatureClassRef, std::path::PathBuf)>, StageError> {
    match kind {
        LayerKind::Local => {
            let source_gdb = workspace::local_data_gdb(cfg, "Local");
            let scratch_ws = workspace::layer_gdb(cfg, "Local");
            let names = engine.list_feature_classes(&source_gdb)?;
            if names.is_empty() {
                return Err(StageError::EmptyWorkspace(source_gdb));
            }
            Ok(names
                .into_iter()
                .map(|name| (FeatureClassRef::new(&source_gdb, name), scratch_ws.clone()))
                .collect())
        }
        LayerKind::NoaaEsu => {
            let noaa_gdb = workspace::layer_gdb(cfg, "NOAA_ESU");
            let names: Vec<_> = engine
                .list_feature_classes(&noaa_gdb)?
                .into_iter()
                .filter(|name| name.ends_with("_geocomplete"))
                .collect();
            if names.is_empty() {
                return Err(StageError::EmptyWorkspace(noaa_gdb));
            }
            Ok(names
                .into_iter()
                .map(|name| (FeatureClassRef::new(&noaa_gdb, name), noaa_gdb.clone()))
                .collect())
        }
        _ => {
            let input = input.ok_or_else(|| StageError::UnsupportedLayer {
                stage: "intersect-ownership",
                layer: format!("{} requires an input feature class", kind.as_str()),
            })?;
            Ok(vec![(input.clone(), input.workspace.clone())])
        }
    }
}

/// Copy `UnitID_FS` into `UnitID` on every record, then run the
/// dataset-specific exclusion rules.
fn populate_and_filter(
    engine: &mut dyn SpatialEngine,
    intersect_fc: &FeatureClassRef,
    kind: LayerKind,
    table: &LookupTable,
) -> Result<ExclusionTally, StageError> {
    tracing::info!("Updating UnitID field from intersection");
    let mut records = engine.read_records(intersect_fc)?;
    for rec in &mut records {
        let unit = rec.text_or_empty(fields::UNIT_ID_FS).to_string();
        rec.set_text(fields::UNIT_ID, unit);
    }
    let tally = apply_post_intersect(kind, table, &mut records);
    engine.write_records(intersect_fc, records)?;
    Ok(tally)
}

/// Condor runs archive their scratch outputs into the Condor output GDB
/// and drop the scratch copies.
fn archive_condor_scratch(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    intersect_fc: &FeatureClassRef,
    dissolve_fc: &FeatureClassRef,
) -> Result<(), StageError> {
    let condor_gdb = workspace::layer_gdb(cfg, "Condor");
    engine.export_to_workspace(
        &[intersect_fc.clone(), dissolve_fc.clone()],
        &condor_gdb,
    )?;
    engine.delete_feature_class(intersect_fc)?;
    engine.delete_feature_class(dissolve_fc)?;
    tracing::info!(gdb = %condor_gdb.display(), "Archived Condor scratch outputs");
    Ok(())
}
