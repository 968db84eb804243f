//! Stage 3: merge per-category outputs, stage final deliverables.
//!
//! For each rank, every feature class in the `IdentInter` GDB is merged
//! into one feature class, exported to the non-distributable staging
//! GDB, then dissolved down to `(UnitID, GRANK_FIRE)` and exported to
//! the distributable staging GDB. The dissolved scratch copy is deleted
//! to keep the staging stores unambiguous.

use crate::config::RunConfig;
use crate::engine::{FeatureClassRef, SpatialEngine};
use crate::models::record::fields;
use crate::models::Rank;
use crate::workspace;

use super::StageError;

#[derive(Debug)]
pub struct MergeOutcome {
    /// Ranks that had feature classes to merge, with merged counts.
    pub merged: Vec<(Rank, usize)>,
}

pub fn run(cfg: &RunConfig, engine: &mut dyn SpatialEngine) -> Result<MergeOutcome, StageError> {
    provision_containers(cfg, engine)?;

    let nodist = workspace::nodist_gdb(cfg);
    let dist = workspace::dist_gdb(cfg);
    let mut merged = Vec::new();

    for rank in Rank::ALL {
        let ident = workspace::ident_gdb(cfg, rank);
        let names = engine.list_feature_classes(&ident)?;
        if names.is_empty() {
            tracing::warn!(rank = rank.as_str(), gdb = %ident.display(), "No feature classes to merge, skipping rank");
            continue;
        }
        tracing::info!(rank = rank.as_str(), classes = names.len(), "Merging feature classes");
        for name in &names {
            tracing::info!(feature_class = name.as_str(), "  merging");
        }

        let inputs: Vec<_> = names
            .iter()
            .map(|name| FeatureClassRef::new(&ident, name.clone()))
            .collect();
        let merge_fc = FeatureClassRef::new(
            workspace::merged_gdb(cfg, rank),
            format!("FireRetardantEIS_{}_Merged", rank.as_str()),
        );
        engine.merge(&inputs, &merge_fc)?;
        let count = engine.count(&merge_fc)?;
        tracing::info!(rank = rank.as_str(), records = count, "Finished merging feature classes");

        // Non-distributable staging: full attribute set.
        tracing::info!("Exporting feature class to final non-distributable geodatabase");
        engine.export_to_workspace(std::slice::from_ref(&merge_fc), &nodist)?;
        let nodist_fc = FeatureClassRef::new(&nodist, merge_fc.name.clone());
        let nodist_name = format!("FireRetardantEIS_{}_NoDistribution", rank.as_str());
        engine.rename_feature_class(&nodist_fc, &nodist_name)?;
        let nodist_fc = nodist_fc.sibling(nodist_name);

        // Distributable staging: dissolved to UnitID and rank only.
        tracing::info!(rank = rank.as_str(), "Dissolving features");
        let dissolve_fc = nodist_fc.with_suffix("_dissolved");
        engine.dissolve(&nodist_fc, &dissolve_fc, &[fields::UNIT_ID, fields::GRANK_FIRE])?;
        engine.repair_geometry(&dissolve_fc)?;

        tracing::info!("Exporting dissolved feature class to final distributable geodatabase");
        engine.export_to_workspace(std::slice::from_ref(&dissolve_fc), &dist)?;
        let dist_fc = FeatureClassRef::new(&dist, dissolve_fc.name.clone());
        engine.rename_feature_class(&dist_fc, &format!("FireRetardantEIS_{}", rank.as_str()))?;

        // Drop the scratch copy to avoid any filename confusion.
        engine.delete_feature_class(&dissolve_fc)?;

        merged.push((rank, count));
    }

    tracing::info!("Merge and export complete, ready for the forest deliverable");
    Ok(MergeOutcome { merged })
}

fn provision_containers(cfg: &RunConfig, engine: &mut dyn SpatialEngine) -> Result<(), StageError> {
    workspace::ensure_dir(&workspace::wo_dir(cfg))?;
    workspace::ensure_dir(&workspace::fws_dir(cfg))?;

    let fws = workspace::fws_dir(cfg);
    workspace::ensure_file_gdb(engine, &fws, &workspace::nodist_gdb_name(cfg))?;
    workspace::ensure_file_gdb(engine, &fws, &workspace::dist_gdb_name(cfg))?;

    for rank in Rank::ALL {
        workspace::ensure_dir(&workspace::rank_dir(cfg, rank))?;
        let gdb = workspace::merged_gdb(cfg, rank);
        if let (Some(parent), Some(name)) = (gdb.parent(), gdb.file_name().and_then(|n| n.to_str()))
        {
            workspace::ensure_file_gdb(engine, parent, name)?;
        }
        // The IdentInter GDB is this stage's input; provision it so a
        // run over a partially processed workspace lists cleanly.
        let ident = workspace::ident_gdb(cfg, rank);
        if let (Some(parent), Some(name)) =
            (ident.parent(), ident.file_name().and_then(|n| n.to_str()))
        {
            workspace::ensure_file_gdb(engine, parent, name)?;
        }
    }
    Ok(())
}
