//! Staging-container layout and idempotent provisioning.
//!
//! Every folder and file-geodatabase name the four stages touch is built
//! here, so the layout lives in one place. Creation helpers skip
//! anything that already exists, which is what makes re-invoking a
//! failed stage safe.

use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::engine::{EngineError, FeatureClassRef, SpatialEngine};
use crate::models::forest::ForestUnit;
use crate::models::Rank;

/// Create a folder if missing. Returns true when it was created.
pub fn ensure_dir(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    tracing::info!(path = %path.display(), "Creating directory");
    std::fs::create_dir_all(path)?;
    Ok(true)
}

/// Create a file geodatabase if missing. Returns true when it was
/// created.
pub fn ensure_file_gdb(
    engine: &mut dyn SpatialEngine,
    parent: &Path,
    name: &str,
) -> Result<bool, EngineError> {
    if engine.workspace_exists(&parent.join(name)) {
        return Ok(false);
    }
    tracing::info!(gdb = name, parent = %parent.display(), "Creating geodatabase");
    engine.create_file_gdb(parent, name)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Per-rank staging containers
// ---------------------------------------------------------------------------

/// `<ws>/<year>_<rank>`, the folder holding one rank's deliverables.
pub fn rank_dir(cfg: &RunConfig, rank: Rank) -> PathBuf {
    cfg.workspace.join(format!("{}_{}", cfg.year, rank.as_str()))
}

/// FWS deliverable GDB of unbuffered selections.
pub fn nobuf_gdb(cfg: &RunConfig, rank: Rank) -> PathBuf {
    rank_dir(cfg, rank).join(format!(
        "{}_FRA_{}_OriginalDataNoBuffers_FWSDeliverable_CAALB83.gdb",
        cfg.year,
        rank.as_str()
    ))
}

/// FWS deliverable GDB of intersected (buffered and unbuffered) data.
pub fn interim_gdb(cfg: &RunConfig, rank: Rank) -> PathBuf {
    rank_dir(cfg, rank).join(format!(
        "{}_FRA_{}_OriginalDataBufferedAndNonBufferedAreas_CAALB83.gdb",
        cfg.year,
        rank.as_str()
    ))
}

/// Final per-rank staging GDB the merge stage reads.
pub fn ident_gdb(cfg: &RunConfig, rank: Rank) -> PathBuf {
    rank_dir(cfg, rank).join(format!("{}_{}_IdentInter_CAALB83.gdb", cfg.year, rank.as_str()))
}

/// Per-rank merged GDB produced by the merge stage.
pub fn merged_gdb(cfg: &RunConfig, rank: Rank) -> PathBuf {
    rank_dir(cfg, rank).join(format!("{}_{}_Merged_CAALB83.gdb", cfg.year, rank.as_str()))
}

// ---------------------------------------------------------------------------
// Output workspaces
// ---------------------------------------------------------------------------

pub fn output_dir(cfg: &RunConfig) -> PathBuf {
    cfg.workspace.join("Output")
}

/// `Output/<tag>/<tag>_<year>_CAALB83.gdb`, the projected workspace for
/// one dataset category.
pub fn layer_gdb(cfg: &RunConfig, tag: &str) -> PathBuf {
    output_dir(cfg)
        .join(tag)
        .join(format!("{}_{}_CAALB83.gdb", tag, cfg.year))
}

/// The hydrography output workspace read by the forest exporter.
pub fn hydro_output_gdb(cfg: &RunConfig) -> PathBuf {
    output_dir(cfg)
        .join(format!("Hydro{}", cfg.year))
        .join(format!("Hydro_{}_CAALB83.gdb", cfg.year))
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// `Input/Local_Data/<year>_<tag>_CAALB83.gdb` — locally maintained
/// inputs (Shasta Crayfish, MYLF study areas, Local category sources).
pub fn local_data_gdb(cfg: &RunConfig, tag: &str) -> PathBuf {
    cfg.workspace
        .join("Input")
        .join("Local_Data")
        .join(format!("{}_{}_CAALB83.gdb", cfg.year, tag))
}

/// The USFS ownership feature class every dataset intersects against.
pub fn ownership_fc(cfg: &RunConfig) -> FeatureClassRef {
    FeatureClassRef::new(
        cfg.workspace
            .join("USFS_Ownership_LSRS")
            .join(format!("{}_USFS_Ownership_CAALB83.gdb", cfg.year)),
        format!("USFS_OwnershipLSRS_{}", cfg.year),
    )
}

// ---------------------------------------------------------------------------
// WO deliverable containers
// ---------------------------------------------------------------------------

pub fn wo_dir(cfg: &RunConfig) -> PathBuf {
    cfg.workspace.join("WO")
}

pub fn fws_dir(cfg: &RunConfig) -> PathBuf {
    wo_dir(cfg).join("FWS")
}

pub fn hydro_submitted_dir(cfg: &RunConfig) -> PathBuf {
    wo_dir(cfg).join("Hydro_Submitted")
}

pub fn nodist_gdb_name(cfg: &RunConfig) -> String {
    format!(
        "{}_S_R05_FireRetardantEIS_CAALB83_NoDistribution_FWS.gdb",
        cfg.year
    )
}

pub fn dist_gdb_name(cfg: &RunConfig) -> String {
    format!(
        "{}_S_R05_FireRetardantEIS_CAALB83_DistributableDatasets.gdb",
        cfg.year
    )
}

/// Final staging GDB of non-distributable merged data.
pub fn nodist_gdb(cfg: &RunConfig) -> PathBuf {
    fws_dir(cfg).join(nodist_gdb_name(cfg))
}

/// Final staging GDB of distributable (dissolved) data.
pub fn dist_gdb(cfg: &RunConfig) -> PathBuf {
    fws_dir(cfg).join(dist_gdb_name(cfg))
}

pub fn final_hydro_gdb_name(cfg: &RunConfig) -> String {
    format!("{}_NHDfinal_CAALB83.gdb", cfg.year)
}

pub fn final_hydro_gdb(cfg: &RunConfig) -> PathBuf {
    hydro_submitted_dir(cfg).join(final_hydro_gdb_name(cfg))
}

pub fn forest_hydro_gdb(cfg: &RunConfig, forest: &ForestUnit) -> PathBuf {
    hydro_submitted_dir(cfg).join(forest.hydro_gdb_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;

    fn cfg() -> RunConfig {
        RunConfig::new("/ws", 2017, 8)
    }

    #[test]
    fn rank_container_names() {
        let cfg = cfg();
        assert_eq!(
            rank_dir(&cfg, Rank::Endangered),
            PathBuf::from("/ws/2017_Endangered")
        );
        assert!(nobuf_gdb(&cfg, Rank::Threatened).ends_with(
            "2017_Threatened/2017_FRA_Threatened_OriginalDataNoBuffers_FWSDeliverable_CAALB83.gdb"
        ));
        assert!(ident_gdb(&cfg, Rank::Sensitive)
            .ends_with("2017_Sensitive/2017_Sensitive_IdentInter_CAALB83.gdb"));
        assert!(interim_gdb(&cfg, Rank::Sensitive).ends_with(
            "2017_FRA_Sensitive_OriginalDataBufferedAndNonBufferedAreas_CAALB83.gdb"
        ));
    }

    #[test]
    fn output_and_input_layout() {
        let cfg = cfg();
        assert_eq!(
            layer_gdb(&cfg, "TESP"),
            PathBuf::from("/ws/Output/TESP/TESP_2017_CAALB83.gdb")
        );
        assert_eq!(
            local_data_gdb(&cfg, "ShastaCrayfish"),
            PathBuf::from("/ws/Input/Local_Data/2017_ShastaCrayfish_CAALB83.gdb")
        );
        let ownership = ownership_fc(&cfg);
        assert_eq!(ownership.name, "USFS_OwnershipLSRS_2017");
        assert!(ownership
            .workspace
            .ends_with("USFS_Ownership_LSRS/2017_USFS_Ownership_CAALB83.gdb"));
    }

    #[test]
    fn final_staging_layout() {
        let cfg = cfg();
        assert!(nodist_gdb(&cfg).ends_with(
            "WO/FWS/2017_S_R05_FireRetardantEIS_CAALB83_NoDistribution_FWS.gdb"
        ));
        assert!(dist_gdb(&cfg).ends_with(
            "WO/FWS/2017_S_R05_FireRetardantEIS_CAALB83_DistributableDatasets.gdb"
        ));
        assert!(final_hydro_gdb(&cfg).ends_with("WO/Hydro_Submitted/2017_NHDfinal_CAALB83.gdb"));
        assert_eq!(
            hydro_output_gdb(&cfg),
            PathBuf::from("/ws/Output/Hydro2017/Hydro_2017_CAALB83.gdb")
        );
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("2017_Sensitive");
        assert!(ensure_dir(&path).unwrap());
        assert!(!ensure_dir(&path).unwrap());
        assert!(path.is_dir());
    }

    #[test]
    fn ensure_file_gdb_is_idempotent() {
        let mut engine = MemoryEngine::new();
        let parent = Path::new("/ws/2017_Sensitive");
        assert!(ensure_file_gdb(&mut engine, parent, "a.gdb").unwrap());
        assert!(!ensure_file_gdb(&mut engine, parent, "a.gdb").unwrap());
    }
}
