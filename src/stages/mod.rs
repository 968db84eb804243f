//! The four batch stages, each a standalone entry point reading the
//! previous stage's containers.

pub mod final_merge;
pub mod intersect;
pub mod select_tes;
pub mod wo_hydro;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::RunConfig;
use crate::engine::{EngineError, FeatureClassRef, SpatialEngine};
use crate::models::lookup::LookupError;
use crate::models::record::FeatureRecord;
use crate::models::{LayerKind, Rank};
use crate::workspace;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Lookup table error: {0}")]
    Lookup(#[from] LookupError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{stage} does not process {layer} data")]
    UnsupportedLayer {
        stage: &'static str,
        layer: String,
    },

    #[error("No feature classes found in {0}")]
    EmptyWorkspace(PathBuf),
}

/// Which staging store a rank split is copied into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingTarget {
    /// FWS deliverable of buffered and non-buffered areas.
    Interim,
    /// Final per-rank `IdentInter` store the merge stage reads.
    Final,
}

/// Copy the subset of `src` matching `predicate` into `dst`. Returns the
/// copied count; an empty selection creates nothing.
pub fn copy_selection(
    engine: &mut dyn SpatialEngine,
    src: &FeatureClassRef,
    dst: &FeatureClassRef,
    predicate: impl Fn(&FeatureRecord) -> bool,
) -> Result<usize, EngineError> {
    let records: Vec<_> = engine
        .read_records(src)?
        .into_iter()
        .filter(|rec| predicate(rec))
        .collect();
    let count = records.len();
    if count == 0 {
        return Ok(0);
    }
    let kind = engine.geometry_kind(src)?;
    let spatial_reference = engine.spatial_reference(src)?;
    engine.create_feature_class(dst, kind, spatial_reference)?;
    engine.write_records(dst, records)?;
    Ok(count)
}

/// Split `src` by rank into the interim or final staging GDB, skipping
/// ranks with no records. `source_name` is the unprocessed input's
/// feature-class name, which Local and NOAA outputs keep.
pub fn copy_rank_splits(
    cfg: &RunConfig,
    engine: &mut dyn SpatialEngine,
    src: &FeatureClassRef,
    kind: LayerKind,
    source_name: &str,
    target: StagingTarget,
) -> Result<(), StageError> {
    for rank in Rank::ALL {
        let gdb = match target {
            StagingTarget::Interim => workspace::interim_gdb(cfg, rank),
            StagingTarget::Final => workspace::ident_gdb(cfg, rank),
        };
        let name = kind.ident_name(cfg.year, rank, source_name);
        let dst = FeatureClassRef::new(gdb, name);

        let count = copy_selection(engine, src, &dst, |rec| rec.rank() == Some(rank.as_str()))?;
        if count > 0 {
            tracing::info!(
                rank = rank.as_str(),
                records = count,
                target = ?target,
                feature_class = %dst,
                "Copied rank selection to staging GDB"
            );
        } else {
            tracing::info!(rank = rank.as_str(), "No records found for rank");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, SpatialReference};
    use crate::models::record::{fields, Geometry, GeometryKind};

    fn ranked(oid: i64, rank: &str) -> FeatureRecord {
        let mut rec = FeatureRecord::new(oid, Geometry::point(0.0, 0.0));
        rec.set_text(fields::GRANK_FIRE, rank);
        rec
    }

    #[test]
    fn copy_selection_skips_empty_subsets() {
        let mut engine = MemoryEngine::new();
        let src = FeatureClassRef::new("/ws/a.gdb", "input");
        engine.seed(
            &src,
            GeometryKind::Point,
            SpatialReference::caalb83(),
            vec![ranked(1, "Sensitive")],
        );
        let dst = src.sibling("none");
        let count = copy_selection(&mut engine, &src, &dst, |r| r.rank() == Some("Endangered"))
            .unwrap();
        assert_eq!(count, 0);
        assert!(!engine.feature_class_exists(&dst));
    }

    /// Full pipeline over the in-memory engine: select → intersect →
    /// merge, checking the distributable store at the end.
    #[test]
    fn full_pipeline_from_raw_records_to_distributable_store() {
        use std::io::Write;

        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(tmp.path(), 2017, 8);
        let lookup = tmp.path().join("AllMerge_SummaryTable.csv");
        let mut f = std::fs::File::create(&lookup).unwrap();
        writeln!(f, "Rana boylii,Sensitive,10,,Foothill yellow-legged frog,ANIMAL,").unwrap();
        drop(f);

        let mut engine = MemoryEngine::new();

        // Raw occurrences: three listed, two not.
        let input = FeatureClassRef::new(tmp.path().join("raw"), "WildlifeObs");
        let mut records = Vec::new();
        for (oid, name) in [
            (1, "Rana boylii"),
            (2, "Rana boylii"),
            (3, "Rana boylii"),
            (4, "Canis latrans"),
            (5, "Lynx rufus"),
        ] {
            let mut rec = FeatureRecord::new(oid, Geometry::point(oid as f64 * 5.0, 5.0));
            rec.set_text("SCIENTIFIC_NAME", name);
            rec.set_text("COMMON_NAME", "Common");
            rec.set_text("FS_UNIT_NAME", "Angeles National Forest");
            rec.set_int("TOTAL_DETECTED", 2);
            records.push(rec);
        }
        engine.seed(
            &input,
            GeometryKind::Point,
            SpatialReference {
                code: 4269,
                name: "GCS_North_American_1983".into(),
            },
            records,
        );

        // Ownership polygon covering everything, Angeles (0501).
        let ownership = workspace::ownership_fc(&cfg);
        let mut anf = FeatureRecord::new(
            1,
            Geometry::new(
                GeometryKind::Polygon,
                vec![crate::models::record::Envelope::new(-100.0, -100.0, 100.0, 100.0)],
            ),
        );
        anf.set_text(fields::UNIT_ID_FS, "0501");
        anf.set_text(fields::FORESTNAME, "Angeles National Forest");
        engine.seed(
            &ownership,
            GeometryKind::Polygon,
            SpatialReference::caalb83(),
            vec![anf],
        );

        let selected = select_tes::run(
            &cfg,
            &mut engine,
            &input,
            &lookup,
            LayerKind::WildlifeObservations,
        )
        .unwrap();
        assert_eq!(selected.selected, 3);
        assert_eq!(selected.tally.sensitive, 3);

        // Stage 2 runs over the per-rank split the selector produced.
        let split = FeatureClassRef::new(
            workspace::layer_gdb(&cfg, "Wildlife_Observations"),
            "EDW_FishWildlife_Observation_2017_S",
        );
        intersect::run(
            &cfg,
            &mut engine,
            Some(&split),
            LayerKind::WildlifeObservations,
            &lookup,
        )
        .unwrap();

        let merged = final_merge::run(&cfg, &mut engine).unwrap();
        assert_eq!(merged.merged, vec![(Rank::Sensitive, 1)]);

        // Distributable output: one dissolved record for (0501, Sensitive)
        // carrying nothing but those two fields.
        let dist_fc = FeatureClassRef::new(
            workspace::dist_gdb(&cfg),
            "FireRetardantEIS_Sensitive",
        );
        let finals = engine.read_records(&dist_fc).unwrap();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].unit_id(), Some("0501"));
        assert_eq!(finals[0].rank(), Some("Sensitive"));
        assert!(finals[0].text(fields::SNAME_FIRE).is_none());
    }

    #[test]
    fn rank_splits_land_in_per_rank_stores() {
        let cfg = RunConfig::new("/ws", 2017, 8);
        let mut engine = MemoryEngine::new();
        let src = FeatureClassRef::new("/ws/scratch.gdb", "TESP_2017_intersect");
        engine.seed(
            &src,
            GeometryKind::Polygon,
            SpatialReference::caalb83(),
            vec![ranked(1, "Sensitive"), ranked(2, "Sensitive"), ranked(3, "Endangered")],
        );

        copy_rank_splits(
            &cfg,
            &mut engine,
            &src,
            LayerKind::Tesp,
            &src.name,
            StagingTarget::Final,
        )
        .unwrap();

        let sensitive = FeatureClassRef::new(
            workspace::ident_gdb(&cfg, Rank::Sensitive),
            "EDW_TESP_2017_OccurrenceAll_FoundPlants_ident_Sensitive",
        );
        assert_eq!(engine.count(&sensitive).unwrap(), 2);

        let threatened = FeatureClassRef::new(
            workspace::ident_gdb(&cfg, Rank::Threatened),
            "EDW_TESP_2017_OccurrenceAll_FoundPlants_ident_Threatened",
        );
        assert!(!engine.feature_class_exists(&threatened));
    }
}
