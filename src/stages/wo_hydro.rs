//! Stage 4: the WO hydrography deliverable.
//!
//! Exports the merged NHD layers into the final hydro GDB under their
//! staging names, then splits each by `UnitID` into one geodatabase per
//! forest, skipping forests with no records.

use crate::config::RunConfig;
use crate::engine::{FeatureClassRef, SpatialEngine};
use crate::models::forest::FOREST_UNITS;
use crate::workspace;

use super::{copy_selection, StageError};

/// Source names produced by the hydrography preprocessing, with the
/// staging names they ship under.
const HYDRO_LAYERS: [(&str, &str); 2] = [
    ("NHDFlowline_Merge_geocomplete", "NHD_Flowline"),
    ("NHDWaterbody_Area_Merge_geocomplete", "NHD_Waterbody"),
];

#[derive(Debug)]
pub struct HydroOutcome {
    /// (forest alias, staged layer, record count) for each non-empty copy.
    pub copied: Vec<(String, String, usize)>,
}

pub fn run(cfg: &RunConfig, engine: &mut dyn SpatialEngine) -> Result<HydroOutcome, StageError> {
    provision_containers(cfg, engine)?;

    let source_gdb = workspace::hydro_output_gdb(cfg);
    let final_gdb = workspace::final_hydro_gdb(cfg);

    tracing::info!("Exporting hydrography to the final geodatabase");
    let sources: Vec<_> = HYDRO_LAYERS
        .iter()
        .map(|(source, _)| FeatureClassRef::new(&source_gdb, *source))
        .collect();
    engine.export_to_workspace(&sources, &final_gdb)?;

    tracing::info!("Renaming files to final staging names");
    for (source, staged) in HYDRO_LAYERS {
        engine.rename_feature_class(&FeatureClassRef::new(&final_gdb, source), staged)?;
    }

    let mut copied = Vec::new();
    for forest in &FOREST_UNITS {
        let forest_gdb = workspace::forest_hydro_gdb(cfg, forest);
        for (_, staged) in HYDRO_LAYERS {
            let src = FeatureClassRef::new(&final_gdb, staged);
            let dst = FeatureClassRef::new(&forest_gdb, staged);
            let count = copy_selection(engine, &src, &dst, |rec| {
                rec.unit_id() == Some(forest.unit_id)
            })?;
            if count > 0 {
                tracing::info!(
                    forest = forest.alias,
                    layer = staged,
                    records = count,
                    "Copied selected records to forest geodatabase"
                );
                copied.push((forest.alias.to_string(), staged.to_string(), count));
            } else {
                tracing::info!(forest = forest.alias, layer = staged, "No records for forest");
            }
        }
    }

    Ok(HydroOutcome { copied })
}

fn provision_containers(cfg: &RunConfig, engine: &mut dyn SpatialEngine) -> Result<(), StageError> {
    workspace::ensure_dir(&workspace::wo_dir(cfg))?;
    workspace::ensure_dir(&workspace::hydro_submitted_dir(cfg))?;

    let hydro_dir = workspace::hydro_submitted_dir(cfg);
    for forest in &FOREST_UNITS {
        workspace::ensure_file_gdb(engine, &hydro_dir, &forest.hydro_gdb_name())?;
    }
    workspace::ensure_file_gdb(engine, &hydro_dir, &workspace::final_hydro_gdb_name(cfg))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, SpatialReference};
    use crate::models::record::{fields, Envelope, FeatureRecord, Geometry, GeometryKind};

    fn hydro_record(oid: i64, unit: &str) -> FeatureRecord {
        let mut rec = FeatureRecord::new(
            oid,
            Geometry::new(
                GeometryKind::Polyline,
                vec![Envelope::new(0.0, 0.0, 1.0, 1.0)],
            ),
        );
        rec.set_text(fields::UNIT_ID, unit);
        rec.set_text(fields::GRANK_FIRE, "Endangered");
        rec
    }

    fn seed_hydro(engine: &mut MemoryEngine, cfg: &RunConfig) {
        let gdb = workspace::hydro_output_gdb(cfg);
        engine.seed(
            &FeatureClassRef::new(&gdb, "NHDFlowline_Merge_geocomplete"),
            GeometryKind::Polyline,
            SpatialReference::caalb83(),
            vec![hydro_record(1, "0501"), hydro_record(2, "0501"), hydro_record(3, "0516")],
        );
        engine.seed(
            &FeatureClassRef::new(&gdb, "NHDWaterbody_Area_Merge_geocomplete"),
            GeometryKind::Polygon,
            SpatialReference::caalb83(),
            vec![hydro_record(1, "0516")],
        );
    }

    #[test]
    fn splits_hydro_layers_per_forest() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(tmp.path(), 2017, 8);
        let mut engine = MemoryEngine::new();
        seed_hydro(&mut engine, &cfg);

        let outcome = run(&cfg, &mut engine).unwrap();

        // ANF gets 2 flowlines; STF gets 1 flowline + 1 waterbody; no
        // other forest receives anything.
        assert_eq!(outcome.copied.len(), 3);

        let anf = FOREST_UNITS.iter().find(|f| f.alias == "ANF").unwrap();
        let anf_flow = FeatureClassRef::new(workspace::forest_hydro_gdb(&cfg, anf), "NHD_Flowline");
        assert_eq!(engine.count(&anf_flow).unwrap(), 2);
        let anf_water =
            FeatureClassRef::new(workspace::forest_hydro_gdb(&cfg, anf), "NHD_Waterbody");
        assert!(!engine.feature_class_exists(&anf_water));

        let stf = FOREST_UNITS.iter().find(|f| f.alias == "STF").unwrap();
        let stf_water =
            FeatureClassRef::new(workspace::forest_hydro_gdb(&cfg, stf), "NHD_Waterbody");
        assert_eq!(engine.count(&stf_water).unwrap(), 1);
    }

    #[test]
    fn final_gdb_carries_staging_names() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(tmp.path(), 2017, 8);
        let mut engine = MemoryEngine::new();
        seed_hydro(&mut engine, &cfg);

        run(&cfg, &mut engine).unwrap();

        let final_gdb = workspace::final_hydro_gdb(&cfg);
        assert!(engine.feature_class_exists(&FeatureClassRef::new(&final_gdb, "NHD_Flowline")));
        assert!(engine.feature_class_exists(&FeatureClassRef::new(&final_gdb, "NHD_Waterbody")));
        assert!(!engine.feature_class_exists(&FeatureClassRef::new(
            &final_gdb,
            "NHDFlowline_Merge_geocomplete"
        )));
    }

    #[test]
    fn provisions_all_eighteen_forest_gdbs() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(tmp.path(), 2017, 8);
        let mut engine = MemoryEngine::new();
        seed_hydro(&mut engine, &cfg);

        run(&cfg, &mut engine).unwrap();

        for forest in &FOREST_UNITS {
            assert!(engine.workspace_exists(&workspace::forest_hydro_gdb(&cfg, forest)));
        }
    }

    #[test]
    fn missing_source_layer_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = RunConfig::new(tmp.path(), 2017, 8);
        let mut engine = MemoryEngine::new();
        assert!(run(&cfg, &mut engine).is_err());
    }
}
