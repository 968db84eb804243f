//! File-backed spatial engine.
//!
//! The store the binaries run against: a workspace is a directory (the
//! `.gdb` folders of the staging layout), a feature class is one JSON
//! file of records inside it. Geometry semantics are the same envelope
//! operations the in-memory engine uses, so a run's outputs can be
//! inspected and diffed with ordinary tools.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::record::{FeatureRecord, GeometryKind};

use super::ops::{self, OpsError};
use super::{EngineError, FeatureClassRef, SpatialEngine, SpatialReference};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassFile {
    kind: GeometryKind,
    spatial_reference_code: i32,
    spatial_reference_name: String,
    records: Vec<FeatureRecord>,
}

#[derive(Debug, Default)]
pub struct JsonStoreEngine;

impl JsonStoreEngine {
    pub fn new() -> Self {
        Self
    }

    fn class_path(fc: &FeatureClassRef) -> PathBuf {
        fc.workspace.join(format!("{}.json", fc.name))
    }

    fn load(&self, fc: &FeatureClassRef) -> Result<ClassFile, EngineError> {
        let path = Self::class_path(fc);
        if !path.is_file() {
            return Err(EngineError::FeatureClassNotFound(fc.to_string()));
        }
        let reader = BufReader::new(File::open(&path)?);
        serde_json::from_reader(reader)
            .map_err(|e| EngineError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn save(&self, fc: &FeatureClassRef, class: &ClassFile) -> Result<(), EngineError> {
        if !fc.workspace.is_dir() {
            return Err(EngineError::WorkspaceNotFound(fc.workspace.clone()));
        }
        let writer = BufWriter::new(File::create(Self::class_path(fc))?);
        serde_json::to_writer(writer, class)
            .map_err(|e| EngineError::Corrupt(format!("{}: {e}", fc)))
    }

    fn map_ops(fc: &FeatureClassRef, err: OpsError) -> EngineError {
        match err {
            OpsError::MissingField { field } => EngineError::MissingField {
                feature_class: fc.to_string(),
                field,
            },
        }
    }
}

impl SpatialEngine for JsonStoreEngine {
    fn create_file_gdb(&mut self, parent: &Path, name: &str) -> Result<(), EngineError> {
        let path = parent.join(name);
        if path.exists() {
            return Err(EngineError::WorkspaceExists(path));
        }
        std::fs::create_dir_all(&path)?;
        Ok(())
    }

    fn workspace_exists(&self, workspace: &Path) -> bool {
        workspace.is_dir()
    }

    fn feature_class_exists(&self, fc: &FeatureClassRef) -> bool {
        Self::class_path(fc).is_file()
    }

    fn list_feature_classes(&self, workspace: &Path) -> Result<Vec<String>, EngineError> {
        if !workspace.is_dir() {
            return Err(EngineError::WorkspaceNotFound(workspace.to_path_buf()));
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(workspace)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn spatial_reference(&self, fc: &FeatureClassRef) -> Result<SpatialReference, EngineError> {
        let class = self.load(fc)?;
        Ok(SpatialReference {
            code: class.spatial_reference_code,
            name: class.spatial_reference_name,
        })
    }

    fn geometry_kind(&self, fc: &FeatureClassRef) -> Result<GeometryKind, EngineError> {
        Ok(self.load(fc)?.kind)
    }

    fn project(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        code: i32,
    ) -> Result<(), EngineError> {
        let mut class = self.load(src)?;
        class.spatial_reference_code = code;
        class.spatial_reference_name = if code == crate::config::CAALB83_CODE {
            crate::config::CAALB83_NAME.to_string()
        } else {
            format!("EPSG:{code}")
        };
        self.save(dst, &class)
    }

    fn copy_features(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let class = self.load(src)?;
        self.save(dst, &class)
    }

    fn count(&self, fc: &FeatureClassRef) -> Result<usize, EngineError> {
        Ok(self.load(fc)?.records.len())
    }

    fn read_records(&self, fc: &FeatureClassRef) -> Result<Vec<FeatureRecord>, EngineError> {
        Ok(self.load(fc)?.records)
    }

    fn write_records(
        &mut self,
        fc: &FeatureClassRef,
        records: Vec<FeatureRecord>,
    ) -> Result<(), EngineError> {
        let mut class = self.load(fc)?;
        class.records = records;
        self.save(fc, &class)
    }

    fn create_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        kind: GeometryKind,
        spatial_reference: SpatialReference,
    ) -> Result<(), EngineError> {
        self.save(
            fc,
            &ClassFile {
                kind,
                spatial_reference_code: spatial_reference.code,
                spatial_reference_name: spatial_reference.name,
                records: Vec::new(),
            },
        )
    }

    fn buffer(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        distance_field: &str,
    ) -> Result<(), EngineError> {
        let mut class = self.load(src)?;
        class.records =
            ops::buffer(&class.records, distance_field).map_err(|e| Self::map_ops(src, e))?;
        class.kind = GeometryKind::Polygon;
        self.save(dst, &class)
    }

    fn multipart_to_singlepart(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let mut class = self.load(src)?;
        class.records = ops::multipart_to_singlepart(&class.records);
        self.save(dst, &class)
    }

    fn repair_geometry(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError> {
        let mut class = self.load(fc)?;
        let repaired = ops::repair(&mut class.records);
        if repaired > 0 {
            tracing::debug!(feature_class = %fc, repaired, "Repaired geometry");
        }
        self.save(fc, &class)
    }

    fn intersect(
        &mut self,
        input: &FeatureClassRef,
        overlay: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let mut a = self.load(input)?;
        let b = self.load(overlay)?;
        a.records = ops::intersect(&a.records, &b.records);
        self.save(dst, &a)
    }

    fn dissolve(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        fields: &[&str],
    ) -> Result<(), EngineError> {
        let mut class = self.load(src)?;
        class.records = ops::dissolve(&class.records, fields).map_err(|e| Self::map_ops(src, e))?;
        self.save(dst, &class)
    }

    fn merge(
        &mut self,
        inputs: &[FeatureClassRef],
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let mut iter = inputs.iter();
        let Some(first) = iter.next() else {
            return Err(EngineError::Operation {
                op: "merge",
                detail: "no input feature classes".into(),
            });
        };
        let mut out = self.load(first)?;
        let mut record_sets = vec![std::mem::take(&mut out.records)];
        for input in iter {
            record_sets.push(self.load(input)?.records);
        }
        out.records = ops::merge(&record_sets);
        self.save(dst, &out)
    }

    fn rename_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        new_name: &str,
    ) -> Result<(), EngineError> {
        let from = Self::class_path(fc);
        if !from.is_file() {
            return Err(EngineError::FeatureClassNotFound(fc.to_string()));
        }
        std::fs::rename(from, Self::class_path(&fc.sibling(new_name)))?;
        Ok(())
    }

    fn delete_feature_class(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError> {
        let path = Self::class_path(fc);
        if !path.is_file() {
            return Err(EngineError::FeatureClassNotFound(fc.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn export_to_workspace(
        &mut self,
        sources: &[FeatureClassRef],
        workspace: &Path,
    ) -> Result<(), EngineError> {
        for src in sources {
            let class = self.load(src)?;
            self.save(&FeatureClassRef::new(workspace, src.name.clone()), &class)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Geometry;

    fn seeded(dir: &Path) -> (JsonStoreEngine, FeatureClassRef) {
        let mut engine = JsonStoreEngine::new();
        engine.create_file_gdb(dir, "input.gdb").unwrap();
        let fc = FeatureClassRef::new(dir.join("input.gdb"), "occurrences");
        engine
            .create_feature_class(&fc, GeometryKind::Point, SpatialReference::caalb83())
            .unwrap();
        let mut rec = FeatureRecord::new(1, Geometry::point(3.0, 4.0));
        rec.set_text("SNAME", "Rana boylii");
        engine.write_records(&fc, vec![rec]).unwrap();
        (engine, fc)
    }

    #[test]
    fn round_trips_records_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, fc) = seeded(dir.path());
        let records = engine.read_records(&fc).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("SNAME"), Some("Rana boylii"));
        let sr = engine.spatial_reference(&fc).unwrap();
        assert_eq!(sr.name, crate::config::CAALB83_NAME);
    }

    #[test]
    fn list_is_sorted_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, fc) = seeded(dir.path());
        engine
            .create_feature_class(&fc.sibling("a_class"), GeometryKind::Point, SpatialReference::caalb83())
            .unwrap();
        std::fs::write(fc.workspace.join("notes.txt"), "ignored").unwrap();
        let names = engine.list_feature_classes(&fc.workspace).unwrap();
        assert_eq!(names, vec!["a_class", "occurrences"]);
    }

    #[test]
    fn rename_moves_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, fc) = seeded(dir.path());
        engine.rename_feature_class(&fc, "renamed").unwrap();
        assert!(!engine.feature_class_exists(&fc));
        assert!(engine.feature_class_exists(&fc.sibling("renamed")));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, fc) = seeded(dir.path());
        std::fs::write(JsonStoreEngine::class_path(&fc), "{not json").unwrap();
        assert!(matches!(engine.count(&fc), Err(EngineError::Corrupt(_))));
    }

    #[test]
    fn workspace_creation_guards_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = JsonStoreEngine::new();
        engine.create_file_gdb(dir.path(), "a.gdb").unwrap();
        assert!(matches!(
            engine.create_file_gdb(dir.path(), "a.gdb"),
            Err(EngineError::WorkspaceExists(_))
        ));
    }
}
