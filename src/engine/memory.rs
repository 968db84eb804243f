//! In-memory spatial engine.
//!
//! Holds every workspace in a map so a full pipeline run can execute in
//! a test without touching disk or a GIS install. Geometry semantics are
//! the envelope operations of [`super::ops`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::record::{FeatureRecord, GeometryKind};

use super::ops::{self, OpsError};
use super::{EngineError, FeatureClassRef, SpatialEngine, SpatialReference};

#[derive(Debug, Clone)]
pub(crate) struct StoredClass {
    pub kind: GeometryKind,
    pub spatial_reference: SpatialReference,
    pub records: Vec<FeatureRecord>,
}

#[derive(Default)]
pub struct MemoryEngine {
    workspaces: BTreeMap<PathBuf, BTreeMap<String, StoredClass>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a feature class directly, creating its workspace if needed.
    /// Test setup helper standing in for data that exists before the
    /// pipeline runs.
    pub fn seed(
        &mut self,
        fc: &FeatureClassRef,
        kind: GeometryKind,
        spatial_reference: SpatialReference,
        records: Vec<FeatureRecord>,
    ) {
        self.workspaces
            .entry(fc.workspace.clone())
            .or_default()
            .insert(
                fc.name.clone(),
                StoredClass {
                    kind,
                    spatial_reference,
                    records,
                },
            );
    }

    fn class(&self, fc: &FeatureClassRef) -> Result<&StoredClass, EngineError> {
        self.workspaces
            .get(&fc.workspace)
            .and_then(|ws| ws.get(&fc.name))
            .ok_or_else(|| EngineError::FeatureClassNotFound(fc.to_string()))
    }

    fn class_mut(&mut self, fc: &FeatureClassRef) -> Result<&mut StoredClass, EngineError> {
        self.workspaces
            .get_mut(&fc.workspace)
            .and_then(|ws| ws.get_mut(&fc.name))
            .ok_or_else(|| EngineError::FeatureClassNotFound(fc.to_string()))
    }

    /// Store a result class, implicitly creating the destination
    /// workspace. Overwrite is the engine-wide policy (last writer wins).
    fn put(&mut self, fc: &FeatureClassRef, class: StoredClass) {
        self.workspaces
            .entry(fc.workspace.clone())
            .or_default()
            .insert(fc.name.clone(), class);
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

impl SpatialEngine for MemoryEngine {
    fn create_file_gdb(&mut self, parent: &Path, name: &str) -> Result<(), EngineError> {
        let path = parent.join(name);
        if self.workspaces.contains_key(&path) {
            return Err(EngineError::WorkspaceExists(path));
        }
        self.workspaces.insert(path, BTreeMap::new());
        Ok(())
    }

    fn workspace_exists(&self, workspace: &Path) -> bool {
        self.workspaces.contains_key(workspace)
    }

    fn feature_class_exists(&self, fc: &FeatureClassRef) -> bool {
        self.class(fc).is_ok()
    }

    fn list_feature_classes(&self, workspace: &Path) -> Result<Vec<String>, EngineError> {
        let ws = self
            .workspaces
            .get(workspace)
            .ok_or_else(|| EngineError::WorkspaceNotFound(workspace.to_path_buf()))?;
        Ok(ws.keys().cloned().collect())
    }

    fn spatial_reference(&self, fc: &FeatureClassRef) -> Result<SpatialReference, EngineError> {
        Ok(self.class(fc)?.spatial_reference.clone())
    }

    fn geometry_kind(&self, fc: &FeatureClassRef) -> Result<GeometryKind, EngineError> {
        Ok(self.class(fc)?.kind)
    }

    fn project(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        code: i32,
    ) -> Result<(), EngineError> {
        let class = self.class(src)?.clone();
        let name = if code == crate::config::CAALB83_CODE {
            crate::config::CAALB83_NAME.to_string()
        } else {
            format!("EPSG:{code}")
        };
        self.put(
            dst,
            StoredClass {
                kind: class.kind,
                spatial_reference: SpatialReference { code, name },
                records: class.records,
            },
        );
        Ok(())
    }

    fn copy_features(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let class = self.class(src)?.clone();
        self.put(dst, class);
        Ok(())
    }

    fn count(&self, fc: &FeatureClassRef) -> Result<usize, EngineError> {
        Ok(self.class(fc)?.records.len())
    }

    fn read_records(&self, fc: &FeatureClassRef) -> Result<Vec<FeatureRecord>, EngineError> {
        Ok(self.class(fc)?.records.clone())
    }

    fn write_records(
        &mut self,
        fc: &FeatureClassRef,
        records: Vec<FeatureRecord>,
    ) -> Result<(), EngineError> {
        self.class_mut(fc)?.records = records;
        Ok(())
    }

    fn create_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        kind: GeometryKind,
        spatial_reference: SpatialReference,
    ) -> Result<(), EngineError> {
        self.put(
            fc,
            StoredClass {
                kind,
                spatial_reference,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    fn buffer(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        distance_field: &str,
    ) -> Result<(), EngineError> {
        let class = self.class(src)?.clone();
        let records =
            ops::buffer(&class.records, distance_field).map_err(|e| Self::map_ops(src, e))?;
        self.put(
            dst,
            StoredClass {
                kind: GeometryKind::Polygon,
                spatial_reference: class.spatial_reference,
                records,
            },
        );
        Ok(())
    }

    fn multipart_to_singlepart(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let class = self.class(src)?.clone();
        let records = ops::multipart_to_singlepart(&class.records);
        self.put(
            dst,
            StoredClass {
                kind: class.kind,
                spatial_reference: class.spatial_reference,
                records,
            },
        );
        Ok(())
    }

    fn repair_geometry(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError> {
        let class = self.class_mut(fc)?;
        let repaired = ops::repair(&mut class.records);
        if repaired > 0 {
            tracing::debug!(feature_class = %fc, repaired, "Repaired geometry");
        }
        Ok(())
    }

    fn intersect(
        &mut self,
        input: &FeatureClassRef,
        overlay: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let a = self.class(input)?.clone();
        let b = self.class(overlay)?.clone();
        let records = ops::intersect(&a.records, &b.records);
        self.put(
            dst,
            StoredClass {
                kind: a.kind,
                spatial_reference: a.spatial_reference,
                records,
            },
        );
        Ok(())
    }

    fn dissolve(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        fields: &[&str],
    ) -> Result<(), EngineError> {
        let class = self.class(src)?.clone();
        let records = ops::dissolve(&class.records, fields).map_err(|e| Self::map_ops(src, e))?;
        self.put(
            dst,
            StoredClass {
                kind: class.kind,
                spatial_reference: class.spatial_reference,
                records,
            },
        );
        Ok(())
    }

    fn merge(
        &mut self,
        inputs: &[FeatureClassRef],
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError> {
        let mut record_sets = Vec::with_capacity(inputs.len());
        let mut kind = None;
        let mut sr = None;
        for input in inputs {
            let class = self.class(input)?;
            kind.get_or_insert(class.kind);
            sr.get_or_insert_with(|| class.spatial_reference.clone());
            record_sets.push(class.records.clone());
        }
        let (Some(kind), Some(sr)) = (kind, sr) else {
            return Err(EngineError::Operation {
                op: "merge",
                detail: "no input feature classes".into(),
            });
        };
        self.put(
            dst,
            StoredClass {
                kind,
                spatial_reference: sr,
                records: ops::merge(&record_sets),
            },
        );
        Ok(())
    }

    fn rename_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        new_name: &str,
    ) -> Result<(), EngineError> {
        let ws = self
            .workspaces
            .get_mut(&fc.workspace)
            .ok_or_else(|| EngineError::WorkspaceNotFound(fc.workspace.clone()))?;
        let class = ws
            .remove(&fc.name)
            .ok_or_else(|| EngineError::FeatureClassNotFound(fc.to_string()))?;
        ws.insert(new_name.to_string(), class);
        Ok(())
    }

    fn delete_feature_class(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError> {
        let ws = self
            .workspaces
            .get_mut(&fc.workspace)
            .ok_or_else(|| EngineError::WorkspaceNotFound(fc.workspace.clone()))?;
        ws.remove(&fc.name)
            .ok_or_else(|| EngineError::FeatureClassNotFound(fc.to_string()))?;
        Ok(())
    }

    fn export_to_workspace(
        &mut self,
        sources: &[FeatureClassRef],
        workspace: &Path,
    ) -> Result<(), EngineError> {
        for src in sources {
            let class = self.class(src)?.clone();
            self.put(&FeatureClassRef::new(workspace, src.name.clone()), class);
        }
        Ok(())
    }
}
