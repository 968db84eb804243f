//! The spatial engine port.
//!
//! Every geometry operation and every feature-class store access goes
//! through [`SpatialEngine`]. The pipeline never looks inside geometry;
//! stages hand the engine feature-class references and small parameter
//! sets and get new feature classes back, so the whole run can execute
//! against the in-memory engine in tests.

pub mod jsonstore;
pub mod memory;
mod ops;

pub use jsonstore::JsonStoreEngine;
pub use memory::MemoryEngine;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::record::{FeatureRecord, GeometryKind};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(PathBuf),

    #[error("Workspace already exists: {0}")]
    WorkspaceExists(PathBuf),

    #[error("Feature class not found: {0}")]
    FeatureClassNotFound(String),

    #[error("Field {field} missing on {feature_class}")]
    MissingField {
        feature_class: String,
        field: String,
    },

    #[error("{op} failed: {detail}")]
    Operation { op: &'static str, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store corrupted: {0}")]
    Corrupt(String),
}

/// A feature class addressed by its workspace (file geodatabase or plain
/// folder for shapefile-like inputs) and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeatureClassRef {
    pub workspace: PathBuf,
    pub name: String,
}

impl FeatureClassRef {
    pub fn new(workspace: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            name: name.into(),
        }
    }

    /// Another feature class in the same workspace.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.workspace.clone(), name)
    }

    /// The same feature class name with a suffix appended, the scratch
    /// naming convention used throughout the stages.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        self.sibling(format!("{}{}", self.name, suffix))
    }

    /// Split a full feature-class path (`.../some.gdb/fc` or
    /// `.../folder/layer.shp`) into a reference.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let workspace = path.parent()?.to_path_buf();
        Some(Self::new(workspace, name))
    }
}

impl fmt::Display for FeatureClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace.display(), self.name)
    }
}

/// What the engine's describe operation reports for a feature class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialReference {
    pub code: i32,
    pub name: String,
}

impl SpatialReference {
    pub fn caalb83() -> Self {
        Self {
            code: crate::config::CAALB83_CODE,
            name: crate::config::CAALB83_NAME.to_string(),
        }
    }
}

/// The external GIS contract. Object-safe so stages can hold
/// `&mut dyn SpatialEngine`.
pub trait SpatialEngine {
    /// Create a file geodatabase under `parent`. Fails if it exists;
    /// stages guard with [`SpatialEngine::workspace_exists`].
    fn create_file_gdb(&mut self, parent: &Path, name: &str) -> Result<(), EngineError>;

    fn workspace_exists(&self, workspace: &Path) -> bool;

    fn feature_class_exists(&self, fc: &FeatureClassRef) -> bool;

    fn list_feature_classes(&self, workspace: &Path) -> Result<Vec<String>, EngineError>;

    fn spatial_reference(&self, fc: &FeatureClassRef) -> Result<SpatialReference, EngineError>;

    fn geometry_kind(&self, fc: &FeatureClassRef) -> Result<GeometryKind, EngineError>;

    /// Reproject `src` into `dst` with the given EPSG code.
    fn project(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        code: i32,
    ) -> Result<(), EngineError>;

    fn copy_features(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError>;

    fn count(&self, fc: &FeatureClassRef) -> Result<usize, EngineError>;

    fn read_records(&self, fc: &FeatureClassRef) -> Result<Vec<FeatureRecord>, EngineError>;

    /// Replace the records of `fc` (the update-cursor write-back).
    fn write_records(
        &mut self,
        fc: &FeatureClassRef,
        records: Vec<FeatureRecord>,
    ) -> Result<(), EngineError>;

    fn create_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        kind: GeometryKind,
        spatial_reference: SpatialReference,
    ) -> Result<(), EngineError>;

    /// Buffer every record by the per-record distance (meters) held in
    /// `distance_field`.
    fn buffer(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        distance_field: &str,
    ) -> Result<(), EngineError>;

    fn multipart_to_singlepart(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError>;

    fn repair_geometry(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError>;

    /// Intersect `input` with `overlay`; output records carry both
    /// attribute sets (overlay fields join the input's).
    fn intersect(
        &mut self,
        input: &FeatureClassRef,
        overlay: &FeatureClassRef,
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError>;

    /// Dissolve on the listed fields; all other attributes drop.
    fn dissolve(
        &mut self,
        src: &FeatureClassRef,
        dst: &FeatureClassRef,
        fields: &[&str],
    ) -> Result<(), EngineError>;

    fn merge(
        &mut self,
        inputs: &[FeatureClassRef],
        dst: &FeatureClassRef,
    ) -> Result<(), EngineError>;

    fn rename_feature_class(
        &mut self,
        fc: &FeatureClassRef,
        new_name: &str,
    ) -> Result<(), EngineError>;

    fn delete_feature_class(&mut self, fc: &FeatureClassRef) -> Result<(), EngineError>;

    /// Copy feature classes into another workspace keeping their names.
    fn export_to_workspace(
        &mut self,
        sources: &[FeatureClassRef],
        workspace: &Path,
    ) -> Result<(), EngineError>;
}
