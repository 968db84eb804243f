use std::path::{Path, PathBuf};

use chrono::Datelike;

/// Application-level constants
pub const APP_NAME: &str = "fra-pipeline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// EPSG code for NAD 1983 California Teale Albers, the working projection
/// for every deliverable.
pub const CAALB83_CODE: i32 = 3310;

/// Spatial reference name the engine reports for already-projected data.
pub const CAALB83_NAME: &str = "NAD_1983_California_Teale_Albers";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "fra_pipeline=info"
}

/// Per-run configuration, passed explicitly into every stage entry point.
///
/// The original tooling kept the year, projection and workspace root in
/// process-global state; here a single value travels through the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root workspace folder holding all input and staging containers.
    pub workspace: PathBuf,
    /// Deliverable year, used in every container and feature-class name.
    pub year: i32,
    /// Month of the source-data pull, for `SOURCEFIRE` descriptions.
    pub month: u32,
    /// Target projection for all staged data.
    pub spatial_reference: i32,
}

impl RunConfig {
    /// Config for the current local year and month.
    pub fn for_today(workspace: impl Into<PathBuf>) -> Self {
        let today = chrono::Local::now();
        Self::new(workspace, today.year(), today.month())
    }

    pub fn new(workspace: impl Into<PathBuf>, year: i32, month: u32) -> Self {
        Self {
            workspace: workspace.into(),
            year,
            month,
            spatial_reference: CAALB83_CODE,
        }
    }

    /// Override the run year (`--year` on every binary).
    pub fn with_year(mut self, year: Option<i32>) -> Self {
        if let Some(year) = year {
            self.year = year;
        }
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// `month/year` tag appended to every `SOURCEFIRE` description.
    pub fn pull_date(&self) -> String {
        format!("{}/{}", self.month, self.year)
    }
}
