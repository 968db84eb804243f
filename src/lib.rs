//! FRA TES data pipeline.
//!
//! Four sequential batch stages turn raw species-occurrence and habitat
//! datasets into the fire retardant EIS staging deliverables:
//! selection/classification, ownership intersection, final merge, and
//! the per-forest hydrography export. Geometry and feature-class
//! storage live behind the [`engine::SpatialEngine`] port; everything
//! else is table-driven classification and container plumbing.

pub mod config;
pub mod engine;
pub mod models;
pub mod rules;
pub mod stages;
pub mod workspace;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a stage binary. RUST_LOG wins when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
