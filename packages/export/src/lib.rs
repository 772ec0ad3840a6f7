#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Export of comparison results.
//!
//! Result layers are written as `GeoJSON`, converted to shapefiles with
//! `ogr2ogr`, and turned into web map data with `topojson` (vector output)
//! or `tippecanoe` (`PMTiles` output). The web map reads per-task
//! statistics from a generated `tasks_info.js`.

pub mod geojson_file;
pub mod map_data;
pub mod ogr;
pub mod tool;
pub mod web;

/// Errors that can occur while exporting results.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An external tool could not be started.
    #[error("Failed to run {tool}: {source}")]
    ToolMissing {
        /// Program name.
        tool: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed ({status})")]
    ToolFailed {
        /// Program name.
        tool: String,
        /// Exit status description.
        status: String,
    },
}
