#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! OpenStreetMap street network acquisition.
//!
//! Ways come either from the Overpass API (an area query for an
//! administrative zone, or a custom query) or from a local `.osm.pbf`
//! extract. Both paths apply the same [`HighwayFilter`] and produce
//! [`OsmWay`]s with resolved geometries.

pub mod filter;
pub mod overpass;
pub mod pbf;
pub mod retry;

use geo::LineString;

pub use filter::HighwayFilter;

/// Errors that can occur while acquiring OSM data.
#[derive(Debug, thiserror::Error)]
pub enum OsmError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Overpass server rejected the request or reported a failure.
    #[error("Overpass error: {message}")]
    Overpass {
        /// Description of what went wrong.
        message: String,
    },

    /// PBF extract not found.
    #[error("OSM PBF file not found: {0}")]
    FileNotFound(String),

    /// PBF parsing error.
    #[error("OSM PBF parse error in {path}: {message}")]
    Parse {
        /// Path to the PBF file.
        path: String,
        /// Error description.
        message: String,
    },
}

/// A street of the OSM network with its resolved geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmWay {
    /// OSM way id.
    pub id: i64,
    /// Value of the `highway` tag.
    pub highway: String,
    /// Node coordinates, longitude first.
    pub geometry: LineString<f64>,
}
