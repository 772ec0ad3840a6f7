#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Storage for compare_osm projects.
//!
//! Every task keeps its input and result layers in its own `DuckDB` file
//! under `data/out/`, with geometries as `GeoJSON` TEXT. The [`spatial`]
//! module runs the same buffered difference as `compare_osm_geometry` as
//! `DuckDB` spatial SQL.

pub mod paths;
pub mod spatial;
pub mod task_db;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored geometry could not be decoded.
    #[error("Geometry error: {0}")]
    Geometry(#[from] compare_osm_geometry::GeometryError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
