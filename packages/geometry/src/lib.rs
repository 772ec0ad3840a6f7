#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Buffered asymmetric difference between two street networks.
//!
//! Both networks are normalized to single lines, each line is expanded by a
//! tolerance into a buffer polygon, and every line of one network is
//! reduced to the parts that fall outside the buffers of the other. Buffer
//! lookups go through an R-tree over bounding boxes; every candidate is
//! confirmed with an exact intersection test before it is used.

pub mod buffer;
pub mod difference;
pub mod geojson;
pub mod index;
pub mod normalize;

use geo::{Geometry, LineString};

pub use buffer::{BufferIndex, buffer_line};
pub use difference::{DifferenceStats, difference};
pub use index::LineSet;
pub use normalize::normalize;

/// Errors that can occur while reading or converting geometries.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// `GeoJSON` parse or conversion error.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] ::geojson::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// The two result layers of a comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Reference ways (or parts of them) with no OSM way nearby.
    pub not_in_osm: Vec<LineString<f64>>,
    /// OSM ways (or parts of them) with no reference way nearby.
    pub only_in_osm: Vec<LineString<f64>>,
}

impl Comparison {
    /// Returns `true` if the networks matched everywhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.not_in_osm.is_empty() && self.only_in_osm.is_empty()
    }
}

/// Compares two networks in both directions.
///
/// `reference` and `osm` may hold any geometries; they are normalized
/// first. The two directions are computed independently and are generally
/// not mirror images of each other.
#[must_use]
pub fn compare<R, O>(reference: R, osm: O, tolerance: f64) -> Comparison
where
    R: IntoIterator<Item = Geometry<f64>>,
    O: IntoIterator<Item = Geometry<f64>>,
{
    compare_sets(
        &LineSet::from_geometries(reference),
        &LineSet::from_geometries(osm),
        tolerance,
    )
}

/// Compares two already normalized networks in both directions.
#[must_use]
pub fn compare_sets(reference: &LineSet, osm: &LineSet, tolerance: f64) -> Comparison {
    log::debug!(
        "Comparing {} reference ways with {} OSM ways (tolerance {tolerance})",
        reference.len(),
        osm.len()
    );

    let osm_buffers = BufferIndex::build(osm.lines(), tolerance);
    let reference_buffers = BufferIndex::build(reference.lines(), tolerance);

    let not_in_osm = difference(reference, &osm_buffers);
    let only_in_osm = difference(osm, &reference_buffers);

    log::debug!(
        "Comparison done: {} not in OSM, {} only in OSM",
        not_in_osm.len(),
        only_in_osm.len()
    );

    Comparison {
        not_in_osm,
        only_in_osm,
    }
}
