//! Input acquisition for a task.
//!
//! OSM ways are downloaded from Overpass (and cached for offline runs) or
//! read from a PBF extract. Reference data and boundaries are read as
//! `GeoJSON`; other formats are converted with `ogr2ogr` first.

use std::path::{Path, PathBuf};

use compare_osm_database::paths::{ProjectPaths, ensure_dir};
use compare_osm_export::ogr;
use compare_osm_geometry::geojson::{boundary_from_geometries, read_geometries};
use compare_osm_osm::{HighwayFilter, OsmWay, overpass, pbf};
use compare_osm_task_models::{OsmSource, TaskConfig};
use geo::{Geometry, MultiPolygon};

use crate::TaskError;

/// How OSM data may be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Download, refreshing the cache.
    Online,
    /// Only use previously cached responses.
    Offline,
}

/// The Overpass query of a task, `None` for local extracts.
#[must_use]
pub fn overpass_query(source: &OsmSource, filter: &HighwayFilter) -> Option<String> {
    match source {
        OsmSource::Zone {
            name, admin_level, ..
        } => Some(overpass::zone_query(name, *admin_level, filter)),
        OsmSource::Overpass { query, .. } => Some(overpass::custom_query(query)),
        OsmSource::Pbf { .. } => None,
    }
}

/// Acquires the OSM ways of a task.
///
/// # Errors
///
/// * If the download fails, or the cache is missing in offline mode
/// * If the response or extract cannot be parsed
#[allow(clippy::future_not_send)]
pub async fn osm_ways(
    task: &TaskConfig,
    paths: &ProjectPaths,
    client: &reqwest::Client,
    mode: FetchMode,
) -> Result<Vec<OsmWay>, TaskError> {
    let filter = HighwayFilter::new(task.excluded_highways.iter().cloned());

    if let OsmSource::Pbf { path } = &task.osm {
        return Ok(pbf::read_ways(&paths.resolve(path), &filter)?);
    }

    let cache = paths.osm_cache(&task.name);
    let body = match (mode, overpass_query(&task.osm, &filter), task.osm.endpoint()) {
        (FetchMode::Online, Some(query), Some(endpoint)) => {
            let body = overpass::fetch(client, endpoint, &query).await?;
            ensure_dir(&paths.osm_dir())?;
            std::fs::write(&cache, &body)?;
            body
        }
        _ => read_cache(&cache)?,
    };

    Ok(overpass::parse_ways(&body, &filter)?)
}

fn read_cache(cache: &Path) -> Result<String, TaskError> {
    if !cache.exists() {
        return Err(TaskError::MissingOsmCache {
            path: cache.display().to_string(),
        });
    }
    log::info!("Using cached OSM data {}", cache.display());
    Ok(std::fs::read_to_string(cache)?)
}

/// Returns a `GeoJSON` version of `source`, converting it into the task's
/// input directory when needed.
///
/// # Errors
///
/// Returns [`TaskError`] if the file is missing or conversion fails.
pub fn as_geojson(
    source: &Path,
    paths: &ProjectPaths,
    task: &str,
    name: &str,
) -> Result<PathBuf, TaskError> {
    if !source.exists() {
        return Err(TaskError::MissingInput {
            path: source.display().to_string(),
        });
    }
    if ogr::is_geojson(source) {
        return Ok(source.to_path_buf());
    }

    let target = paths.task_input_dir(task).join(format!("{name}.geojson"));
    ogr::convert_to_geojson(source, &target)?;
    Ok(target)
}

/// Reads the reference geometries of a task.
///
/// # Errors
///
/// Returns [`TaskError`] if the data cannot be converted or parsed.
pub fn reference_geometries(
    task: &TaskConfig,
    paths: &ProjectPaths,
) -> Result<Vec<Geometry<f64>>, TaskError> {
    let file = as_geojson(&paths.resolve(&task.data.ways), paths, &task.name, "reference")?;
    let geometries = read_geometries(&std::fs::read_to_string(&file)?)?;
    log::info!(
        "Read {} reference geometries from {}",
        geometries.len(),
        file.display()
    );
    Ok(geometries)
}

/// Reads the boundary of a task, if it has one.
///
/// # Errors
///
/// Returns [`TaskError`] if the data cannot be converted or parsed.
pub fn boundary(
    task: &TaskConfig,
    paths: &ProjectPaths,
) -> Result<Option<MultiPolygon<f64>>, TaskError> {
    let Some(source) = &task.data.boundaries else {
        return Ok(None);
    };
    let file = as_geojson(&paths.resolve(source), paths, &task.name, "boundaries")?;
    let boundary = boundary_from_geometries(read_geometries(&std::fs::read_to_string(&file)?)?);
    if boundary.0.is_empty() {
        log::warn!("Boundary {} contains no polygon, skipping clip", file.display());
        return Ok(None);
    }
    Ok(Some(boundary))
}
