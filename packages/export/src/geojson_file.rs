//! `GeoJSON` files of result layers.

use std::path::Path;

use compare_osm_geometry::geojson::feature_collection;
use compare_osm_task_models::Status;
use geo::LineString;
use geojson::JsonObject;

use crate::ExportError;

/// Writes a result layer as a `GeoJSON` `FeatureCollection`.
///
/// Every feature carries the layer name in its `status` property. Parent
/// directories are created as needed. Returns the number of features.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the file cannot be written.
pub fn write_layer(
    path: &Path,
    status: Status,
    lines: &[LineString<f64>],
) -> Result<usize, ExportError> {
    let mut properties = JsonObject::new();
    properties.insert(
        "status".to_string(),
        serde_json::Value::String(status.to_string()),
    );

    write_lines(path, lines, &properties)?;
    log::info!("Wrote {} {status} ways to {}", lines.len(), path.display());
    Ok(lines.len())
}

/// Writes lines with shared properties as a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the file cannot be written.
pub fn write_lines(
    path: &Path,
    lines: &[LineString<f64>],
    properties: &JsonObject,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let collection = feature_collection(lines, properties);
    std::fs::write(path, collection.to_string())?;
    Ok(())
}
