//! `ogr2ogr` conversions between shapefiles and `GeoJSON`.

use std::path::Path;

use crate::ExportError;
use crate::tool::ToolCommand;

/// Returns `true` if `path` is already `GeoJSON` and can be read directly.
#[must_use]
pub fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
}

/// `ogr2ogr` command converting any OGR dataset to `GeoJSON` in EPSG:4326.
#[must_use]
pub fn to_geojson_command(source: &Path, target: &Path) -> ToolCommand {
    ToolCommand::new("ogr2ogr")
        .args(["-f", "GeoJSON", "-t_srs", "EPSG:4326"])
        .arg(target)
        .arg(source)
}

/// `ogr2ogr` command converting a `GeoJSON` layer to a line shapefile.
#[must_use]
pub fn to_shapefile_command(source: &Path, target: &Path, layer: &str) -> ToolCommand {
    ToolCommand::new("ogr2ogr")
        .args(["-f", "ESRI Shapefile", "-overwrite", "-lco", "SHPT=ARC", "-nln", layer])
        .arg(target)
        .arg(source)
}

/// Converts a dataset (typically a shapefile) to `GeoJSON`.
///
/// The `GeoJSON` driver cannot overwrite, so an existing target is removed
/// first.
///
/// # Errors
///
/// Returns [`ExportError`] if the old target cannot be removed or
/// `ogr2ogr` fails.
pub fn convert_to_geojson(source: &Path, target: &Path) -> Result<(), ExportError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if target.exists() {
        std::fs::remove_file(target)?;
    }

    log::info!(
        "Converting {} to {}",
        source.display(),
        target.display()
    );
    to_geojson_command(source, target).run()
}

/// Exports a `GeoJSON` layer as an ESRI shapefile.
///
/// # Errors
///
/// Returns [`ExportError`] if `ogr2ogr` fails.
pub fn export_shapefile(source: &Path, target: &Path, layer: &str) -> Result<(), ExportError> {
    log::info!("Exporting {layer} to {}", target.display());
    to_shapefile_command(source, target, layer).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_geojson_extensions() {
        assert!(is_geojson(Path::new("data/ways.geojson")));
        assert!(is_geojson(Path::new("data/ways.GeoJSON")));
        assert!(is_geojson(Path::new("ways.json")));
        assert!(!is_geojson(Path::new("ways.shp")));
        assert!(!is_geojson(Path::new("ways")));
    }

    #[test]
    fn geojson_conversion_reprojects() {
        let cmd = to_geojson_command(Path::new("in/grafo.shp"), Path::new("out/grafo.geojson"));
        assert_eq!(cmd.program(), "ogr2ogr");
        assert_eq!(
            cmd.args_lossy(),
            [
                "-f",
                "GeoJSON",
                "-t_srs",
                "EPSG:4326",
                "out/grafo.geojson",
                "in/grafo.shp"
            ]
        );
    }

    #[test]
    fn shapefile_export_writes_lines() {
        let cmd = to_shapefile_command(
            Path::new("out/notinosm.geojson"),
            Path::new("out/notinosm.shp"),
            "notinosm",
        );
        let args = cmd.args_lossy();
        assert_eq!(&args[..2], ["-f", "ESRI Shapefile"]);
        assert!(args.windows(2).any(|w| w == ["-lco", "SHPT=ARC"]));
        assert!(args.windows(2).any(|w| w == ["-nln", "notinosm"]));
        assert_eq!(&args[args.len() - 2..], ["out/notinosm.shp", "out/notinosm.geojson"]);
    }
}
