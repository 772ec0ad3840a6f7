//! Web map data generation.
//!
//! Vector output is a single `TopoJSON` file with one object per result
//! layer, drawn by the browser. Tile output is a `PMTiles` archive with
//! one named layer per result layer.

use std::path::{Path, PathBuf};

use compare_osm_task_models::{OutputConfig, OutputKind, Status};

use crate::ExportError;
use crate::tool::ToolCommand;

/// Quantization passed to `topojson`.
pub const TOPOJSON_QUANTIZATION: &str = "10000000";

/// `TopoJSON` file name inside a task's map data directory.
pub const VECTOR_FILE: &str = "vector.topojson";

/// `PMTiles` file name inside a task's map data directory.
pub const TILES_FILE: &str = "tiles.pmtiles";

/// Map data file for an output kind, relative to the task's map directory.
#[must_use]
pub const fn file_name(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Vector => VECTOR_FILE,
        OutputKind::Tiles => TILES_FILE,
    }
}

/// `topojson` command merging the result layers into one file.
#[must_use]
pub fn topojson_command(layers: &[(Status, PathBuf)], output: &Path) -> ToolCommand {
    let mut cmd = ToolCommand::new("topojson")
        .args(["-q", TOPOJSON_QUANTIZATION, "-p", "-o"])
        .arg(output)
        .arg("--");
    for (status, path) in layers {
        cmd = cmd.arg(format!("{status}={}", path.display()));
    }
    cmd
}

/// `tippecanoe` command building a `PMTiles` archive of the result layers.
#[must_use]
pub fn tippecanoe_command(
    layers: &[(Status, PathBuf)],
    output: &Path,
    config: &OutputConfig,
) -> ToolCommand {
    let mut cmd = ToolCommand::new("tippecanoe")
        .arg("-o")
        .arg(output)
        .args([
            "--force".to_string(),
            "--no-feature-limit".to_string(),
            "--no-tile-size-limit".to_string(),
            format!("--minimum-zoom={}", config.min_zoom),
            format!("--maximum-zoom={}", config.max_zoom),
        ]);
    for (status, path) in layers {
        cmd = cmd.arg(format!("--named-layer={status}:{}", path.display()));
    }
    cmd
}

/// Generates the map data of a task into `dir`.
///
/// `dir` is expected to be empty; returns the path of the written file.
///
/// # Errors
///
/// Returns [`ExportError`] if the tool fails.
pub fn write_map_data(
    dir: &Path,
    layers: &[(Status, PathBuf)],
    config: &OutputConfig,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let output = dir.join(file_name(config.kind));

    let cmd = match config.kind {
        OutputKind::Vector => topojson_command(layers, &output),
        OutputKind::Tiles => tippecanoe_command(layers, &output, config),
    };
    cmd.run()?;

    log::info!("{} map data generated: {}", config.kind, output.display());
    Ok(output)
}
