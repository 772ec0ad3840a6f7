//! Data files read by the web map.

use std::collections::BTreeMap;
use std::path::Path;

use compare_osm_task_models::{
    Bbox, Center, OutputKind, ProjectConfig, ProjectOutput, Status,
};
use serde::Serialize;

use crate::ExportError;
use crate::map_data;

/// Header line of the generated script.
const GENERATED_HEADER: &str = "// Automatically generated file";

/// Initial view of the web map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// Page title.
    pub title: String,
    /// Initial centre.
    pub center: Center,
    /// Initial zoom.
    pub zoom: u8,
}

/// One result layer as shown in the map legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    /// Layer name.
    pub name: Status,
    /// Legend text.
    pub description: &'static str,
    /// Number of ways in the layer.
    pub ways: usize,
}

/// A task as listed by the web map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfo {
    /// Task name.
    pub name: String,
    /// Output kind of the map data.
    pub output: OutputKind,
    /// Map data path relative to `html/`.
    pub data: String,
    /// Date of the last analysis.
    pub analysis_time: Option<String>,
    /// Extent of the results.
    pub bbox: Option<Bbox>,
    /// Centre of the results.
    pub center: Option<Center>,
    /// Result layers.
    pub layers: Vec<LayerInfo>,
}

/// Reads `project_output.json`; a missing file is an empty output.
///
/// # Errors
///
/// Returns [`ExportError`] if the file exists but cannot be read or parsed.
pub fn read_project_output(path: &Path) -> Result<ProjectOutput, ExportError> {
    if !path.exists() {
        log::debug!("No previous project output at {}", path.display());
        return Ok(ProjectOutput::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes `project_output.json`, pretty printed with sorted keys.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_project_output(path: &Path, output: &ProjectOutput) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = serde_json::to_string_pretty(output)?;
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}

/// Initial map centre: the configured one, or else the centre of the last
/// task that has results.
#[must_use]
pub fn map_center(config: &ProjectConfig, output: &ProjectOutput) -> Option<Center> {
    if let (Some(lat), Some(lon)) = (config.map_lat, config.map_lon) {
        return Some(Center { lat, lon });
    }
    config
        .tasks
        .iter()
        .rev()
        .find_map(|task| output.tasks.get(&task.name).and_then(|stats| stats.center))
}

/// Builds the map view and the task list in project order.
#[must_use]
pub fn tasks_info(config: &ProjectConfig, output: &ProjectOutput) -> (MapView, Vec<TaskInfo>) {
    let view = MapView {
        title: config.title.clone(),
        center: map_center(config, output).unwrap_or(Center { lat: 0.0, lon: 0.0 }),
        zoom: config.map_zoom,
    };

    let tasks = config
        .tasks
        .iter()
        .map(|task| {
            let stats = output.tasks.get(&task.name);
            let ways: BTreeMap<Status, usize> =
                stats.map(|s| s.ways.clone()).unwrap_or_default();
            TaskInfo {
                name: task.name.clone(),
                output: task.output.kind,
                data: format!(
                    "data/{}/{}",
                    task.name,
                    map_data::file_name(task.output.kind)
                ),
                analysis_time: stats.and_then(|s| s.analysis_time.clone()),
                bbox: stats.and_then(|s| s.bbox),
                center: stats.and_then(|s| s.center),
                layers: Status::ALL
                    .iter()
                    .map(|&status| LayerInfo {
                        name: status,
                        description: status.description(),
                        ways: ways.get(&status).copied().unwrap_or(0),
                    })
                    .collect(),
            }
        })
        .collect();

    (view, tasks)
}

/// Renders the `tasks_info.js` script.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn tasks_info_js(view: &MapView, tasks: &[TaskInfo]) -> Result<String, ExportError> {
    Ok(format!(
        "{GENERATED_HEADER}\nvar project = {};\nvar tasks = {};\n",
        serde_json::to_string_pretty(view)?,
        serde_json::to_string_pretty(tasks)?,
    ))
}

/// Writes `tasks_info.js` for the project.
///
/// # Errors
///
/// Returns [`ExportError`] if the file cannot be written.
pub fn write_tasks_info(
    path: &Path,
    config: &ProjectConfig,
    output: &ProjectOutput,
) -> Result<(), ExportError> {
    let (view, tasks) = tasks_info(config, output);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, tasks_info_js(&view, &tasks)?)?;
    log::info!("Wrote web map data for {} tasks", tasks.len());
    Ok(())
}
