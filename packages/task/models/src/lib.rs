#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Project, task, and analysis output types.
//!
//! A project file lists one or more tasks. Each task compares the street
//! network of one zone in OpenStreetMap against a reference open-data line
//! dataset and produces the two [`Status`] layers. The types here are
//! shared by the analysis pipeline, the exporters, and the CLI.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default buffer tolerance in degrees (roughly 11 m at the equator).
pub const DEFAULT_BUFFER_TOLERANCE: f64 = 0.0001;

/// Default Overpass API endpoint.
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default project title shown on the web map.
pub const DEFAULT_TITLE: &str = "Compare to OSM";

/// `highway` values that are not part of the street network by default.
pub const DEFAULT_EXCLUDED_HIGHWAYS: [&str; 2] = ["footway", "cycleway"];

/// One of the two result layers of a comparison.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    /// Reference ways with no OSM way inside their tolerance corridor.
    NotInOsm,
    /// OSM ways with no reference way inside their tolerance corridor.
    OnlyInOsm,
}

impl Status {
    /// Both layers, in output order.
    pub const ALL: [Self; 2] = [Self::NotInOsm, Self::OnlyInOsm];

    /// Human-readable description of the layer.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotInOsm => "ways in the reference data which are missing in OSM",
            Self::OnlyInOsm => "ways in OSM which are missing in the reference data",
        }
    }
}

/// Which engine computes the buffered difference.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComparatorKind {
    /// In-memory engine (`geo` + R-tree).
    #[default]
    Geometry,
    /// `DuckDB` spatial SQL engine.
    DuckDb,
}

/// Where the OSM ways of a task come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OsmSource {
    /// Overpass area query built from an administrative zone.
    Zone {
        /// Value of the `name` tag of the boundary relation.
        name: String,
        /// Value of the `admin_level` tag of the boundary relation.
        admin_level: u8,
        /// Overpass endpoint override.
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Custom Overpass QL query.
    Overpass {
        /// Query body. An output header requesting JSON is prepended when
        /// missing.
        query: String,
        /// Overpass endpoint override.
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Local `.osm.pbf` extract.
    Pbf {
        /// Path to the extract.
        path: PathBuf,
    },
}

impl OsmSource {
    /// Returns the Overpass endpoint for online sources, `None` for local
    /// extracts.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Zone { endpoint, .. } | Self::Overpass { endpoint, .. } => {
                Some(endpoint.as_deref().unwrap_or(DEFAULT_OVERPASS_ENDPOINT))
            }
            Self::Pbf { .. } => None,
        }
    }
}

/// Reference data of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Reference line dataset (`.shp` or `GeoJSON`).
    #[serde(alias = "shapefile")]
    pub ways: PathBuf,
    /// Optional zone boundary polygons used to clip the OSM ways.
    #[serde(default)]
    pub boundaries: Option<PathBuf>,
}

/// How results are published on the web map.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputKind {
    /// `TopoJSON` file rendered client side.
    #[default]
    Vector,
    /// Pre-generated `PMTiles` archive.
    #[serde(alias = "raster")]
    Tiles,
}

/// Output settings of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output kind.
    #[serde(rename = "type", default)]
    pub kind: OutputKind,
    /// Minimum zoom level for tile output.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    /// Maximum zoom level for tile output.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            kind: OutputKind::default(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
        }
    }
}

const fn default_min_zoom() -> u8 {
    10
}

const fn default_max_zoom() -> u8 {
    13
}

const fn default_buffer_tolerance() -> f64 {
    DEFAULT_BUFFER_TOLERANCE
}

const fn default_map_zoom() -> u8 {
    5
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_excluded_highways() -> Vec<String> {
    DEFAULT_EXCLUDED_HIGHWAYS
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// A single zone comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task name, used for file names.
    pub name: String,
    /// Engine computing the difference.
    #[serde(default)]
    pub comparator: ComparatorKind,
    /// OSM data source.
    pub osm: OsmSource,
    /// Reference data.
    pub data: DataConfig,
    /// Web map output.
    #[serde(default)]
    pub output: OutputConfig,
    /// Buffer tolerance in coordinate units (degrees for EPSG:4326).
    #[serde(default = "default_buffer_tolerance")]
    pub buffer_tolerance: f64,
    /// `highway` values dropped from the OSM ways.
    #[serde(default = "default_excluded_highways")]
    pub excluded_highways: Vec<String>,
}

/// The project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Title of the web map.
    #[serde(default = "default_title")]
    pub title: String,
    /// Initial map latitude. When unset the centre of the last task is used.
    #[serde(default)]
    pub map_lat: Option<f64>,
    /// Initial map longitude.
    #[serde(default)]
    pub map_lon: Option<f64>,
    /// Initial map zoom.
    #[serde(default = "default_map_zoom")]
    pub map_zoom: u8,
    /// Tasks, in execution order.
    pub tasks: Vec<TaskConfig>,
}

impl ProjectConfig {
    /// Checks the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let mut seen = std::collections::BTreeSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(ConfigError::EmptyTaskName);
            }
            if !is_safe_task_name(&task.name) {
                return Err(ConfigError::InvalidTaskName {
                    name: task.name.clone(),
                });
            }
            if !seen.insert(task.name.as_str()) {
                return Err(ConfigError::DuplicateTask {
                    name: task.name.clone(),
                });
            }
            if !task.buffer_tolerance.is_finite() || task.buffer_tolerance <= 0.0 {
                return Err(ConfigError::InvalidTolerance {
                    task: task.name.clone(),
                    tolerance: task.buffer_tolerance,
                });
            }
            if task.output.min_zoom > task.output.max_zoom {
                return Err(ConfigError::InvalidZoom {
                    task: task.name.clone(),
                    min_zoom: task.output.min_zoom,
                    max_zoom: task.output.max_zoom,
                });
            }
        }

        Ok(())
    }

    /// Looks up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Task names become directory and file names under the project root, so
/// they are limited to one plain path component.
fn is_safe_task_name(name: &str) -> bool {
    !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Project file validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The project defines no task.
    #[error("the project does not contain any task")]
    NoTasks,
    /// A task has an empty name.
    #[error("a task has an empty name")]
    EmptyTaskName,
    /// A task name is not usable as a directory name.
    #[error("invalid task name {name:?}: use letters, digits, '_', '-' and '.'")]
    InvalidTaskName {
        /// The rejected name.
        name: String,
    },
    /// Two tasks share a name.
    #[error("duplicate task name: {name}")]
    DuplicateTask {
        /// The repeated name.
        name: String,
    },
    /// Buffer tolerance is not a positive finite number.
    #[error("task {task}: invalid buffer tolerance {tolerance}")]
    InvalidTolerance {
        /// Task name.
        task: String,
        /// Offending value.
        tolerance: f64,
    },
    /// `min_zoom` is greater than `max_zoom`.
    #[error("task {task}: min_zoom {min_zoom} is greater than max_zoom {max_zoom}")]
    InvalidZoom {
        /// Task name.
        task: String,
        /// Configured minimum zoom.
        min_zoom: u8,
        /// Configured maximum zoom.
        max_zoom: u8,
    },
}

/// Map centre, latitude first as the web map expects it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Bounding box in EPSG:4326.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    /// West edge.
    pub min_lon: f64,
    /// South edge.
    pub min_lat: f64,
    /// East edge.
    pub max_lon: f64,
    /// North edge.
    pub max_lat: f64,
}

impl Bbox {
    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> Center {
        Center {
            lat: self.min_lat + (self.max_lat - self.min_lat) / 2.0,
            lon: self.min_lon + (self.max_lon - self.min_lon) / 2.0,
        }
    }

    /// Smallest box covering both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// Result of analysing one task, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Date of the last analysis (`dd/mm/YYYY`).
    #[serde(default)]
    pub analysis_time: Option<String>,
    /// Extent of the results.
    #[serde(default)]
    pub bbox: Option<Bbox>,
    /// Centre of [`Self::bbox`].
    #[serde(default)]
    pub center: Option<Center>,
    /// Number of ways in each result layer.
    #[serde(default)]
    pub ways: BTreeMap<Status, usize>,
}

/// Contents of `project_output.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectOutput {
    /// Stats keyed by task name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskStats>,
}

impl ProjectOutput {
    /// Replaces the stats of a task.
    pub fn record(&mut self, task: &str, stats: TaskStats) {
        self.tasks.insert(task.to_string(), stats);
    }

    /// Drops stats of tasks no longer present in the project.
    pub fn retain_tasks(&mut self, config: &ProjectConfig) {
        self.tasks.retain(|name, _| config.task(name).is_some());
    }
}
