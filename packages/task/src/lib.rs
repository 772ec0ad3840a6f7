#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Task pipeline: acquire the inputs of a zone, compare the two street
//! networks, store and export the result layers, and publish the web map
//! data.

pub mod acquire;
pub mod comparator;
pub mod progress;
pub mod project;

use std::path::PathBuf;

use compare_osm_database::paths::{ProjectPaths, reset_dir};
use compare_osm_database::task_db::{self, OSM_LAYER, REFERENCE_LAYER};
use compare_osm_export::{ExportError, geojson_file, map_data, ogr};
use compare_osm_geometry::{Comparison, LineSet};
use compare_osm_task_models::{Bbox, ConfigError, Status, TaskConfig, TaskStats};
use geo::{BoundingRect, Geometry, LineString, Rect};

use crate::acquire::FetchMode;
use crate::progress::{ProgressCallback, Step};

/// Date format of [`TaskStats::analysis_time`].
pub const ANALYSIS_TIME_FORMAT: &str = "%d/%m/%Y";

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Invalid project configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The project file cannot be read or parsed.
    #[error("Project file error in {path}: {message}")]
    ProjectFile {
        /// Path of the project file.
        path: String,
        /// Error description.
        message: String,
    },

    /// A requested task is not in the project.
    #[error("Unknown task: {name}")]
    UnknownTask {
        /// Requested name.
        name: String,
    },

    /// Offline run without a cached OSM response.
    #[error("No cached OSM data at {path}; run once without --offline")]
    MissingOsmCache {
        /// Expected cache path.
        path: String,
    },

    /// An input dataset does not exist.
    #[error("Input file not found: {path}")]
    MissingInput {
        /// Configured path.
        path: String,
    },

    /// Map data requested before the task was analysed.
    #[error("Task {task} has no results at {path}; analyse it first")]
    MissingResults {
        /// Task name.
        task: String,
        /// Expected result file.
        path: String,
    },

    /// OSM acquisition error.
    #[error("OSM error: {0}")]
    Osm(#[from] compare_osm_osm::OsmError),

    /// Database error.
    #[error("Database error: {0}")]
    Db(#[from] compare_osm_database::DbError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Geometry error.
    #[error("Geometry error: {0}")]
    Geometry(#[from] compare_osm_geometry::GeometryError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One task of a project, bound to the project's file layout.
pub struct Task<'a> {
    config: &'a TaskConfig,
    paths: &'a ProjectPaths,
}

impl<'a> Task<'a> {
    /// Binds a task configuration to a project layout.
    #[must_use]
    pub const fn new(config: &'a TaskConfig, paths: &'a ProjectPaths) -> Self {
        Self { config, paths }
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs the analysis and returns the statistics to record.
    ///
    /// Steps: acquire the OSM and reference ways, clip the OSM ways to the
    /// boundary, compute both result layers, store every layer in the task
    /// database, and export the result layers as `GeoJSON` and shapefiles.
    /// The previous output of the task is kept until the comparison has
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] if any step fails.
    #[allow(clippy::future_not_send)]
    pub async fn analyse(
        &self,
        client: &reqwest::Client,
        mode: FetchMode,
        progress: &dyn ProgressCallback,
    ) -> Result<TaskStats, TaskError> {
        let name = self.name();
        log::info!("Analysing task {name}");

        progress.begin(Step::Acquire);
        let osm_ways = acquire::osm_ways(self.config, self.paths, client, mode).await?;
        log::info!("{name}: {} OSM ways", osm_ways.len());
        progress.end(Step::Acquire);

        progress.begin(Step::ReadReference);
        let reference = LineSet::from_geometries(acquire::reference_geometries(
            self.config,
            self.paths,
        )?);
        let mut osm =
            LineSet::from_geometries(osm_ways.into_iter().map(|w| Geometry::LineString(w.geometry)));
        if let Some(boundary) = acquire::boundary(self.config, self.paths)? {
            osm = osm.clip_to(&boundary);
        }
        log::info!(
            "{name}: {} reference ways, {} OSM ways after normalization",
            reference.len(),
            osm.len()
        );
        progress.end(Step::ReadReference);

        let comparator = comparator::for_kind(self.config.comparator);
        progress.begin(Step::Compare);
        log::debug!("{name}: comparing with the {} engine", comparator.name());
        let comparison = comparator.compare(&reference, &osm, self.config.buffer_tolerance)?;
        log::info!(
            "{name}: {} ways not in OSM, {} ways only in OSM",
            comparison.not_in_osm.len(),
            comparison.only_in_osm.len()
        );
        progress.end(Step::Compare);

        let analysis_time = chrono::Local::now().format(ANALYSIS_TIME_FORMAT).to_string();

        // Previous results stay in place until there are new ones.
        reset_dir(&self.paths.task_out_dir(name))?;

        progress.begin(Step::Store);
        self.store(&reference, &osm, &comparison, &analysis_time)?;
        progress.end(Step::Store);

        progress.begin(Step::Export);
        self.export(&comparison)?;
        progress.end(Step::Export);

        let bbox = result_bbox(&comparison).or_else(|| {
            merge_rects(reference.bounding_rect(), osm.bounding_rect()).map(bbox_of)
        });

        progress.done(&format!(
            "{} not in OSM, {} only in OSM",
            comparison.not_in_osm.len(),
            comparison.only_in_osm.len()
        ));
        Ok(TaskStats {
            analysis_time: Some(analysis_time),
            bbox,
            center: bbox.map(|b| b.center()),
            ways: Status::ALL
                .iter()
                .map(|&status| (status, layer(&comparison, status).len()))
                .collect(),
        })
    }

    fn store(
        &self,
        reference: &LineSet,
        osm: &LineSet,
        comparison: &Comparison,
        analysis_time: &str,
    ) -> Result<(), TaskError> {
        let conn = task_db::open(&self.paths.task_db(self.name()))?;
        task_db::replace_layer(&conn, REFERENCE_LAYER, reference.lines())?;
        task_db::replace_layer(&conn, OSM_LAYER, osm.lines())?;
        for status in Status::ALL {
            task_db::replace_layer(&conn, status.as_ref(), layer(comparison, status))?;
        }
        task_db::set_meta(&conn, "analysis_time", analysis_time)?;
        task_db::set_meta(&conn, "comparator", self.config.comparator.as_ref())?;
        task_db::set_meta(
            &conn,
            "buffer_tolerance",
            &self.config.buffer_tolerance.to_string(),
        )?;
        Ok(())
    }

    fn export(&self, comparison: &Comparison) -> Result<(), TaskError> {
        let name = self.name();
        for status in Status::ALL {
            let geojson = self.result_file(status);
            geojson_file::write_layer(&geojson, status, layer(comparison, status))?;

            let shapefile = self.paths.layer_file(name, status.as_ref(), "shp");
            match ogr::export_shapefile(&geojson, &shapefile, status.as_ref()) {
                Ok(()) => {}
                Err(ExportError::ToolMissing { tool, source }) => {
                    log::warn!("{name}: skipping shapefile export, cannot run {tool}: {source}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// `GeoJSON` file of a result layer.
    #[must_use]
    pub fn result_file(&self, status: Status) -> PathBuf {
        self.paths
            .layer_file(self.name(), status.as_ref(), "geojson")
    }

    /// Regenerates the web map data from the exported result layers.
    ///
    /// Old map data of the task is removed first. Returns the written file.
    ///
    /// # Errors
    ///
    /// * [`TaskError::MissingResults`] if the task was never analysed
    /// * If the map data tool fails
    pub fn update_map_data(&self) -> Result<PathBuf, TaskError> {
        let name = self.name();
        let layers: Vec<(Status, PathBuf)> = Status::ALL
            .iter()
            .map(|&status| (status, self.result_file(status)))
            .collect();

        if let Some((_, missing)) = layers.iter().find(|(_, path)| !path.exists()) {
            return Err(TaskError::MissingResults {
                task: name.to_string(),
                path: missing.display().to_string(),
            });
        }

        let dir = self.paths.map_data_dir(name);
        reset_dir(&dir)?;
        log::info!("{name}: generating {} map data", self.config.output.kind);
        Ok(map_data::write_map_data(&dir, &layers, &self.config.output)?)
    }
}

fn layer(comparison: &Comparison, status: Status) -> &[LineString<f64>] {
    match status {
        Status::NotInOsm => &comparison.not_in_osm,
        Status::OnlyInOsm => &comparison.only_in_osm,
    }
}

fn result_bbox(comparison: &Comparison) -> Option<Bbox> {
    comparison
        .not_in_osm
        .iter()
        .chain(&comparison.only_in_osm)
        .filter_map(|line| line.bounding_rect())
        .reduce(|a, b| merge_rects(Some(a), Some(b)).unwrap_or(a))
        .map(bbox_of)
}

fn merge_rects(a: Option<Rect<f64>>, b: Option<Rect<f64>>) -> Option<Rect<f64>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Rect::new(
            (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
            (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
        )),
        (a, None) => a,
        (None, b) => b,
    }
}

fn bbox_of(rect: Rect<f64>) -> Bbox {
    Bbox {
        min_lon: rect.min().x,
        min_lat: rect.min().y,
        max_lon: rect.max().x,
        max_lat: rect.max().y,
    }
}
