//! Project file loading and task selection.

use std::path::{Path, PathBuf};

use compare_osm_database::paths::ProjectPaths;
use compare_osm_export::web;
use compare_osm_task_models::{ProjectConfig, ProjectOutput, TaskConfig};

use crate::TaskError;

/// A loaded and validated project.
#[derive(Debug, Clone)]
pub struct Project {
    file: PathBuf,
    paths: ProjectPaths,
    config: ProjectConfig,
}

impl Project {
    /// Loads a project file.
    ///
    /// The format follows the extension: `.json` is JSON, anything else is
    /// TOML. Relative paths inside the file are resolved against the
    /// directory containing it.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read or parsed
    /// * If the configuration is invalid
    pub fn load(file: &Path) -> Result<Self, TaskError> {
        let text = std::fs::read_to_string(file).map_err(|e| TaskError::ProjectFile {
            path: file.display().to_string(),
            message: e.to_string(),
        })?;
        let config = parse(file, &text)?;
        Self::from_config(file, config)
    }

    /// Wraps an already parsed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the configuration is invalid.
    pub fn from_config(file: &Path, config: ProjectConfig) -> Result<Self, TaskError> {
        config.validate()?;
        log::debug!(
            "Loaded project {} with {} tasks",
            file.display(),
            config.tasks.len()
        );
        Ok(Self {
            file: file.to_path_buf(),
            paths: ProjectPaths::for_project_file(file),
            config,
        })
    }

    /// Path of the project file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// File layout of the project.
    #[must_use]
    pub const fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Tasks to run, in project order.
    ///
    /// An empty selection means every task. Names are matched exactly.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for a name not in the project.
    pub fn select(&self, names: &[String]) -> Result<Vec<&TaskConfig>, TaskError> {
        if names.is_empty() {
            return Ok(self.config.tasks.iter().collect());
        }

        for name in names {
            if self.config.task(name).is_none() {
                return Err(TaskError::UnknownTask { name: name.clone() });
            }
        }

        Ok(self
            .config
            .tasks
            .iter()
            .filter(|task| names.contains(&task.name))
            .collect())
    }

    /// Reads the output of previous runs.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Export`] if an existing file cannot be parsed.
    pub fn previous_output(&self) -> Result<ProjectOutput, TaskError> {
        Ok(web::read_project_output(&self.paths.project_output())?)
    }
}

fn parse(file: &Path, text: &str) -> Result<ProjectConfig, TaskError> {
    let is_json = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(text).map_err(|e| e.to_string())
    } else {
        toml::from_str(text).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| TaskError::ProjectFile {
        path: file.display().to_string(),
        message,
    })
}
