#![allow(clippy::module_name_repetitions)]
//! Canonical file paths of a project directory.
//!
//! ```text
//! <root>/
//!   project_output.json
//!   data/osm/<task>.json           cached Overpass responses
//!   data/out/<task>.duckdb         task layers
//!   data/out/<task>/               exported GeoJSON and shapefiles
//!   data/out/<task>/input/         converted reference and boundary data
//!   html/data/tasks_info.js
//!   html/data/<task>/              web map data
//! ```

use std::path::{Path, PathBuf};

/// Resolves every file of a project relative to its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Creates the layout for the project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for the directory containing `project_file`.
    #[must_use]
    pub fn for_project_file(project_file: &Path) -> Self {
        let root = project_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(root)
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a path from the project file against the root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// `data/` directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// `data/osm/` directory for downloaded OSM data.
    #[must_use]
    pub fn osm_dir(&self) -> PathBuf {
        self.data_dir().join("osm")
    }

    /// Cached Overpass response of a task.
    #[must_use]
    pub fn osm_cache(&self, task: &str) -> PathBuf {
        self.osm_dir().join(format!("{task}.json"))
    }

    /// `data/out/` directory for analysis results.
    #[must_use]
    pub fn out_dir(&self) -> PathBuf {
        self.data_dir().join("out")
    }

    /// `DuckDB` file of a task.
    #[must_use]
    pub fn task_db(&self, task: &str) -> PathBuf {
        self.out_dir().join(format!("{task}.duckdb"))
    }

    /// Export directory of a task.
    #[must_use]
    pub fn task_out_dir(&self, task: &str) -> PathBuf {
        self.out_dir().join(task)
    }

    /// Converted inputs of a task.
    #[must_use]
    pub fn task_input_dir(&self, task: &str) -> PathBuf {
        self.task_out_dir(task).join("input")
    }

    /// Exported file of a result layer, e.g. `data/out/<task>/notinosm.geojson`.
    #[must_use]
    pub fn layer_file(&self, task: &str, layer: &str, extension: &str) -> PathBuf {
        self.task_out_dir(task).join(format!("{layer}.{extension}"))
    }

    /// `html/` directory of the web map.
    #[must_use]
    pub fn html_dir(&self) -> PathBuf {
        self.root.join("html")
    }

    /// `html/data/` directory.
    #[must_use]
    pub fn html_data_dir(&self) -> PathBuf {
        self.html_dir().join("data")
    }

    /// Web map data of a task.
    #[must_use]
    pub fn map_data_dir(&self, task: &str) -> PathBuf {
        self.html_data_dir().join(task)
    }

    /// Per-task statistics shared between runs.
    #[must_use]
    pub fn project_output(&self) -> PathBuf {
        self.root.join("project_output.json")
    }

    /// Data file read by the web map.
    #[must_use]
    pub fn tasks_info(&self) -> PathBuf {
        self.html_data_dir().join("tasks_info.js")
    }
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Empties a directory, creating it if it does not exist.
///
/// # Errors
///
/// Returns an I/O error if the old contents cannot be removed or the
/// directory cannot be created.
pub fn reset_dir(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        log::debug!("Removing old files in {}", path.display());
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_relative_to_root() {
        let paths = ProjectPaths::new("/srv/project");
        assert_eq!(
            paths.task_db("verona"),
            PathBuf::from("/srv/project/data/out/verona.duckdb")
        );
        assert_eq!(
            paths.layer_file("verona", "notinosm", "geojson"),
            PathBuf::from("/srv/project/data/out/verona/notinosm.geojson")
        );
        assert_eq!(
            paths.map_data_dir("verona"),
            PathBuf::from("/srv/project/html/data/verona")
        );
        assert_eq!(
            paths.tasks_info(),
            PathBuf::from("/srv/project/html/data/tasks_info.js")
        );
        assert_eq!(
            paths.osm_cache("verona"),
            PathBuf::from("/srv/project/data/osm/verona.json")
        );
    }

    #[test]
    fn root_of_bare_project_file_is_current_dir() {
        let paths = ProjectPaths::for_project_file(Path::new("project.toml"));
        assert_eq!(paths.root(), Path::new("."));

        let nested = ProjectPaths::for_project_file(Path::new("/srv/p/project.toml"));
        assert_eq!(nested.root(), Path::new("/srv/p"));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let paths = ProjectPaths::new("/srv/project");
        assert_eq!(
            paths.resolve(Path::new("/data/ways.shp")),
            PathBuf::from("/data/ways.shp")
        );
        assert_eq!(
            paths.resolve(Path::new("data/ways.shp")),
            PathBuf::from("/srv/project/data/ways.shp")
        );
    }

    #[test]
    fn reset_dir_removes_old_files() {
        let tmp = std::env::temp_dir().join("compare_osm_reset_dir_test");
        let _ = std::fs::remove_dir_all(&tmp);

        reset_dir(&tmp).unwrap();
        assert!(tmp.is_dir());

        std::fs::write(tmp.join("old.geojson"), "{}").unwrap();
        reset_dir(&tmp).unwrap();
        assert!(tmp.is_dir());
        assert!(!tmp.join("old.geojson").exists());

        std::fs::remove_dir_all(&tmp).unwrap();
    }
}
