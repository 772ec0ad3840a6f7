#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for comparing reference street networks with
//! OpenStreetMap.
//!
//! Log output goes through [`compare_osm_cli_utils::init_logger`] so it
//! never tears the progress bars.

mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use compare_osm_task::acquire::FetchMode;
use compare_osm_task::project::Project;

#[derive(Parser)]
#[command(
    name = "compare_osm",
    about = "Compare reference street networks with OpenStreetMap"
)]
struct Cli {
    /// Project file (TOML, or JSON with a `.json` extension)
    #[arg(long, global = true, default_value = "project.toml")]
    project: PathBuf,
    /// Comma-separated list of tasks to process (default: all tasks)
    #[arg(long, global = true, value_delimiter = ',')]
    tasks: Vec<String>,
    /// Use cached OSM data instead of querying Overpass
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Compare the street networks and export the result layers
    Analyse,
    /// Regenerate the web map data from the last analysis
    UpdateMap,
    /// Analyse, then update the web map data
    Run,
    /// Print the project configuration
    Config,
    /// List the project tasks
    Tasks,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = compare_osm_cli_utils::init_logger();
    let cli = Cli::parse();

    let project = Project::load(&cli.project)?;
    let mode = if cli.offline {
        FetchMode::Offline
    } else {
        FetchMode::Online
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Analyse => {
            pipeline::analyse(&project, &cli.tasks, mode, &multi).await?;
        }
        Commands::UpdateMap => pipeline::update_map(&project, &cli.tasks, &multi)?,
        Commands::Run => {
            pipeline::analyse(&project, &cli.tasks, mode, &multi).await?;
            pipeline::update_map(&project, &cli.tasks, &multi)?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(project.config())?);
        }
        Commands::Tasks => pipeline::list_tasks(&project)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_on_project_toml() {
        let cli = Cli::try_parse_from(["compare_osm"]).unwrap();
        assert_eq!(cli.project, PathBuf::from("project.toml"));
        assert!(cli.tasks.is_empty());
        assert!(!cli.offline);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn global_options_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "compare_osm",
            "analyse",
            "--tasks",
            "verona,rimini",
            "--offline",
            "--project",
            "italia.json",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Analyse));
        assert_eq!(cli.tasks, ["verona", "rimini"]);
        assert!(cli.offline);
        assert_eq!(cli.project, PathBuf::from("italia.json"));
    }

    #[test]
    fn update_map_is_kebab_case() {
        let cli = Cli::try_parse_from(["compare_osm", "update-map"]).unwrap();
        assert_eq!(cli.command, Some(Commands::UpdateMap));
    }
}
