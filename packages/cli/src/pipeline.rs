//! Runs the selected tasks of a project and publishes the web map data.
//!
//! Stats of the analysed tasks are merged into `project_output.json`, so
//! running a subset of tasks keeps the results of the others.

use std::time::Instant;

use compare_osm_cli_utils::{MultiProgress, TaskProgress, counter};
use compare_osm_export::web;
use compare_osm_task::Task;
use compare_osm_task::acquire::FetchMode;
use compare_osm_task::project::Project;
use compare_osm_task_models::{OsmSource, ProjectOutput};

/// Analyses the selected tasks, then rewrites the project output and the
/// task list of the web map.
///
/// A failing task stops the run; stats of the tasks completed before it
/// are still written.
///
/// # Errors
///
/// Returns an error if a task name is unknown, a task fails, or the output
/// files cannot be written.
#[allow(clippy::future_not_send)]
pub async fn analyse(
    project: &Project,
    names: &[String],
    mode: FetchMode,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let selected = project.select(names)?;
    let client = compare_osm_osm::overpass::client()?;
    let mut output = project.previous_output()?;

    let overall = counter(multi, "Tasks", selected.len());
    let mut failure = None;

    for config in selected {
        let progress = TaskProgress::new(multi, &config.name);
        match Task::new(config, project.paths())
            .analyse(&client, mode, &progress)
            .await
        {
            Ok(stats) => output.record(&config.name, stats),
            Err(e) => {
                progress.fail();
                log::error!("Task {} failed: {e}", config.name);
                failure = Some(e);
                break;
            }
        }
        overall.inc(1);
    }
    overall.finish_and_clear();

    output.retain_tasks(project.config());
    publish(project, &output)?;

    if let Some(e) = failure {
        return Err(e.into());
    }

    log::info!("Analysis complete in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Regenerates the map data of the selected tasks and the web task list.
///
/// # Errors
///
/// Returns an error if a task was never analysed or a map data tool fails.
pub fn update_map(
    project: &Project,
    names: &[String],
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let selected = project.select(names)?;
    let progress = counter(multi, "Map data", selected.len());

    for config in selected {
        progress.set_message(config.name.clone());
        let file = Task::new(config, project.paths()).update_map_data()?;
        log::info!("{}: wrote {}", config.name, file.display());
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut output = project.previous_output()?;
    output.retain_tasks(project.config());
    web::write_tasks_info(&project.paths().tasks_info(), project.config(), &output)?;
    Ok(())
}

/// Prints the project tasks with the date of their last analysis.
///
/// # Errors
///
/// Returns an error if the previous project output cannot be read.
pub fn list_tasks(project: &Project) -> Result<(), Box<dyn std::error::Error>> {
    let output = project.previous_output()?;

    println!("{:<20} {:<8} {:<12} OSM", "TASK", "OUTPUT", "ANALYSED");
    println!("{}", "-".repeat(60));
    for task in &project.config().tasks {
        let analysed = output
            .tasks
            .get(&task.name)
            .and_then(|stats| stats.analysis_time.as_deref())
            .unwrap_or("never");
        println!(
            "{:<20} {:<8} {:<12} {}",
            task.name,
            task.output.kind,
            analysed,
            describe_source(&task.osm)
        );
    }
    Ok(())
}

fn publish(project: &Project, output: &ProjectOutput) -> Result<(), Box<dyn std::error::Error>> {
    let paths = project.paths();
    web::write_project_output(&paths.project_output(), output)?;
    web::write_tasks_info(&paths.tasks_info(), project.config(), output)?;
    Ok(())
}

fn describe_source(source: &OsmSource) -> String {
    match source {
        OsmSource::Zone {
            name, admin_level, ..
        } => format!("zone {name} (admin_level {admin_level})"),
        OsmSource::Overpass { .. } => "overpass query".to_string(),
        OsmSource::Pbf { path } => format!("extract {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use compare_osm_cli_utils::ProgressDrawTarget;
    use compare_osm_task_models::{ProjectConfig, TaskStats};

    use super::*;

    fn project(root: &Path) -> Project {
        let config: ProjectConfig = serde_json::from_str(
            r#"{"tasks": [
                {"name": "verona",
                 "osm": {"type": "zone", "name": "Verona", "admin_level": 8},
                 "data": {"ways": "verona.geojson"}},
                {"name": "rimini",
                 "osm": {"type": "pbf", "path": "rimini.osm.pbf"},
                 "data": {"ways": "rimini.geojson"}}
            ]}"#,
        )
        .unwrap();
        Project::from_config(&root.join("project.json"), config).unwrap()
    }

    #[test]
    fn describes_osm_sources() {
        let project = project(Path::new("/srv/p"));
        let tasks = &project.config().tasks;
        assert_eq!(
            describe_source(&tasks[0].osm),
            "zone Verona (admin_level 8)"
        );
        assert_eq!(describe_source(&tasks[1].osm), "extract rimini.osm.pbf");
    }

    #[test]
    fn publish_writes_output_and_task_list() {
        let tmp = std::env::temp_dir().join("compare_osm_cli_publish_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let project = project(&tmp);

        let mut output = ProjectOutput::default();
        output.record("verona", TaskStats::default());
        publish(&project, &output).unwrap();

        assert_eq!(project.previous_output().unwrap(), output);
        let js = std::fs::read_to_string(project.paths().tasks_info()).unwrap();
        assert!(js.contains("\"name\": \"rimini\""));

        std::fs::remove_dir_all(&tmp).unwrap();
    }

    #[test]
    fn unknown_task_fails_before_running() {
        let project = project(Path::new("/srv/p"));
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let result = update_map(&project, &["padova".to_string()], &multi);
        assert!(result.is_err());
    }
}
