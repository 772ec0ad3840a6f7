#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the `compare_osm` binary: one step bar per task,
//! counters over task lists, and a logger that prints above the bars.

use compare_osm_task::progress::{ProgressCallback, Step};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

pub use indicatif::{MultiProgress, ProgressDrawTarget};

const TASK_TEMPLATE: &str = "{prefix:>12.bold} [{bar:24.cyan/blue}] {pos}/{len} {msg}";
const COUNTER_TEMPLATE: &str = "{prefix:>12.bold.green} {wide_bar:.green/dim} {pos}/{len} {msg}";

/// Step bar of one task analysis.
pub struct TaskProgress {
    bar: ProgressBar,
}

impl TaskProgress {
    /// Adds a bar for `task` to `multi`, sized to the analysis steps.
    #[must_use]
    pub fn new(multi: &MultiProgress, task: &str) -> Self {
        let bar = multi.add(
            ProgressBar::new(Step::ALL.len() as u64)
                .with_style(style(TASK_TEMPLATE))
                .with_prefix(task.to_string()),
        );
        Self { bar }
    }

    /// Marks the task as failed, leaving the bar on screen.
    pub fn fail(&self) {
        self.bar.abandon_with_message("failed");
    }
}

impl ProgressCallback for TaskProgress {
    fn begin(&self, step: Step) {
        self.bar.set_message(step.label());
    }

    fn end(&self, _step: Step) {
        self.bar.inc(1);
    }

    fn done(&self, summary: &str) {
        self.bar.finish_with_message(summary.to_string());
    }
}

/// A counter over `total` items, e.g. the selected tasks.
#[must_use]
pub fn counter(multi: &MultiProgress, label: &str, total: usize) -> ProgressBar {
    multi.add(
        ProgressBar::new(total as u64)
            .with_style(style(COUNTER_TEMPLATE))
            .with_prefix(label.to_string()),
    )
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge`.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Bars created on
/// the returned [`MultiProgress`] are suspended while a log line prints.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let max_level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already installed");
    }
    log::set_max_level(max_level);

    multi
}
