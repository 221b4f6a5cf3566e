//! Task orchestration: runs the enabled tasks over every loaded source
//! workbook, concurrently or sequentially, and collects one structured
//! outcome per task.

use std::thread;

use tracing::{error, info};

use crate::config::Config;
use crate::dest::DestinationBook;
use crate::error::{CollectError, Result};
use crate::extract::extract_book;
use crate::registry::OrgRegistry;
use crate::source::{load_sources, SourceSet};
use crate::task::{TaskFamily, TaskKind};
use crate::transform::transform;

/// File name of the consolidated output workbook.
pub const DEST_FILE_NAME: &str = "项目立项及实际费用明细.xlsx";

/// Terminal state of one task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: TaskKind,
    /// Data rows appended to the task's destination sheet.
    pub rows: u32,
    /// The first error the task hit, if it failed.
    pub error: Option<CollectError>,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of all dispatched tasks, in dispatch order.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    /// Surfaces the first-observed task failure; the rest stay logged
    /// in their outcomes.
    pub fn into_first_error(self) -> Option<CollectError> {
        self.outcomes
            .into_iter()
            .find_map(|outcome| outcome.error)
    }
}

/// Drives one consolidation run.
pub struct Collector {
    config: Config,
}

impl Collector {
    pub fn new(config: Config) -> Collector {
        Collector { config }
    }

    /// Loads sources, creates the destination workbook, and dispatches the
    /// enabled tasks. Source loading and destination creation failures are
    /// fatal to the whole run; task failures are collected per task.
    pub fn run(&self) -> Result<RunReport> {
        let sources = load_sources(&self.config.src_dir)?;
        let dest = DestinationBook::create(&self.config.dst_dir, DEST_FILE_NAME)?;

        let tasks = self.config.enabled_tasks();
        let sources = &sources;
        let dest = &dest;
        let outcomes = if self.config.concurrent {
            thread::scope(|scope| {
                let handles: Vec<_> = tasks
                    .iter()
                    .map(|&task| scope.spawn(move || run_task(task, sources, dest)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().expect("task thread panicked"))
                    .collect()
            })
        } else {
            tasks
                .iter()
                .map(|&task| run_task(task, sources, dest))
                .collect()
        };

        Ok(RunReport { outcomes })
    }
}

fn run_task(task: TaskKind, sources: &SourceSet, dest: &DestinationBook) -> TaskOutcome {
    info!(%task, "task started");
    match execute_task(task, sources, dest) {
        Ok(rows) => {
            info!(%task, rows, "task succeeded");
            TaskOutcome {
                task,
                rows,
                error: None,
            }
        }
        Err(err) => {
            error!(%task, error = %err, "task failed");
            TaskOutcome {
                task,
                rows: 0,
                error: Some(err),
            }
        }
    }
}

/// The full locate → extract → transform → append pipeline for one task.
///
/// Fails fast on the first error; rows already appended stay in the
/// destination file.
fn execute_task(task: TaskKind, sources: &SourceSet, dest: &DestinationBook) -> Result<u32> {
    let spec = task.spec();

    let registry = if spec.family == TaskFamily::Content {
        Some(OrgRegistry::from_files(&sources.registry_files)?)
    } else {
        None
    };

    let mut sheet = dest.open_sheet(spec.dest_sheet)?;
    for book in &sources.books {
        for extraction in extract_book(spec, book)? {
            let payload = transform(spec, &extraction, registry.as_ref());
            sheet.append(&payload)?;
        }
    }
    Ok(sheet.rows_written())
}
