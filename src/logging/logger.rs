//! [`Logger`]: the [`Log`] implementation used by `provision`.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET, SUMMARY_TARGET, log_file_path};
use super::types::{Log, TaskEntry, TaskStatus};

/// Logs through `tracing` and collects task outcomes for the run summary.
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`.
    ///
    /// Only remembers where the log file lives, for the summary; the file
    /// is written by [`init_subscriber`](super::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger whose summary points at `log_file`.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Log file of this run, if one could be created.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Recorded task outcomes, in execution order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Whether any recorded task failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tasks
            .lock()
            .is_ok_and(|g| g.iter().any(|t| t.status == TaskStatus::Failed))
    }

    /// Print one line per recorded task, then per-status totals.
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }
        self.stage("Summary");

        for task in &tasks {
            let suffix = task
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            tracing::info!(
                target: SUMMARY_TARGET,
                tone = task.status.label(),
                "{} {}{suffix}",
                task.status.icon(),
                task.name
            );
        }

        let totals: Vec<String> = TaskStatus::ALL
            .iter()
            .map(|status| {
                let n = tasks.iter().filter(|t| t.status == *status).count();
                format!("{n} {}", status.label())
            })
            .collect();
        tracing::info!(
            target: SUMMARY_TARGET,
            "{} tasks: {}",
            tasks.len(),
            totals.join(", ")
        );

        if let Some(path) = &self.log_file {
            tracing::info!(target: SUMMARY_TARGET, "log: {}", path.display());
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}
