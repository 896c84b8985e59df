//! Task outcomes and the [`Log`] trait tasks write through.

/// Outcome of one pipeline step, as shown in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Step name.
    pub name: String,
    /// Final status of the step.
    pub status: TaskStatus,
    /// Skip reason or error description.
    pub message: Option<String>,
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully.
    Ok,
    /// Task belongs to the shell customization that was not selected.
    NotApplicable,
    /// Task had nothing it could act on.
    Skipped,
    /// Task ran in dry-run mode; no changes were applied.
    DryRun,
    /// Task encountered an error and aborted the run.
    Failed,
}

impl TaskStatus {
    /// Every status, in the order the summary totals list them.
    pub const ALL: [Self; 5] = [
        Self::Ok,
        Self::NotApplicable,
        Self::Skipped,
        Self::DryRun,
        Self::Failed,
    ];

    /// Marker printed in front of the task name.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::NotApplicable => "·",
            Self::Skipped => "○",
            Self::DryRun => "~",
            Self::Failed => "✗",
        }
    }

    /// Short label used in the totals line and as the console tone.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotApplicable => "n/a",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }
}

/// Abstraction over logging backends.
///
/// Task code logs through this trait so that tests can substitute a logger
/// whose recorded task outcomes they inspect afterwards.
pub trait Log: Send + Sync {
    /// Log a stage header (one per pipeline step).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (console only with `--verbose`).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a change that a dry run would have made.
    fn dry_run(&self, msg: &str);
    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
