//! Generic resource processing loop: check state, apply, collect stats.
//!
//! - [`apply`]: single-resource processing (`process_single`, `apply_resource`)
//! - [`context`]: shared execution context for tasks

mod apply;
pub mod context;

pub use context::{Context, SystemAccess, Target};

use anyhow::Result;

use crate::resources::{Resource, ResourceState};

/// Result of a single task execution.
///
/// # Examples
///
/// ```
/// use provision_cli::tasks::TaskResult;
///
/// let ok = TaskResult::Ok;
/// let skipped = TaskResult::Skipped("no packages configured".into());
/// let dry = TaskResult::DryRun;
///
/// assert!(matches!(ok, TaskResult::Ok));
/// assert!(matches!(skipped, TaskResult::Skipped(_)));
/// assert!(matches!(dry, TaskResult::DryRun));
/// ```
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task had nothing to do.
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun,
}

/// Counters for tasks that process one or more resources.
///
/// # Examples
///
/// ```
/// use provision_cli::tasks::TaskStats;
///
/// let stats = TaskStats { changed: 1, already_ok: 2, skipped: 3 };
/// assert_eq!(stats.summary(false), "1 changed, 2 already ok, 3 skipped");
/// assert_eq!(stats.summary(true), "1 would change, 2 already ok, 3 skipped");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of items changed or applied.
    pub changed: u32,
    /// Number of items already in the correct state.
    pub already_ok: u32,
    /// Number of items skipped because they cannot be applied.
    pub skipped: u32,
}

impl TaskStats {
    /// Create a new empty stats counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        if self.skipped > 0 {
            format!(
                "{} {verb}, {} already ok, {} skipped",
                self.changed, self.already_ok, self.skipped
            )
        } else {
            format!("{} {verb}, {} already ok", self.changed, self.already_ok)
        }
    }

    /// Log the summary and return the appropriate `TaskResult`.
    #[must_use]
    pub fn finish(self, ctx: &Context) -> TaskResult {
        ctx.log.info(&self.summary(ctx.dry_run));
        if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        }
    }
}

impl std::ops::AddAssign for TaskStats {
    fn add_assign(&mut self, other: Self) {
        self.changed += other.changed;
        self.already_ok += other.already_ok;
        self.skipped += other.skipped;
    }
}

/// Process resources by checking each one's current state and applying as needed.
///
/// `verb` names the change in log lines ("install", "copy", ...). Resources
/// are handled strictly in order and the first failure aborts the loop.
///
/// # Errors
///
/// Returns an error if any resource fails to check its state or apply.
pub fn process_resources<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    verb: &str,
) -> Result<TaskResult> {
    let mut stats = TaskStats::new();
    for resource in resources {
        let current = resource.current_state()?;
        stats += apply::process_single(ctx, &resource, current, verb)?;
    }
    Ok(stats.finish(ctx))
}

/// Process resources with pre-computed states.
///
/// For tasks that batch-query state (packages) and then iterate with cached
/// results.
///
/// # Errors
///
/// Returns an error if any resource fails to apply.
pub fn process_resource_states<R: Resource>(
    ctx: &Context,
    resource_states: impl IntoIterator<Item = (R, ResourceState)>,
    verb: &str,
) -> Result<TaskResult> {
    let mut stats = TaskStats::new();
    for (resource, current) in resource_states {
        stats += apply::process_single(ctx, &resource, current, verb)?;
    }
    Ok(stats.finish(ctx))
}

/// Describe each resource with its current state, applying nothing.
///
/// # Errors
///
/// Returns an error if a state probe fails.
pub fn inspect_resources<R: Resource>(
    resources: impl IntoIterator<Item = R>,
) -> Result<Vec<(String, ResourceState)>> {
    resources
        .into_iter()
        .map(|r| Ok((r.description(), r.current_state()?)))
        .collect()
}
