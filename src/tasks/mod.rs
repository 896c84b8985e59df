//! Named, ordered pipeline steps that orchestrate resource changes.
pub mod conda;
pub mod dotfiles;
pub mod packages;
mod processing;
pub mod shell;
pub mod shell_framework;
pub mod ssh;
pub mod theme;
pub mod theme_line;

pub use processing::{Context, SystemAccess, Target};
pub use processing::{
    TaskResult, TaskStats, inspect_resources, process_resource_states, process_resources,
};

use anyhow::Result;

use crate::logging::TaskStatus;
use crate::resources::ResourceState;

/// A named, executable pipeline step.
pub trait Task {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task applies to the current configuration.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails to execute, such as when an
    /// external command exits non-zero or a file operation is not permitted.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;

    /// Describe every resource this task manages together with its current
    /// state, changing nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a state probe fails.
    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>>;
}

/// The provisioning pipeline, in execution order.
///
/// Both shell customization strategies are listed; exactly one of them
/// reports [`Task::should_run`] for a given configuration.
#[must_use]
pub fn all_install_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(packages::InstallPackages),
        Box::new(conda::InstallConda),
        Box::new(shell_framework::InstallShellFramework),
        Box::new(theme::InstallPromptTheme),
        Box::new(dotfiles::CopyDotfiles),
        Box::new(theme_line::SetPromptTheme),
        Box::new(shell::SetDefaultShell),
        Box::new(ssh::GenerateSshKey),
        Box::new(ssh::ConfigureSshHost),
    ]
}

/// Execute a task, recording the result in the logger.
///
/// # Errors
///
/// Returns the task's error after recording it as failed.
pub fn execute(task: &dyn Task, ctx: &Context) -> Result<()> {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return Ok(());
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            return Err(e);
        }
    }
    Ok(())
}
