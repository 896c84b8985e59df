//! Command: report resource state without changing anything.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::{Log, Logger, TaskStatus};
use crate::resources::ResourceState;
use crate::tasks::{self, SystemAccess};

/// One report line for a resource in `state`.
fn describe(desc: &str, state: &ResourceState) -> String {
    match state {
        ResourceState::Correct => format!("ok: {desc}"),
        ResourceState::Missing => format!("missing: {desc}"),
        ResourceState::Incorrect { current } => format!("differs: {desc} (currently {current})"),
        ResourceState::Invalid { reason } => format!("invalid: {desc} ({reason})"),
    }
}

/// Run the status command: report every step's resources, changing nothing.
///
/// A task whose state cannot be probed is reported as failed; the command
/// itself still succeeds.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the target user
/// does not exist.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>, system: SystemAccess) -> Result<()> {
    log.info(&format!("provision {}", super::version::version()));

    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.context(Arc::clone(log) as Arc<dyn Log>, true, system)?;

    for task in tasks::all_install_tasks() {
        if !task.should_run(&ctx) {
            log.record_task(task.name(), TaskStatus::NotApplicable, None);
            continue;
        }
        log.stage(task.name());
        match task.inspect(&ctx) {
            Ok(report) => {
                let mut pending = 0usize;
                for (desc, state) in &report {
                    log.info(&describe(desc, state));
                    if *state != ResourceState::Correct {
                        pending += 1;
                    }
                }
                if pending == 0 {
                    log.record_task(task.name(), TaskStatus::Ok, None);
                } else {
                    log.record_task(
                        task.name(),
                        TaskStatus::DryRun,
                        Some(&format!("{pending} pending")),
                    );
                }
            }
            Err(e) => {
                log.error(&format!("{}: {e:#}", task.name()));
                log.record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            }
        }
    }

    log.print_summary();
    Ok(())
}
