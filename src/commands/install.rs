//! Command: apply every provisioning task.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, InstallOpts};
use crate::error::PreconditionError;
use crate::logging::{Log, Logger};
use crate::tasks::{self, SystemAccess};

/// Run the install command.
///
/// Nothing on the host is touched unless the process is privileged, the
/// configuration loads, and the target user exists.
///
/// # Errors
///
/// Returns an error if a precondition fails, the configuration cannot be
/// loaded, or a task fails.
pub fn run(
    global: &GlobalOpts,
    opts: &InstallOpts,
    log: &Arc<Logger>,
    system: SystemAccess,
) -> Result<()> {
    log.info(&format!("provision {}", super::version::version()));

    let setup = CommandSetup::init(global, log.as_ref())?;
    if !system.accounts.is_privileged() {
        return Err(PreconditionError::NotPrivileged.into());
    }
    let ctx = setup.context(Arc::clone(log) as Arc<dyn Log>, global.dry_run, system)?;
    if ctx.dry_run {
        log.info("dry run: no changes will be applied");
    }

    let all_tasks = tasks::all_install_tasks();
    let selected = all_tasks
        .iter()
        .filter(|t| opts.selects(t.name()))
        .map(Box::as_ref);

    super::run_pipeline(selected, &ctx, log)
}
