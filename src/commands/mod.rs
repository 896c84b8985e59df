//! Top-level subcommand orchestration (`install`, `status`, `version`).
pub mod install;
pub mod status;
pub mod version;

use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::logging::{Log, Logger};
use crate::tasks::{self, Context, SystemAccess, Task};

/// Shared state produced by the common command setup sequence.
///
/// Loads and validates the configuration once so that each command does not
/// have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Configuration for this run.
    pub config: Arc<Config>,
}

impl CommandSetup {
    /// Load the configuration and report any validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        log.stage("Loading configuration");
        let config = Config::load(global.config.as_deref())?;

        log.debug(&format!("{} packages", config.packages.len()));
        log.debug(&format!("{} dotfiles", config.dotfile_list.len()));
        log.debug(&format!(
            "staging directory: {}",
            config.dotfiles_dir.display()
        ));
        log.info(&format!(
            "user {}, shell customization: {}",
            config.username, config.shell_customization
        ));

        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Resolve the target user and build the task context.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured user does not exist.
    pub fn context(
        &self,
        log: Arc<dyn Log>,
        dry_run: bool,
        system: SystemAccess,
    ) -> Result<Context> {
        Context::new(Arc::clone(&self.config), log, dry_run, system)
    }
}

/// Execute tasks in order, stopping at the first failure, then print the
/// summary.
///
/// # Errors
///
/// Returns the error of the first task that failed.
pub fn run_pipeline<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    let result = tasks
        .into_iter()
        .try_for_each(|task| tasks::execute(task, ctx));
    log.print_summary();
    result
}
