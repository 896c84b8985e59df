use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::accounts::{AccountDatabase, SystemAccountDatabase};
use crate::config::Config;
use crate::error::PreconditionError;
use crate::exec::{Executor, SystemExecutor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};
use crate::resources::Owner;

/// The injectable capabilities every task reaches the host through.
pub struct SystemAccess {
    /// External program runner.
    pub executor: Arc<dyn Executor>,
    /// Filesystem probes and mutations.
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Account database.
    pub accounts: Arc<dyn AccountDatabase>,
    /// Remote artifact download.
    pub fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for SystemAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemAccess")
            .field("executor", &self.executor)
            .field("fs_ops", &self.fs_ops)
            .field("accounts", &self.accounts)
            .field("fetcher", &"<dyn Fetcher>")
            .finish()
    }
}

impl SystemAccess {
    /// Access to the real host.
    #[must_use]
    pub fn host() -> Self {
        Self {
            executor: Arc::new(SystemExecutor),
            fs_ops: Arc::new(SystemFileSystemOps),
            accounts: Arc::new(SystemAccountDatabase),
            fetcher: Arc::new(HttpFetcher),
        }
    }
}

/// The user being provisioned, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Login name.
    pub username: String,
    /// Home directory.
    pub home: PathBuf,
    /// Owner applied to files created in the home directory.
    pub owner: Owner,
}

/// Shared context for task execution.
pub struct Context {
    /// Configuration for this run.
    pub config: Arc<Config>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Resolved target user.
    pub target: Target,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operation abstraction (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Account database (injectable for testing).
    pub accounts: Arc<dyn AccountDatabase>,
    /// Artifact downloader (injectable for testing).
    pub fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("target", &self.target)
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &"<dyn FileSystemOps>")
            .field("accounts", &"<dyn AccountDatabase>")
            .field("fetcher", &"<dyn Fetcher>")
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// The target user is looked up once; its home directory is taken from
    /// `config.home_dir` when set, otherwise from the account database.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionError::UnknownUser`] if the configured user does
    /// not exist, or an error if the account database cannot be queried.
    pub fn new(
        config: Arc<Config>,
        log: Arc<dyn Log>,
        dry_run: bool,
        system: SystemAccess,
    ) -> Result<Self> {
        let account = system
            .accounts
            .lookup(&config.username)?
            .ok_or_else(|| PreconditionError::UnknownUser(config.username.clone()))?;
        let home = config
            .home_dir
            .clone()
            .unwrap_or_else(|| account.home.clone());
        let target = Target {
            username: account.name.clone(),
            home,
            owner: Owner::from(&account),
        };

        Ok(Self {
            config,
            log,
            dry_run,
            target,
            executor: system.executor,
            fs_ops: system.fs_ops,
            accounts: system.accounts,
            fetcher: system.fetcher,
        })
    }

    /// Target user's home directory.
    #[must_use]
    pub fn home(&self) -> PathBuf {
        self.target.home.clone()
    }

    /// `~/.ssh`.
    #[must_use]
    pub fn ssh_dir(&self) -> PathBuf {
        self.target.home.join(".ssh")
    }

    /// `~/.oh-my-zsh`.
    #[must_use]
    pub fn oh_my_zsh_dir(&self) -> PathBuf {
        self.target.home.join(".oh-my-zsh")
    }

    /// Checkout directory of the prompt theme inside the Oh My Zsh tree.
    #[must_use]
    pub fn theme_dir(&self) -> PathBuf {
        self.oh_my_zsh_dir()
            .join("custom")
            .join("themes")
            .join("powerlevel10k")
    }
}
