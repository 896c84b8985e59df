//! A user's login shell in the account database.
use anyhow::Result;

use super::{Resource, ResourceChange, ResourceState};
use crate::accounts::AccountDatabase;
use crate::error::PreconditionError;
use crate::exec::Executor;

/// The login shell recorded for a user in the account database.
#[derive(Debug)]
pub struct DefaultShellResource<'a> {
    /// Account whose shell is changed.
    user: String,
    /// Target shell name (e.g., "zsh").
    target_shell: String,
    /// Executor for running system commands.
    executor: &'a dyn Executor,
    /// Source of the current login shell.
    accounts: &'a dyn AccountDatabase,
}

impl<'a> DefaultShellResource<'a> {
    /// Create a new default shell resource.
    #[must_use]
    pub const fn new(
        user: String,
        target_shell: String,
        executor: &'a dyn Executor,
        accounts: &'a dyn AccountDatabase,
    ) -> Self {
        Self {
            user,
            target_shell,
            executor,
            accounts,
        }
    }
}

impl Resource for DefaultShellResource<'_> {
    fn description(&self) -> String {
        format!("default shell of {} → {}", self.user, self.target_shell)
    }

    fn current_state(&self) -> Result<ResourceState> {
        let account = self
            .accounts
            .lookup(&self.user)?
            .ok_or_else(|| PreconditionError::UnknownUser(self.user.clone()))?;
        let current = account.shell.to_string_lossy().into_owned();

        if current.contains(&self.target_shell) {
            Ok(ResourceState::Correct)
        } else if current.is_empty() {
            Ok(ResourceState::Missing)
        } else {
            Ok(ResourceState::Incorrect { current })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let shell_path = self
            .executor
            .resolve(&self.target_shell)
            .ok_or_else(|| anyhow::anyhow!("{} not found on PATH", self.target_shell))?;
        let shell_path = shell_path.to_string_lossy();
        self.executor
            .run("chsh", &["-s", shell_path.as_ref(), &self.user])?;
        Ok(ResourceChange::Applied)
    }
}
