//! Prompt theme checked out from git into the Oh My Zsh custom themes dir.
use anyhow::Result;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// A shallow git checkout of the prompt theme, owned by the target user.
#[derive(Debug)]
pub struct ThemeRepoResource<'a> {
    /// Checkout directory.
    pub dir: PathBuf,
    /// Repository URL.
    pub repo_url: String,
    /// Account that owns the checkout.
    pub user: String,
    executor: &'a dyn Executor,
    fs: &'a dyn FileSystemOps,
}

impl<'a> ThemeRepoResource<'a> {
    /// Create a new theme repository resource.
    #[must_use]
    pub const fn new(
        dir: PathBuf,
        repo_url: String,
        user: String,
        executor: &'a dyn Executor,
        fs: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            dir,
            repo_url,
            user,
            executor,
            fs,
        }
    }

    /// Fast-forward an existing checkout.
    ///
    /// A failed pull is not an error: the stale checkout still works. The
    /// failure detail is returned so the caller can warn about it.
    ///
    /// # Errors
    ///
    /// Returns an error only if `git` could not be spawned.
    pub fn pull(&self) -> Result<Option<String>> {
        let dir = self.dir.to_string_lossy();
        let result =
            self.executor
                .run_as_unchecked(&self.user, "git", &["-C", &dir, "pull", "--ff-only"])?;
        if result.success {
            Ok(None)
        } else {
            let detail = if result.stderr.trim().is_empty() {
                format!("exit {}", result.code.unwrap_or(-1))
            } else {
                result.stderr.trim().to_string()
            };
            Ok(Some(detail))
        }
    }
}

impl Resource for ThemeRepoResource<'_> {
    fn description(&self) -> String {
        format!("{} → {}", self.repo_url, self.dir.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.is_dir(&self.dir) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let dir = self.dir.to_string_lossy();
        self.executor.run_as(
            &self.user,
            "git",
            &["clone", "--depth=1", &self.repo_url, &dir],
            &[],
        )?;
        Ok(ResourceChange::Applied)
    }
}
