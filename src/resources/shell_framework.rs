//! Oh My Zsh, installed unattended as the target user.
use anyhow::Result;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// Environment that stops the installer from launching zsh or calling `chsh`.
pub const INSTALLER_ENV: &[(&str, &str)] = &[("RUNZSH", "no"), ("CHSH", "no")];

/// An Oh My Zsh checkout in the user's home directory.
#[derive(Debug)]
pub struct ShellFrameworkResource<'a> {
    /// Install directory (`~/.oh-my-zsh`).
    pub dir: PathBuf,
    /// Installer script URL.
    pub installer_url: String,
    /// Account the installer runs as.
    pub user: String,
    executor: &'a dyn Executor,
    fs: &'a dyn FileSystemOps,
}

impl<'a> ShellFrameworkResource<'a> {
    /// Create a new shell framework resource.
    #[must_use]
    pub const fn new(
        dir: PathBuf,
        installer_url: String,
        user: String,
        executor: &'a dyn Executor,
        fs: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            dir,
            installer_url,
            user,
            executor,
            fs,
        }
    }

    /// Shell command line that fetches and runs the installer.
    #[must_use]
    pub fn install_script(&self) -> String {
        format!(
            "sh -c \"$(curl -fsSL {})\" \"\" --unattended",
            self.installer_url
        )
    }
}

impl Resource for ShellFrameworkResource<'_> {
    fn description(&self) -> String {
        format!("oh-my-zsh → {}", self.dir.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.is_dir(&self.dir) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let script = self.install_script();
        self.executor
            .run_as(&self.user, "sh", &["-c", &script], INSTALLER_ENV)?;
        Ok(ResourceChange::Applied)
    }
}
