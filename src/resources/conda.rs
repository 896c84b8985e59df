//! Miniconda install and the system-wide init snippet that exposes it.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::fetch::Fetcher;
use crate::operations::FileSystemOps;

/// A Miniconda installation at a fixed prefix.
///
/// The prefix directory is the install marker: if it exists nothing is
/// touched, not even the init snippet.
pub struct CondaInstallResource<'a> {
    /// Install prefix (e.g. `/opt/miniconda3`).
    pub prefix: PathBuf,
    /// Installer download URL.
    pub installer_url: String,
    /// Where the shell-init snippet is written.
    pub init_path: PathBuf,
    executor: &'a dyn Executor,
    fs: &'a dyn FileSystemOps,
    fetcher: &'a dyn Fetcher,
}

impl std::fmt::Debug for CondaInstallResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CondaInstallResource")
            .field("prefix", &self.prefix)
            .field("installer_url", &self.installer_url)
            .field("init_path", &self.init_path)
            .finish_non_exhaustive()
    }
}

impl<'a> CondaInstallResource<'a> {
    /// Create a new conda install resource.
    ///
    /// The installer is staged under a fresh random name in the system temp
    /// directory and removed once it has run.
    #[must_use]
    pub fn new(
        prefix: PathBuf,
        installer_url: String,
        init_path: PathBuf,
        executor: &'a dyn Executor,
        fs: &'a dyn FileSystemOps,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            prefix,
            installer_url,
            init_path,
            executor,
            fs,
            fetcher,
        }
    }

    fn run_installer(&self, installer: &Path) -> Result<()> {
        let installer = installer.to_string_lossy();
        let prefix = self.prefix.to_string_lossy();
        self.executor
            .run("bash", &[installer.as_ref(), "-b", "-p", prefix.as_ref()])?;
        Ok(())
    }
}

/// Contents of the shell-init snippet for a conda install at `prefix`.
#[must_use]
pub fn init_snippet(prefix: &Path) -> String {
    let prefix = prefix.display();
    format!(
        "# Miniconda, managed by provision\n\
         export PATH=\"{prefix}/bin:$PATH\"\n\
         if [ -f \"{prefix}/etc/profile.d/conda.sh\" ]; then\n\
         \x20   . \"{prefix}/etc/profile.d/conda.sh\"\n\
         fi\n"
    )
}

impl Resource for CondaInstallResource<'_> {
    fn description(&self) -> String {
        format!("miniconda → {}", self.prefix.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.exists(&self.prefix) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        // Exclusive create under a random name, mode 600.
        let staged = tempfile::Builder::new()
            .prefix("miniconda-")
            .suffix(".sh")
            .tempfile()
            .context("staging miniconda installer")?;
        self.fetcher
            .download(&self.installer_url, staged.path())
            .context("fetching miniconda installer")?;

        let installed = self.run_installer(staged.path());
        // The staged installer never outlives the attempt.
        let staged_path = staged.path().to_path_buf();
        if let Err(e) = staged.close() {
            tracing::warn!("could not remove {}: {e}", staged_path.display());
        }
        installed.context("running miniconda installer")?;

        if let Some(parent) = self.init_path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs
            .write(&self.init_path, &init_snippet(&self.prefix))
            .context("writing conda init snippet")?;
        self.fs.set_mode(&self.init_path, 0o644)?;
        Ok(ResourceChange::Applied)
    }
}
