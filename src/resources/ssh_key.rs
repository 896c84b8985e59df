//! Ed25519 key pair generated once for the target user.
use anyhow::Result;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::operations::FileSystemOps;

/// Private key (and its `.pub`) generated with `ssh-keygen`.
///
/// The private key path is the marker; an existing key is never replaced.
#[derive(Debug)]
pub struct SshKeyResource<'a> {
    /// Private key path.
    pub path: PathBuf,
    /// Key comment.
    pub comment: String,
    /// Account that runs `ssh-keygen` and owns the key.
    pub user: String,
    executor: &'a dyn Executor,
    fs: &'a dyn FileSystemOps,
}

impl<'a> SshKeyResource<'a> {
    /// Create a new SSH key resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        comment: String,
        user: String,
        executor: &'a dyn Executor,
        fs: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            path,
            comment,
            user,
            executor,
            fs,
        }
    }
}

impl Resource for SshKeyResource<'_> {
    fn description(&self) -> String {
        format!("ed25519 key {}", self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.exists(&self.path) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let path = self.path.to_string_lossy();
        self.executor.run_as(
            &self.user,
            "ssh-keygen",
            &["-t", "ed25519", "-C", &self.comment, "-f", &path, "-N", ""],
            &[],
        )?;
        Ok(ResourceChange::Applied)
    }
}
