//! Directory with a fixed mode and owner (e.g. `~/.ssh` at 700).
use anyhow::Result;
use std::path::PathBuf;

use super::{Owner, Resource, ResourceChange, ResourceState};
use crate::operations::FileSystemOps;

/// A directory that must exist with `mode` and belong to `owner`.
#[derive(Debug)]
pub struct DirectoryResource<'a> {
    /// Directory path.
    pub path: PathBuf,
    /// Permission bits (e.g. `0o700`).
    pub mode: u32,
    /// Owner applied on creation or repair.
    pub owner: Owner,
    fs: &'a dyn FileSystemOps,
}

impl<'a> DirectoryResource<'a> {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf, mode: u32, owner: Owner, fs: &'a dyn FileSystemOps) -> Self {
        Self {
            path,
            mode,
            owner,
            fs,
        }
    }
}

impl Resource for DirectoryResource<'_> {
    fn description(&self) -> String {
        format!("{:o} {}", self.mode, self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.fs.exists(&self.path) {
            return Ok(ResourceState::Missing);
        }
        if self.fs.is_symlink(&self.path) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a symlink", self.path.display()),
            });
        }
        if !self.fs.is_dir(&self.path) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} exists but is not a directory", self.path.display()),
            });
        }
        let current = self.fs.mode(&self.path)?;
        if current == self.mode {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("{current:o}"),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.fs.create_dir_all(&self.path)?;
        self.fs.set_mode(&self.path, self.mode)?;
        self.fs.chown(&self.path, self.owner.uid, self.owner.gid)?;
        Ok(ResourceChange::Applied)
    }
}
