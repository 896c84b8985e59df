//! Staged dotfile copied into the home directory with a timestamped backup.
use anyhow::{Context as _, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use super::{Owner, Resource, ResourceChange, ResourceState};
use crate::operations::FileSystemOps;

/// Timestamp format appended to backups (`.zshrc.bak.20240131093000`).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Path an existing `dest` is moved to before being overwritten.
#[must_use]
pub fn backup_path(dest: &Path, now: DateTime<Local>) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(format!(".bak.{}", now.format(BACKUP_TIMESTAMP_FORMAT)));
    PathBuf::from(name)
}

/// A dotfile copied from the staging directory.
#[derive(Debug)]
pub struct DotfileResource<'a> {
    /// Staged file.
    pub source: PathBuf,
    /// Location in the home directory.
    pub dest: PathBuf,
    /// Owner applied to the copy.
    pub owner: Owner,
    fs: &'a dyn FileSystemOps,
}

impl<'a> DotfileResource<'a> {
    /// Create a new dotfile resource.
    #[must_use]
    pub const fn new(
        source: PathBuf,
        dest: PathBuf,
        owner: Owner,
        fs: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            source,
            dest,
            owner,
            fs,
        }
    }
}

impl Resource for DotfileResource<'_> {
    fn description(&self) -> String {
        format!("{} → {}", self.source.display(), self.dest.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.fs.is_file(&self.source) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} not found in staging directory", self.source.display()),
            });
        }
        if !self.fs.exists(&self.dest) {
            return Ok(ResourceState::Missing);
        }
        if self.fs.is_symlink(&self.dest) {
            return Ok(ResourceState::Incorrect {
                current: "symlink".to_string(),
            });
        }
        if self.fs.is_dir(&self.dest) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a directory", self.dest.display()),
            });
        }
        let staged = self.fs.read(&self.source)?;
        let current = self.fs.read(&self.dest)?;
        if staged == current {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "contents differ".to_string(),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        // A symlinked destination is moved aside as a link, never written through.
        if self.fs.exists(&self.dest) {
            let backup = backup_path(&self.dest, Local::now());
            self.fs
                .rename(&self.dest, &backup)
                .with_context(|| format!("backing up {}", self.dest.display()))?;
            tracing::debug!("backed up {} to {}", self.dest.display(), backup.display());
        }
        self.fs.copy(&self.source, &self.dest)?;
        self.fs.chown(&self.dest, self.owner.uid, self.owner.gid)?;
        Ok(ResourceChange::Applied)
    }
}
