//! `Host github.com` block in the user's `~/.ssh/config`.
use anyhow::Result;
use std::path::PathBuf;

use super::{Owner, Resource, ResourceChange, ResourceState};
use crate::operations::FileSystemOps;

/// Host alias and hostname of the managed block.
pub const GITHUB_HOST: &str = "github.com";

/// Whether `contents` has a `Host` line naming `host`.
///
/// The `Host` keyword matches case-insensitively, as `ssh_config(5)` does;
/// patterns are compared literally.
#[must_use]
pub fn has_host_entry(contents: &str, host: &str) -> bool {
    contents.lines().any(|line| {
        let mut words = line.split_whitespace();
        words
            .next()
            .is_some_and(|keyword| keyword.eq_ignore_ascii_case("host"))
            && words.any(|pattern| pattern == host)
    })
}

/// Render the block appended for `identity_file`.
#[must_use]
pub fn host_block(identity_file: &str) -> String {
    format!(
        "Host {GITHUB_HOST}\n  HostName {GITHUB_HOST}\n  User git\n  IdentityFile {identity_file}\n  IdentitiesOnly yes\n"
    )
}

/// SSH client configuration entry pointing GitHub at the generated key.
#[derive(Debug)]
pub struct SshConfigResource<'a> {
    /// `~/.ssh/config`.
    pub path: PathBuf,
    /// Private key used for the host.
    pub identity_file: PathBuf,
    /// Owner applied after writing.
    pub owner: Owner,
    fs: &'a dyn FileSystemOps,
}

impl<'a> SshConfigResource<'a> {
    /// Create a new SSH config entry resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        identity_file: PathBuf,
        owner: Owner,
        fs: &'a dyn FileSystemOps,
    ) -> Self {
        Self {
            path,
            identity_file,
            owner,
            fs,
        }
    }
}

impl Resource for SshConfigResource<'_> {
    fn description(&self) -> String {
        format!("Host {GITHUB_HOST} in {}", self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let linked = std::iter::once(self.path.as_path())
            .chain(self.path.parent())
            .find(|p| self.fs.is_symlink(p));
        if let Some(link) = linked {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a symlink", link.display()),
            });
        }
        if !self.fs.exists(&self.path) {
            return Ok(ResourceState::Missing);
        }
        let contents = self.fs.read_to_string(&self.path)?;
        if has_host_entry(&contents, GITHUB_HOST) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("no Host {GITHUB_HOST} entry"),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let existing = if self.fs.exists(&self.path) {
            self.fs.read_to_string(&self.path)?
        } else {
            String::new()
        };
        let mut block = String::new();
        if !existing.is_empty() {
            if !existing.ends_with('\n') {
                block.push('\n');
            }
            block.push('\n');
        }
        block.push_str(&host_block(&self.identity_file.to_string_lossy()));

        self.fs.append(&self.path, &block)?;
        self.fs.set_mode(&self.path, 0o600)?;
        self.fs.chown(&self.path, self.owner.uid, self.owner.gid)?;
        Ok(ResourceChange::Applied)
    }
}
