//! Idempotent resource primitives (check + apply pattern).
pub mod conda;
pub mod directory;
pub mod dotfile;
pub mod error;
pub mod package;
pub mod shell;
pub mod shell_framework;
pub mod ssh_config;
pub mod ssh_key;
pub mod theme;
pub mod theme_line;

use anyhow::Result;

use crate::accounts::Account;

/// State of a resource (file, directory, account attribute, etc.).
///
/// # Examples
///
/// ```
/// use provision_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "/bin/bash".into() };
/// let skip = ResourceState::Invalid { reason: "source missing".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be applied (e.g., the staged source is missing).
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying a resource change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or updated.
    Applied,
}

/// Unified interface for resources that can be checked and applied.
///
/// Every provisioning step is built from resources: `current_state()` probes
/// the marker (directory, file, file content, account attribute) and
/// `apply()` performs the change. `apply()` is only ever called when the
/// state is [`ResourceState::Missing`] or [`ResourceState::Incorrect`].
pub trait Resource {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined due to I/O failures,
    /// permission issues, or a failed probe command.
    fn current_state(&self) -> Result<ResourceState>;

    /// Apply the resource change.
    ///
    /// # Errors
    ///
    /// Returns an error if an external command exits non-zero or a file
    /// operation fails.
    fn apply(&self) -> Result<ResourceChange>;

    /// Whether the resource is already in its desired state.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Resource::current_state`].
    fn is_satisfied(&self) -> Result<bool> {
        Ok(self.current_state()? == ResourceState::Correct)
    }

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Resource::current_state`].
    fn needs_change(&self) -> Result<bool> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Missing | ResourceState::Incorrect { .. }
        ))
    }
}

impl<R: Resource + ?Sized> Resource for Box<R> {
    fn description(&self) -> String {
        (**self).description()
    }

    fn current_state(&self) -> Result<ResourceState> {
        (**self).current_state()
    }

    fn apply(&self) -> Result<ResourceChange> {
        (**self).apply()
    }
}

/// Numeric owner applied to files created on behalf of the target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

impl From<&Account> for Owner {
    fn from(account: &Account) -> Self {
        Self {
            uid: account.uid,
            gid: account.gid,
        }
    }
}
