//! System account lookup and process privilege checks.
//! System account database access.
//!
//! Resources never call into libc directly; they go through
//! [`AccountDatabase`] so tests can describe users without touching
//! `/etc/passwd`.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

/// One entry of the system account database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Home directory.
    pub home: PathBuf,
    /// Login shell.
    pub shell: PathBuf,
}

/// Lookup of accounts and of the current process's privilege.
pub trait AccountDatabase: Send + Sync + std::fmt::Debug {
    /// Look up `name`, returning `None` if no such user exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    fn lookup(&self, name: &str) -> Result<Option<Account>>;

    /// Whether the current process runs with an effective uid of 0.
    fn is_privileged(&self) -> bool;
}

/// [`AccountDatabase`] backed by `getpwnam(3)` through `nix`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAccountDatabase;

impl AccountDatabase for SystemAccountDatabase {
    fn lookup(&self, name: &str) -> Result<Option<Account>> {
        let user = nix::unistd::User::from_name(name)
            .with_context(|| format!("looking up user '{name}'"))?;
        Ok(user.map(|u| Account {
            name: u.name,
            uid: u.uid.as_raw(),
            gid: u.gid.as_raw(),
            home: u.dir,
            shell: u.shell,
        }))
    }

    fn is_privileged(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

/// In-memory [`AccountDatabase`] for tests.
///
/// Login shells can be changed after construction through
/// [`set_shell`](Self::set_shell), which is how fakes of `chsh` update it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockAccountDatabase {
    accounts: std::sync::Mutex<Vec<Account>>,
    privileged: bool,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockAccountDatabase {
    /// A privileged database containing a single account.
    #[must_use]
    pub fn with_user(name: &str, home: &str, shell: &str) -> Self {
        Self {
            accounts: std::sync::Mutex::new(vec![Account {
                name: name.to_string(),
                uid: 1000,
                gid: 1000,
                home: PathBuf::from(home),
                shell: PathBuf::from(shell),
            }]),
            privileged: true,
        }
    }

    /// Mark the current process as unprivileged.
    #[must_use]
    pub const fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    /// Replace the login shell of `name`.
    pub fn set_shell(&self, name: &str, shell: &str) {
        let mut accounts = self.accounts.lock().expect("mock accounts poisoned");
        if let Some(account) = accounts.iter_mut().find(|a| a.name == name) {
            account.shell = PathBuf::from(shell);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl AccountDatabase for MockAccountDatabase {
    fn lookup(&self, name: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .expect("mock accounts poisoned")
            .iter()
            .find(|a| a.name == name)
            .cloned())
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }
}
