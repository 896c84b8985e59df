//! Package installation resource.
use std::collections::HashSet;

use anyhow::Result;

use super::{Resource, ResourceChange, ResourceState};
use crate::error::PreconditionError;
use crate::exec::Executor;

/// Supported package managers, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian/Ubuntu.
    Apt,
    /// Fedora/RHEL 8+.
    Dnf,
    /// Older RHEL/CentOS.
    Yum,
    /// Arch Linux.
    Pacman,
    /// openSUSE.
    Zypper,
    /// Alpine.
    Apk,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

impl PackageManager {
    /// Detection order: the first manager found on `PATH` wins.
    pub const PRIORITY: [Self; 6] = [
        Self::Apt,
        Self::Dnf,
        Self::Yum,
        Self::Pacman,
        Self::Zypper,
        Self::Apk,
    ];

    /// Executable name.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
            Self::Apk => "apk",
        }
    }

    /// Detect the package manager from [`PackageManager::PRIORITY`].
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionError::NoPackageManager`] if none is on `PATH`.
    pub fn detect(executor: &dyn Executor) -> Result<Self, PreconditionError> {
        Self::PRIORITY
            .into_iter()
            .find(|m| executor.which(m.program()))
            .ok_or_else(|| PreconditionError::NoPackageManager {
                tried: Self::PRIORITY
                    .iter()
                    .map(|m| m.program())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Arguments that refresh the package index, if the manager needs it
    /// before installing.
    #[must_use]
    pub const fn refresh_args(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Apt => Some(&["update"]),
            Self::Zypper => Some(&["--non-interactive", "refresh"]),
            Self::Apk => Some(&["update"]),
            Self::Dnf | Self::Yum | Self::Pacman => None,
        }
    }

    /// Non-interactive install arguments; the package name is appended.
    #[must_use]
    pub const fn install_args(self) -> &'static [&'static str] {
        match self {
            Self::Apt | Self::Dnf | Self::Yum => &["install", "-y"],
            Self::Pacman => &["-S", "--noconfirm", "--needed"],
            Self::Zypper => &["--non-interactive", "install"],
            Self::Apk => &["add", "--no-cache"],
        }
    }

    /// Environment for every invocation of the manager.
    #[must_use]
    pub const fn env(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Apt => &[("DEBIAN_FRONTEND", "noninteractive")],
            _ => &[],
        }
    }

    /// Command listing installed packages.
    const fn query(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Apt => ("dpkg-query", &["-W", "-f=${db:Status-Abbrev} ${Package}\n"]),
            Self::Dnf | Self::Yum | Self::Zypper => ("rpm", &["-qa", "--qf", "%{NAME}\n"]),
            Self::Pacman => ("pacman", &["-Qq"]),
            Self::Apk => ("apk", &["info"]),
        }
    }

    /// Refresh the package index (no-op for managers that do not need it).
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh command exits non-zero.
    pub fn refresh(self, executor: &dyn Executor) -> Result<()> {
        if let Some(args) = self.refresh_args() {
            executor.run_with_env(self.program(), args, self.env())?;
        }
        Ok(())
    }
}

/// A system package resource that can be checked and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    /// Package manager to use.
    pub manager: PackageManager,
    /// Executor for running package manager commands.
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            manager,
            executor,
        }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query the full set of installed package names for a given manager.
///
/// Runs a **single** command regardless of how many packages need to be
/// checked. A failing query yields an empty set, so every package is
/// treated as missing and handed to the (idempotent) installer.
///
/// # Errors
///
/// Returns an error if the query command cannot be spawned.
pub fn get_installed_packages(
    manager: PackageManager,
    executor: &dyn Executor,
) -> Result<HashSet<String>> {
    let (program, args) = manager.query();
    let result = executor.run_unchecked(program, args)?;
    if !result.success {
        return Ok(HashSet::new());
    }
    let installed = match manager {
        // "ii name" for installed; "rc name" etc. for removed-with-config.
        PackageManager::Apt => result
            .stdout
            .lines()
            .filter_map(|line| line.strip_prefix("ii "))
            .map(|name| name.trim().to_string())
            .collect(),
        _ => result
            .stdout
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(ToString::to_string)
            .collect(),
    };
    Ok(installed)
}

impl Resource for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.manager)
    }

    fn current_state(&self) -> Result<ResourceState> {
        let installed = get_installed_packages(self.manager, self.executor)?;
        Ok(self.state_from_installed(&installed))
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut args: Vec<&str> = self.manager.install_args().to_vec();
        args.push(&self.name);
        self.executor
            .run_with_env(self.manager.program(), &args, self.manager.env())?;
        Ok(ResourceChange::Applied)
    }
}
