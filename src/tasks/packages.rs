//! Task: install system packages.
use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult, process_resource_states};
use crate::resources::{Resource as _, ResourceState};
use crate::resources::package::{PackageManager, PackageResource, get_installed_packages};

/// Package that only exists (and is only needed) on Debian-family hosts.
const APT_BUILD_TOOLS: &str = "build-essential";

/// Configured package names for `manager`, plus the build toolchain on apt.
fn package_list(ctx: &Context, manager: PackageManager) -> Vec<String> {
    let mut names = ctx.config.packages.clone();
    if manager == PackageManager::Apt && !names.iter().any(|n| n == APT_BUILD_TOOLS) {
        names.push(APT_BUILD_TOOLS.to_string());
    }
    names
}

/// Batch-check every package with a single query.
///
/// Queries all installed packages **once**, then derives each package's
/// state from the result instead of spawning a per-package query.
fn package_states<'a>(
    ctx: &'a Context,
    manager: PackageManager,
) -> Result<Vec<(PackageResource<'a>, ResourceState)>> {
    let names = package_list(ctx, manager);
    ctx.log.debug(&format!(
        "batch-checking {} packages with a single query",
        names.len()
    ));
    let installed = get_installed_packages(manager, &*ctx.executor)?;
    Ok(names
        .into_iter()
        .map(|name| {
            let resource = PackageResource::new(name, manager, &*ctx.executor);
            let state = resource.state_from_installed(&installed);
            (resource, state)
        })
        .collect())
}

/// Install system packages through the detected package manager.
#[derive(Debug)]
pub struct InstallPackages;

impl Task for InstallPackages {
    fn name(&self) -> &'static str {
        "Install packages"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let manager = PackageManager::detect(&*ctx.executor)?;
        ctx.log.debug(&format!("using {manager} package manager"));

        let states = package_states(ctx, manager)?;
        if states.is_empty() {
            return Ok(TaskResult::Skipped("no packages configured".to_string()));
        }

        let missing = states
            .iter()
            .filter(|(_, state)| *state == ResourceState::Missing)
            .count();
        if missing > 0 && manager.refresh_args().is_some() {
            if ctx.dry_run {
                ctx.log
                    .dry_run(&format!("would refresh {manager} package index"));
            } else {
                ctx.log.debug(&format!(
                    "{missing} packages missing, refreshing {manager} package index"
                ));
                manager
                    .refresh(&*ctx.executor)
                    .context("refreshing package index")?;
            }
        }

        process_resource_states(ctx, states, "install")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        let manager = PackageManager::detect(&*ctx.executor)?;
        Ok(package_states(ctx, manager)?
            .into_iter()
            .map(|(resource, state)| (resource.description(), state))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{PreconditionError, exit_code};
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::TestSystem;

    fn config_with(packages: &[&str]) -> Config {
        Config {
            packages: packages.iter().map(ToString::to_string).collect(),
            ..Config::default()
        }
    }

    #[test]
    fn no_package_manager_is_a_precondition_error() {
        let system = TestSystem::new();
        let err = InstallPackages.run(&system.context()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreconditionError>(),
            Some(PreconditionError::NoPackageManager { .. })
        ));
        assert_eq!(exit_code(&err), 1);
        assert!(system.executor.calls().is_empty());
    }

    #[test]
    fn apt_refreshes_then_installs_missing_packages() {
        let exec = MockExecutor::with_responses(vec![(true, "ii  git\nrc  zsh\n".to_string())])
            .with_which(&["apt-get"]);
        let system = TestSystem::new()
            .with_config(config_with(&["git", "zsh"]))
            .with_executor(exec);

        let result = InstallPackages.run(&system.context()).unwrap();
        assert!(matches!(result, TaskResult::Ok));

        let calls = system.executor.calls();
        assert!(calls[0].starts_with("dpkg-query"));
        assert_eq!(
            &calls[1..],
            &[
                "apt-get update",
                "apt-get install -y zsh",
                "apt-get install -y build-essential",
            ]
        );
    }

    #[test]
    fn build_essential_is_not_added_twice() {
        let exec = MockExecutor::new().with_which(&["apt-get"]);
        let system = TestSystem::new()
            .with_config(config_with(&["build-essential"]))
            .with_executor(exec);
        let ctx = system.context();
        let states = package_states(&ctx, PackageManager::Apt).unwrap();
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn everything_installed_runs_only_the_query() {
        let exec = MockExecutor::with_responses(vec![(true, "git\nzsh\n".to_string())])
            .with_which(&["pacman"]);
        let system = TestSystem::new()
            .with_config(config_with(&["git", "zsh"]))
            .with_executor(exec);

        InstallPackages.run(&system.context()).unwrap();
        assert_eq!(system.executor.calls(), vec!["pacman -Qq"]);
    }

    #[test]
    fn pacman_installs_without_refresh() {
        let exec = MockExecutor::with_responses(vec![(true, "git\n".to_string())])
            .with_which(&["pacman"]);
        let system = TestSystem::new()
            .with_config(config_with(&["git", "tmux"]))
            .with_executor(exec);

        InstallPackages.run(&system.context()).unwrap();
        assert_eq!(
            system.executor.calls(),
            vec!["pacman -Qq", "pacman -S --noconfirm --needed tmux"]
        );
    }

    #[test]
    fn dry_run_only_queries() {
        let exec = MockExecutor::new().with_which(&["apt-get"]);
        let system = TestSystem::new()
            .with_config(config_with(&["git"]))
            .with_executor(exec);

        let result = InstallPackages.run(&system.dry_run_context()).unwrap();
        assert!(matches!(result, TaskResult::DryRun));
        let calls = system.executor.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("dpkg-query"));
    }

    #[test]
    fn failed_install_carries_exit_status() {
        let exec = MockExecutor::new()
            .with_which(&["dnf"])
            .fail_on("install -y htop", 7);
        let system = TestSystem::new()
            .with_config(config_with(&["htop", "vim"]))
            .with_executor(exec);

        let err = InstallPackages.run(&system.context()).unwrap_err();
        assert_eq!(exit_code(&err), 7);
        // vim is never attempted after the first failure
        assert!(
            !system
                .executor
                .calls()
                .iter()
                .any(|c| c.contains("install -y vim"))
        );
    }

    #[test]
    fn empty_list_on_non_apt_is_skipped() {
        let exec = MockExecutor::new().with_which(&["apk"]);
        let system = TestSystem::new()
            .with_config(config_with(&[]))
            .with_executor(exec);
        let result = InstallPackages.run(&system.context()).unwrap();
        assert!(matches!(result, TaskResult::Skipped(_)));
    }

    #[test]
    fn inspect_reports_each_package() {
        let exec = MockExecutor::with_responses(vec![(true, "git\n".to_string())])
            .with_which(&["pacman"]);
        let system = TestSystem::new()
            .with_config(config_with(&["git", "tmux"]))
            .with_executor(exec);

        let report = InstallPackages.inspect(&system.context()).unwrap();
        assert_eq!(
            report,
            vec![
                ("git (pacman)".to_string(), ResourceState::Correct),
                ("tmux (pacman)".to_string(), ResourceState::Missing),
            ]
        );
    }
}
