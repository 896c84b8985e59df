//! Task: install Miniconda.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::resources::ResourceState;
use crate::resources::conda::CondaInstallResource;

fn resource(ctx: &Context) -> CondaInstallResource<'_> {
    let config = &ctx.config;
    CondaInstallResource::new(
        config.conda_path.clone(),
        config.conda_installer_url.clone(),
        config.conda_init_path.clone(),
        &*ctx.executor,
        &*ctx.fs_ops,
        &*ctx.fetcher,
    )
}

/// Install Miniconda system-wide and expose it through a profile snippet.
#[derive(Debug)]
pub struct InstallConda;

impl Task for InstallConda {
    fn name(&self) -> &'static str {
        "Install Miniconda"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, std::iter::once(resource(ctx)), "install")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(std::iter::once(resource(ctx)))
    }
}
