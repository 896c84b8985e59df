//! Task: install Oh My Zsh.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::resources::ResourceState;
use crate::resources::shell_framework::ShellFrameworkResource;

fn resource(ctx: &Context) -> ShellFrameworkResource<'_> {
    ShellFrameworkResource::new(
        ctx.oh_my_zsh_dir(),
        ctx.config.oh_my_zsh_installer_url.clone(),
        ctx.target.username.clone(),
        &*ctx.executor,
        &*ctx.fs_ops,
    )
}

/// Install Oh My Zsh for the target user.
#[derive(Debug)]
pub struct InstallShellFramework;

impl Task for InstallShellFramework {
    fn name(&self) -> &'static str {
        "Install Oh My Zsh"
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
