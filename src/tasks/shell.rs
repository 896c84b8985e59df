//! Task: set the default login shell.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::resources::ResourceState;
use crate::resources::shell::DefaultShellResource;

const TARGET_SHELL: &str = "zsh";

fn resource(ctx: &Context) -> DefaultShellResource<'_> {
    DefaultShellResource::new(
        ctx.target.username.clone(),
        TARGET_SHELL.to_string(),
        &*ctx.executor,
        &*ctx.accounts,
    )
}

/// Make zsh the target user's login shell.
#[derive(Debug)]
pub struct SetDefaultShell;

impl Task for SetDefaultShell {
    fn name(&self) -> &'static str {
        "Set default shell"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, std::iter::once(resource(ctx)), "change")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(std::iter::once(resource(ctx)))
    }
}
