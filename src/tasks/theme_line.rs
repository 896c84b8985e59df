//! Task: set the prompt theme in `.zshrc`.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::config::ShellCustomization;
use crate::resources::ResourceState;
use crate::resources::theme_line::ThemeLineResource;

fn resource(ctx: &Context) -> ThemeLineResource<'_> {
    ThemeLineResource::new(ctx.home().join(".zshrc"), &*ctx.fs_ops)
}

/// Point the existing `.zshrc` at the Powerlevel10k theme.
#[derive(Debug)]
pub struct SetPromptTheme;

impl Task for SetPromptTheme {
    fn name(&self) -> &'static str {
        "Set prompt theme"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.shell_customization == ShellCustomization::ThemeLine
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, std::iter::once(resource(ctx)), "set")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(std::iter::once(resource(ctx)))
    }
}
