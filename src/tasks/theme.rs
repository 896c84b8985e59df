//! Task: install the Powerlevel10k theme.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resource_states};
use crate::resources::theme::ThemeRepoResource;
use crate::resources::{Resource as _, ResourceState};

fn resource(ctx: &Context) -> ThemeRepoResource<'_> {
    ThemeRepoResource::new(
        ctx.theme_dir(),
        ctx.config.theme_repo_url.clone(),
        ctx.target.username.clone(),
        &*ctx.executor,
        &*ctx.fs_ops,
    )
}

/// Clone the Powerlevel10k theme, or fast-forward an existing checkout.
#[derive(Debug)]
pub struct InstallPromptTheme;

impl Task for InstallPromptTheme {
    fn name(&self) -> &'static str {
        "Install Powerlevel10k"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resource = resource(ctx);
        let state = resource.current_state()?;
        if state != ResourceState::Correct {
            return process_resource_states(ctx, std::iter::once((resource, state)), "clone");
        }

        let desc = resource.description();
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would update: {desc}"));
            return Ok(TaskResult::DryRun);
        }
        // A stale checkout still works, so a failed pull only warns.
        match resource.pull()? {
            None => ctx.log.info(&format!("updated: {desc}")),
            Some(detail) => ctx.log.warn(&format!("could not update {desc}: {detail}")),
        }
        Ok(TaskResult::Ok)
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(std::iter::once(resource(ctx)))
    }
}
