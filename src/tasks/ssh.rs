//! Tasks: generate the SSH key and configure the GitHub host.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::resources::directory::DirectoryResource;
use crate::resources::ssh_config::SshConfigResource;
use crate::resources::ssh_key::SshKeyResource;
use crate::resources::{Resource, ResourceState};

/// Permission bits of `~/.ssh`.
const SSH_DIR_MODE: u32 = 0o700;

/// `~/.ssh` followed by the private key inside it.
fn key_resources(ctx: &Context) -> Vec<Box<dyn Resource + '_>> {
    vec![
        Box::new(DirectoryResource::new(
            ctx.ssh_dir(),
            SSH_DIR_MODE,
            ctx.target.owner,
            &*ctx.fs_ops,
        )),
        Box::new(SshKeyResource::new(
            ctx.config.ssh_key_path(&ctx.home()),
            ctx.config.ssh_email.clone(),
            ctx.target.username.clone(),
            &*ctx.executor,
            &*ctx.fs_ops,
        )),
    ]
}

fn host_resource(ctx: &Context) -> SshConfigResource<'_> {
    SshConfigResource::new(
        ctx.ssh_dir().join("config"),
        ctx.config.ssh_key_path(&ctx.home()),
        ctx.target.owner,
        &*ctx.fs_ops,
    )
}

/// Generate the user's GitHub key pair once.
#[derive(Debug)]
pub struct GenerateSshKey;

impl Task for GenerateSshKey {
    fn name(&self) -> &'static str {
        "Generate SSH key"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, key_resources(ctx), "create")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(key_resources(ctx))
    }
}

/// Point `github.com` at the generated key in `~/.ssh/config`.
#[derive(Debug)]
pub struct ConfigureSshHost;

impl Task for ConfigureSshHost {
    fn name(&self) -> &'static str {
        "Configure SSH host"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        process_resources(ctx, std::iter::once(host_resource(ctx)), "add")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(std::iter::once(host_resource(ctx)))
    }
}
