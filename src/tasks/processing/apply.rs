//! Single-resource processing: check state, apply one resource.

use anyhow::Result;

use super::TaskStats;
use super::context::Context;
use crate::resources::{Resource, ResourceChange, ResourceState};

/// Process a single resource given its current state, returning a stats delta.
pub(super) fn process_single<R: Resource>(
    ctx: &Context,
    resource: &R,
    resource_state: ResourceState,
    verb: &str,
) -> Result<TaskStats> {
    let desc = resource.description();
    ctx.log
        .debug(&format!("check {desc}: {resource_state:?}"));
    let mut delta = TaskStats::new();
    match resource_state {
        ResourceState::Correct => {
            ctx.log.debug(&format!("ok: {desc}"));
            delta.already_ok += 1;
        }
        ResourceState::Invalid { reason } => {
            ctx.log.info(&format!("skipping {desc}: {reason}"));
            delta.skipped += 1;
        }
        resource_state @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if ctx.dry_run {
                let msg = if let ResourceState::Incorrect { ref current } = resource_state {
                    format!("would {verb} {desc} (currently {current})")
                } else {
                    format!("would {verb}: {desc}")
                };
                ctx.log.dry_run(&msg);
                delta.changed += 1;
                return Ok(delta);
            }
            delta += apply_resource(ctx, resource, verb)?;
        }
    }
    Ok(delta)
}

/// Apply a single resource change, returning a stats delta.
pub(super) fn apply_resource<R: Resource>(
    ctx: &Context,
    resource: &R,
    verb: &str,
) -> Result<TaskStats> {
    let ResourceChange::Applied = resource.apply()?;
    ctx.log
        .info(&format!("{verb}: {}", resource.description()));
    let mut delta = TaskStats::new();
    delta.changed += 1;
    Ok(delta)
}
