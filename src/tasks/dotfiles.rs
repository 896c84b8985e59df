//! Task: copy staged dotfiles into the home directory.
use anyhow::Result;

use super::{Context, Task, TaskResult, inspect_resources, process_resources};
use crate::config::ShellCustomization;
use crate::resources::ResourceState;
use crate::resources::dotfile::DotfileResource;

/// One resource per configured dotfile, staged file to home directory.
fn resources(ctx: &Context) -> impl Iterator<Item = DotfileResource<'_>> {
    let home = ctx.home();
    ctx.config.dotfile_list.iter().map(move |name| {
        DotfileResource::new(
            ctx.config.dotfiles_dir.join(name),
            home.join(name),
            ctx.target.owner,
            &*ctx.fs_ops,
        )
    })
}

/// Copy staged dotfiles into the home directory, backing up what they replace.
#[derive(Debug)]
pub struct CopyDotfiles;

impl Task for CopyDotfiles {
    fn name(&self) -> &'static str {
        "Copy dotfiles"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.shell_customization == ShellCustomization::Dotfiles
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.config.dotfile_list.is_empty() {
            return Ok(TaskResult::Skipped("no dotfiles configured".to_string()));
        }
        ctx.log.debug(&format!(
            "staging directory: {}",
            ctx.config.dotfiles_dir.display()
        ));
        process_resources(ctx, resources(ctx), "copy")
    }

    fn inspect(&self, ctx: &Context) -> Result<Vec<(String, ResourceState)>> {
        inspect_resources(resources(ctx))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::operations::MockFileSystemOps;
    use crate::tasks::test_helpers::TestSystem;
    use std::path::{Path, PathBuf};

    fn config(names: &[&str]) -> Config {
        Config {
            dotfiles_dir: PathBuf::from("/srv/dotfiles"),
            dotfile_list: names.iter().map(ToString::to_string).collect(),
            ..Config::default()
        }
    }

    #[test]
    fn copies_new_and_backs_up_changed_files() {
        let fs = MockFileSystemOps::new()
            .with_file("/srv/dotfiles/.zshrc", "new zshrc")
            .with_file("/srv/dotfiles/.vimrc", "set number")
            .with_file("/home/dev/.zshrc", "old zshrc");
        let system = TestSystem::new()
            .with_config(config(&[".zshrc", ".vimrc"]))
            .with_fs(fs);

        CopyDotfiles.run(&system.context()).unwrap();

        assert_eq!(
            system.fs.contents(Path::new("/home/dev/.zshrc")).as_deref(),
            Some("new zshrc")
        );
        assert_eq!(
            system.fs.contents(Path::new("/home/dev/.vimrc")).as_deref(),
            Some("set number")
        );
        let backups: Vec<PathBuf> = system
            .fs
            .paths()
            .into_iter()
            .filter(|p| p.to_string_lossy().starts_with("/home/dev/.zshrc.bak."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            system.fs.contents(&backups[0]).as_deref(),
            Some("old zshrc")
        );
        assert_eq!(
            system.fs.owner_of(Path::new("/home/dev/.vimrc")),
            Some((1000, 1000))
        );
    }

    #[test]
    fn missing_source_is_skipped_and_others_still_copied() {
        let fs = MockFileSystemOps::new().with_file("/srv/dotfiles/.vimrc", "set number");
        let system = TestSystem::new()
            .with_config(config(&[".p10k.zsh", ".vimrc"]))
            .with_fs(fs);

        let result = CopyDotfiles.run(&system.context()).unwrap();
        assert!(matches!(result, TaskResult::Ok));
        assert!(system.fs.contents(Path::new("/home/dev/.vimrc")).is_some());
        assert!(system.fs.contents(Path::new("/home/dev/.p10k.zsh")).is_none());
    }

    #[test]
    fn identical_files_are_untouched() {
        let fs = MockFileSystemOps::new()
            .with_file("/srv/dotfiles/.tmux.conf", "set -g mouse on\n")
            .with_file("/home/dev/.tmux.conf", "set -g mouse on\n");
        let system = TestSystem::new()
            .with_config(config(&[".tmux.conf"]))
            .with_fs(fs);

        CopyDotfiles.run(&system.context()).unwrap();
        assert!(system.fs.mutations().is_empty());
    }

    #[test]
    fn dry_run_copies_nothing() {
        let fs = MockFileSystemOps::new().with_file("/srv/dotfiles/.zshrc", "x");
        let system = TestSystem::new()
            .with_config(config(&[".zshrc"]))
            .with_fs(fs);

        let result = CopyDotfiles.run(&system.dry_run_context()).unwrap();
        assert!(matches!(result, TaskResult::DryRun));
        assert!(system.fs.mutations().is_empty());
    }

    #[test]
    fn empty_list_is_skipped() {
        let system = TestSystem::new().with_config(config(&[]));
        let result = CopyDotfiles.run(&system.context()).unwrap();
        assert!(matches!(result, TaskResult::Skipped(_)));
    }

    #[test]
    fn inspect_lists_every_configured_file() {
        let fs = MockFileSystemOps::new().with_file("/srv/dotfiles/.zshrc", "x");
        let system = TestSystem::new()
            .with_config(config(&[".zshrc", ".gitconfig"]))
            .with_fs(fs);

        let report = CopyDotfiles.inspect(&system.context()).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].1, ResourceState::Missing);
        assert!(matches!(report[1].1, ResourceState::Invalid { .. }));
    }
}
