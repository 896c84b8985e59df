//! `ZSH_THEME=` line of an existing `.zshrc`.
use anyhow::Result;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::operations::FileSystemOps;

/// Line selecting the Powerlevel10k prompt.
pub const THEME_LINE: &str = "ZSH_THEME=\"powerlevel10k/powerlevel10k\"";

const THEME_KEY: &str = "ZSH_THEME=";

/// Rewrite every `ZSH_THEME=` line of `contents` to [`THEME_LINE`], appending
/// one if none exists.
///
/// Every line keeps its original ending (`\n`, `\r\n` or none); an appended
/// line uses the file's style.
#[must_use]
pub fn rewrite(contents: &str) -> String {
    let mut found = false;
    let mut out = String::with_capacity(contents.len() + THEME_LINE.len() + 2);
    for line in contents.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        if body.starts_with(THEME_KEY) {
            found = true;
            out.push_str(THEME_LINE);
            out.push_str(line.strip_prefix(body).unwrap_or_default());
        } else {
            out.push_str(line);
        }
    }
    if !found {
        let eol = if contents.contains("\r\n") { "\r\n" } else { "\n" };
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(eol);
        }
        out.push_str(THEME_LINE);
        out.push_str(eol);
    }
    out
}

/// The theme selection inside the user's `.zshrc`.
#[derive(Debug)]
pub struct ThemeLineResource<'a> {
    /// Path of `.zshrc`.
    pub zshrc: PathBuf,
    fs: &'a dyn FileSystemOps,
}

impl<'a> ThemeLineResource<'a> {
    /// Create a new theme line resource.
    #[must_use]
    pub const fn new(zshrc: PathBuf, fs: &'a dyn FileSystemOps) -> Self {
        Self { zshrc, fs }
    }
}

impl Resource for ThemeLineResource<'_> {
    fn description(&self) -> String {
        format!("{THEME_LINE} in {}", self.zshrc.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.fs.is_symlink(&self.zshrc) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is a symlink", self.zshrc.display()),
            });
        }
        if !self.fs.is_file(&self.zshrc) {
            return Ok(ResourceState::Invalid {
                reason: format!("{} does not exist", self.zshrc.display()),
            });
        }
        let contents = self.fs.read_to_string(&self.zshrc)?;
        let theme_lines: Vec<&str> = contents
            .lines()
            .filter(|l| l.starts_with(THEME_KEY))
            .collect();
        match theme_lines.first() {
            None => Ok(ResourceState::Incorrect {
                current: "no ZSH_THEME line".to_string(),
            }),
            Some(_) if theme_lines.iter().all(|l| *l == THEME_LINE) => Ok(ResourceState::Correct),
            Some(first) => Ok(ResourceState::Incorrect {
                current: (*first).to_string(),
            }),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let contents = self.fs.read_to_string(&self.zshrc)?;
        self.fs.write(&self.zshrc, &rewrite(&contents))?;
        Ok(ResourceChange::Applied)
    }
}
