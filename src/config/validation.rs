//! Non-fatal validation warnings for loaded configuration.
use std::collections::HashSet;
use std::path::{Component, Path};

use super::{Config, ShellCustomization};

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration field group (e.g., "dotfiles", "ssh").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Build a warning from its three parts.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
///
/// Validators never fail; they report suspicious values so the operator can
/// fix them before a run mutates the host.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config) -> Vec<ValidationWarning>;
}

/// Paths that are used verbatim must be absolute.
#[derive(Debug)]
pub struct PathValidator;

impl ConfigValidator for PathValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut check = |item: &str, path: &Path| {
            if path.is_relative() {
                warnings.push(ValidationWarning::new(
                    "paths",
                    item,
                    format!("{} is relative; expected an absolute path", path.display()),
                ));
            }
        };
        check("conda_path", &config.conda_path);
        check("conda_init_path", &config.conda_init_path);
        if let Some(home) = &config.home_dir {
            check("home_dir", home);
        }
        warnings
    }
}

/// Package list sanity.
#[derive(Debug)]
pub struct PackageValidator;

impl ConfigValidator for PackageValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if config.packages.is_empty() {
            warnings.push(ValidationWarning::new(
                "packages",
                "packages",
                "package list is empty; zsh and git must already be installed",
            ));
        }
        let mut seen = HashSet::new();
        for package in &config.packages {
            if !seen.insert(package.as_str()) {
                warnings.push(ValidationWarning::new(
                    "packages",
                    package,
                    "listed more than once",
                ));
            }
        }
        warnings
    }
}

/// Dotfile names and staged sources.
#[derive(Debug)]
pub struct DotfileValidator;

impl ConfigValidator for DotfileValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        if config.shell_customization != ShellCustomization::Dotfiles {
            return Vec::new();
        }
        let mut warnings = Vec::new();
        for name in &config.dotfile_list {
            let escapes = Path::new(name)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if escapes {
                warnings.push(ValidationWarning::new(
                    "dotfiles",
                    name,
                    "must be a plain relative path inside the home directory",
                ));
            } else if !config.dotfiles_dir.join(name).exists() {
                warnings.push(ValidationWarning::new(
                    "dotfiles",
                    name,
                    format!(
                        "not staged in {}; it will be skipped",
                        config.dotfiles_dir.display()
                    ),
                ));
            }
        }
        warnings
    }
}

/// SSH key name and comment.
#[derive(Debug)]
pub struct SshValidator;

impl ConfigValidator for SshValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if config.ssh_key_name.is_empty() || config.ssh_key_name.contains('/') {
            warnings.push(ValidationWarning::new(
                "ssh",
                &config.ssh_key_name,
                "key name must be a bare file name",
            ));
        }
        if !config.ssh_email.contains('@') {
            warnings.push(ValidationWarning::new(
                "ssh",
                &config.ssh_email,
                "key comment does not look like an email address",
            ));
        }
        warnings
    }
}

/// Run every validator against `config`.
#[must_use]
pub fn validate_all(config: &Config) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 4] = [
        &PathValidator,
        &PackageValidator,
        &DotfileValidator,
        &SshValidator,
    ];
    validators
        .iter()
        .flat_map(|v| v.validate(config))
        .collect()
}
