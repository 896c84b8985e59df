//! Provisioning configuration: one immutable [`Config`] per run.
//!
//! Loaded from `provision.toml`; every field has a default reproducing the
//! stock server layout, so a missing file or a partial file is valid.
pub mod toml_loader;
pub mod validation;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "provision.toml";

/// How the user's shell configuration is brought into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ShellCustomization {
    /// Copy staged dotfiles over the home directory, backing up originals.
    #[default]
    Dotfiles,
    /// Leave dotfiles alone and rewrite the `ZSH_THEME` line of `.zshrc`.
    ThemeLine,
}

impl std::fmt::Display for ShellCustomization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dotfiles => write!(f, "dotfiles"),
            Self::ThemeLine => write!(f, "theme-line"),
        }
    }
}

/// All settings for a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Unprivileged account being provisioned.
    pub username: String,
    /// Home directory override; the account database is used when unset.
    pub home_dir: Option<PathBuf>,
    /// Miniconda install prefix.
    pub conda_path: PathBuf,
    /// Miniconda installer download URL.
    pub conda_installer_url: String,
    /// System-wide shell-init snippet pointing at the conda install.
    pub conda_init_path: PathBuf,
    /// Oh My Zsh unattended installer URL.
    pub oh_my_zsh_installer_url: String,
    /// Powerlevel10k repository URL.
    pub theme_repo_url: String,
    /// File name of the private key under `~/.ssh`.
    pub ssh_key_name: String,
    /// Comment embedded in the generated key.
    pub ssh_email: String,
    /// Staging directory holding dotfiles to copy.
    pub dotfiles_dir: PathBuf,
    /// Dotfile names, relative to both `dotfiles_dir` and the home directory.
    pub dotfile_list: Vec<String>,
    /// Packages installed through the detected package manager.
    pub packages: Vec<String>,
    /// Dotfile copy or theme-line rewrite.
    pub shell_customization: ShellCustomization,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: "dev".to_string(),
            home_dir: None,
            conda_path: PathBuf::from("/opt/miniconda3"),
            conda_installer_url:
                "https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh"
                    .to_string(),
            conda_init_path: PathBuf::from("/etc/profile.d/conda.sh"),
            oh_my_zsh_installer_url:
                "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh"
                    .to_string(),
            theme_repo_url: "https://github.com/romkatv/powerlevel10k.git".to_string(),
            ssh_key_name: "id_ed25519_github".to_string(),
            ssh_email: "dev@example.com".to_string(),
            dotfiles_dir: PathBuf::from("dotfiles"),
            dotfile_list: [".zshrc", ".tmux.conf", ".vimrc", ".gitconfig", ".p10k.zsh"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            packages: ["git", "curl", "wget", "zsh", "tmux", "vim", "htop"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            shell_customization: ShellCustomization::Dotfiles,
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from [`DEFAULT_CONFIG_FILE`]
    /// in the working directory when `path` is `None`.
    ///
    /// A missing default file yields [`Config::default`]; an explicitly
    /// requested file must exist. A relative `dotfiles_dir` is resolved
    /// against the directory containing the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = path.map_or_else(
            || (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            |p| (p.to_path_buf(), true),
        );
        let mut config: Self = toml_loader::load_config(&path, required)?;
        if config.dotfiles_dir.is_relative()
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            config.dotfiles_dir = parent.join(&config.dotfiles_dir);
        }
        Ok(config)
    }

    /// Path of the private key inside `home`.
    #[must_use]
    pub fn ssh_key_path(&self, home: &Path) -> PathBuf {
        home.join(".ssh").join(&self.ssh_key_name)
    }

    /// Validate the configuration and return any warnings found.
    #[must_use]
    pub fn validate(&self) -> Vec<validation::ValidationWarning> {
        validation::validate_all(self)
    }
}
