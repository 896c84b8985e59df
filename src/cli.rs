//! Command-line argument definitions.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Idempotent developer server provisioning",
    version
)]
pub struct Cli {
    /// Command to run (defaults to `install`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The selected command, `install` when none was given.
    #[must_use]
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Install(InstallOpts::default()))
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: ./provision.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Provision the host (the default)
    Install(InstallOpts),
    /// Report the state of every provisioning step without changing anything
    Status,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file of this command.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Status => "status",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Skip specific tasks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only specific tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

impl InstallOpts {
    /// Whether the task called `name` is selected by `--only`/`--skip`
    /// (case-insensitive substring match).
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        if !self.only.is_empty() {
            return self.only.iter().any(|o| name.contains(&o.to_lowercase()));
        }
        !self.skip.iter().any(|s| name.contains(&s.to_lowercase()))
    }
}
