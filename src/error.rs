//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary carry them as [`anyhow::Error`] via the standard `?` operator.
//! [`exit_code`] walks an error chain back down to the typed cause to pick the
//! process exit status.
//!
//! ```text
//! PreconditionError   not root, no package manager, unknown user
//! ConfigError         TOML reading and parsing
//! ResourceError       failed external commands
//! ```

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Conditions that must hold before anything on the host is touched.
#[derive(Error, Debug)]
pub enum PreconditionError {
    /// The process is not running with root privileges.
    #[error("this program must be run as root (try sudo)")]
    NotPrivileged,

    /// None of the supported package managers is on `PATH`.
    #[error("no supported package manager found (tried: {tried})")]
    NoPackageManager {
        /// Comma-separated list of the package managers probed, in order.
        tried: String,
    },

    /// The target user does not exist in the account database.
    #[error("user '{0}' does not exist")]
    UnknownUser(String),
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has fields of the wrong type.
    #[error("Invalid TOML in {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// Map an error chain to the process exit status.
///
/// The first failed external command's exit status is propagated (clamped
/// into `1..=255`); precondition failures and everything else exit with 1.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(ResourceError::ExecutionFailed { exit_code, .. }) =
            cause.downcast_ref::<ResourceError>()
        {
            return u8::try_from(*exit_code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1);
        }
    }
    1
}
