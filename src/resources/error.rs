//! Typed error variants for resource operations.
//!
//! [`ResourceError`] carries a failed external command's exit status up
//! through [`anyhow::Error`] so the process can exit with it.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process (`-1` if killed by a signal).
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },
}
