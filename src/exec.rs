//! External command execution behind the [`Executor`] trait.
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

use crate::resources::error::ResourceError;

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl ExecResult {
    /// Turn a non-zero exit into [`ResourceError::ExecutionFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the command did not succeed.
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(ResourceError::ExecutionFailed {
            program: program.to_string(),
            exit_code: self.code.unwrap_or(-1),
            stderr: detail.to_string(),
        }
        .into())
    }
}

/// Capability to run external programs and observe their exit status.
///
/// Production code uses [`SystemExecutor`]; tests substitute a recording fake
/// and assert on the sequence of invocations.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ExecutionFailed`] on non-zero exit, or an I/O
    /// error if the program could not be spawned.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with extra environment variables. Fails on non-zero exit.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::run`].
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the program could not be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Resolve `program` to its absolute path on `PATH`.
    fn resolve(&self, program: &str) -> Option<PathBuf>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool {
        self.resolve(program).is_some()
    }

    /// Run a command as `user` through `sudo -u <user> -H env ...`.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::run`].
    fn run_as(
        &self,
        user: &str,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let argv = sudo_args(user, program, args, env);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.run("sudo", &argv)
    }

    /// Like [`Executor::run_as`] but returns the result of a failed command
    /// instead of an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if `sudo` could not be spawned.
    fn run_as_unchecked(&self, user: &str, program: &str, args: &[&str]) -> Result<ExecResult> {
        let argv = sudo_args(user, program, args, &[]);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.run_unchecked("sudo", &argv)
    }
}

/// Build the `sudo` argument vector that runs `program` as `user`.
///
/// `-H` points `HOME` at the target user's home so installers that write
/// under `~` land in the right place.
#[must_use]
pub fn sudo_args(user: &str, program: &str, args: &[&str], env: &[(&str, &str)]) -> Vec<String> {
    let mut argv = vec![
        "-u".to_string(),
        user.to_string(),
        "-H".to_string(),
        "env".to_string(),
    ];
    argv.extend(env.iter().map(|(k, v)| format!("{k}={v}")));
    argv.push(program.to_string());
    argv.extend(args.iter().map(ToString::to_string));
    argv
}

/// [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn output(mut cmd: Command, program: &str, args: &[&str]) -> Result<ExecResult> {
        tracing::debug!(target: "provision::exec", "$ {program} {}", args.join(" "));
        let output = cmd
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::output(cmd, program, args)?.check(program)
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        Self::output(cmd, program, args)?.check(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Self::output(cmd, program, args)
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
