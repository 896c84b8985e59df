//! Developer server provisioning engine.
//!
//! Brings a Linux host and one unprivileged user to a known state: system
//! packages, Miniconda, Oh My Zsh with the Powerlevel10k prompt, dotfiles,
//! zsh as login shell, and an SSH key registered for GitHub. Every step checks
//! its marker first, so a run can be repeated safely.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and validate `provision.toml`
//! - **[`exec`], [`operations`], [`accounts`], [`fetch`]**: injectable host access
//! - **[`resources`]**: idempotent `check + apply` primitives
//! - **[`tasks`]**: the ordered pipeline steps wired to resources
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `status`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod accounts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod logging;
pub mod operations;
pub mod resources;
pub mod tasks;
