//! Command: print version information.

/// Build version: `PROVISION_VERSION` from the release pipeline or
/// `git describe`, else the crate version.
#[must_use]
pub const fn version() -> &'static str {
    match option_env!("PROVISION_VERSION") {
        Some(v) => v,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Print the provision version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("provision {}", version());
}
