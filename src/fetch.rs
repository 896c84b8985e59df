//! Remote artifact download.
use anyhow::{Context as _, Result};
use nix::fcntl::OFlag;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::Path;

/// Capability to download a URL to a local file.
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`, replacing the contents of any existing
    /// regular file. A symlink at `dest` is refused.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or `dest` cannot be written.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// [`Fetcher`] that performs a blocking HTTP GET with `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!(target: "provision::fetch", "GET {url} -> {}", dest.display());
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(OFlag::O_NOFOLLOW.bits())
            .open(dest)
            .with_context(|| format!("opening {}", dest.display()))?;
        let response = ureq::get(url)
            .call()
            .with_context(|| format!("downloading {url}"))?;
        let mut reader = response.into_body().into_reader();
        std::io::copy(&mut reader, &mut file)
            .with_context(|| format!("writing {}", dest.display()))?;
        Ok(())
    }
}


#[cfg(test)]
pub use mock::MockFetcher;
