//! Console and log-file output, and the per-run task summary.

mod logger;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, TaskEntry, TaskStatus};

/// A [`Logger`] whose events go to a fresh log file in a temporary
/// directory, through a thread-local subscriber.
///
/// Keep the guard alive for the duration of the test; dropping it restores
/// the previous thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("test.log");
    let file_layer =
        subscriber::FileLayer::create(&path, "test").expect("failed to create log file");
    let log = Logger::with_log_file(Some(path));
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}
