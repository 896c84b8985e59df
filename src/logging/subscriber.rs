//! `tracing` output for a run: a coloured console layer and a plain,
//! timestamped log file per command under `$XDG_CACHE_HOME/provision/`.
use std::ffi::OsString;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;

/// Target of stage-header events.
pub(super) const STAGE_TARGET: &str = "provision::stage";
/// Target of dry-run action events.
pub(super) const DRY_RUN_TARGET: &str = "provision::dry_run";
/// Target of run-summary lines; these carry a `tone` field.
pub(super) const SUMMARY_TARGET: &str = "provision::summary";

/// `<cache root>/provision`, where the cache root is `$XDG_CACHE_HOME`,
/// else `$HOME/.cache`, else `./.cache`.
fn log_dir(xdg_cache_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    xdg_cache_home
        .map(PathBuf::from)
        .or_else(|| home.map(|h| PathBuf::from(h).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("provision")
}

/// Log file for `command`, creating its directory. `None` if that fails.
///
/// Under `sudo` this is root's cache directory.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = log_dir(
        std::env::var_os("XDG_CACHE_HOME"),
        std::env::var_os("HOME"),
    );
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// The fields of an event this module renders.
#[derive(Default)]
struct Fields {
    message: String,
    tone: Option<String>,
}

impl Fields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }
}

impl tracing::field::Visit for Fields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "tone" => self.tone = Some(value.to_string()),
            _ => {}
        }
    }
}

/// How an event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    DryRun,
    Summary,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(metadata: &tracing::Metadata<'_>) -> Self {
        match (*metadata.level(), metadata.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, SUMMARY_TARGET) => Self::Summary,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    fn console(self, fields: &Fields) -> String {
        let msg = &fields.message;
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::DryRun => format!("  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            Self::Summary => format!("  {}{msg}\x1b[0m", tone_color(fields.tone.as_deref())),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {msg}"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {msg}"),
            Self::Info => format!("  {msg}"),
            Self::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
        }
    }

    fn file(self, fields: &Fields, timestamp: &str) -> String {
        let msg = &fields.message;
        match self {
            Self::Stage => format!("[{timestamp}] ==> {msg}"),
            Self::DryRun => format!("[{timestamp}]     [dry run] {msg}"),
            Self::Error => format!("[{timestamp}]     [error] {msg}"),
            Self::Warn => format!("[{timestamp}]     [warn] {msg}"),
            Self::Debug => format!("[{timestamp}]     [debug] {msg}"),
            Self::Summary | Self::Info => format!("[{timestamp}]     {msg}"),
        }
    }
}

/// Colour of a summary line, keyed by [`TaskStatus::label`](super::TaskStatus::label).
fn tone_color(tone: Option<&str>) -> &'static str {
    match tone {
        Some("ok") => "\x1b[32m",
        Some("failed") => "\x1b[31m",
        Some("skipped") => "\x1b[33m",
        Some("n/a" | "dry-run") | None => "\x1b[2m",
        Some(_) => "",
    }
}

/// Layer appending every event, `debug` included, to the log file.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate `path`, write the run header and keep it open for appending.
    pub(super) fn create(path: &Path, command: &str) -> std::io::Result<Self> {
        let version =
            option_env!("PROVISION_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let mut file = fs::File::create(path)?;
        writeln!(
            file,
            "# provision {version} {command} {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let timestamp = chrono::Utc::now().format("%H:%M:%S").to_string();
        let line = Kind::of(event.metadata()).file(&Fields::of(event), &timestamp);
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console formatter: `==>` stage headers, indented detail lines.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let line = Kind::of(event.metadata()).console(&Fields::of(event));
        writeln!(writer, "{line}")
    }
}

/// Install the global subscriber: warnings and errors on stderr, the rest
/// on stdout (`debug` only when `verbose`), and everything in the log file
/// for `command`. Call once, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = log_file_path(command)
        .and_then(|path| FileLayer::create(&path, command).ok())
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_prefers_xdg_cache_home() {
        assert_eq!(
            log_dir(Some("/var/cache".into()), Some("/root".into())),
            PathBuf::from("/var/cache/provision")
        );
        assert_eq!(
            log_dir(None, Some("/root".into())),
            PathBuf::from("/root/.cache/provision")
        );
        assert_eq!(log_dir(None, None), PathBuf::from(".cache/provision"));
    }

    #[test]
    fn summary_tone_picks_colour() {
        let failed = Fields {
            message: "✗ Install packages".to_string(),
            tone: Some("failed".to_string()),
        };
        assert_eq!(
            Kind::Summary.console(&failed),
            "  \x1b[31m✗ Install packages\x1b[0m"
        );
        assert_eq!(
            Kind::Summary.file(&failed, "09:30:00"),
            "[09:30:00]     ✗ Install packages"
        );
    }

    #[test]
    fn file_lines_carry_no_colour() {
        let fields = Fields {
            message: "Install packages".to_string(),
            tone: None,
        };
        for kind in [
            Kind::Stage,
            Kind::DryRun,
            Kind::Summary,
            Kind::Error,
            Kind::Warn,
            Kind::Info,
            Kind::Debug,
        ] {
            assert!(!kind.file(&fields, "00:00:00").contains('\x1b'), "{kind:?}");
        }
    }
}
