//! Tracing subscriber setup.
//!
//! CLI commands log to stderr so stdout stays clean for reports and JSON.
//! The TUI owns the terminal, so it logs to a file instead.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "satudata_dash=info,warn";

pub enum LogTarget<'a> {
    Stderr,
    File { dir: &'a Path },
}

/// Install the global subscriber.
///
/// The returned guard must be held until exit so buffered file logs are flushed.
pub fn init_logging(target: LogTarget<'_>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match target {
        LogTarget::Stderr => {
            let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
            // A second init (tests, repeated runs) is harmless.
            let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();
            None
        }
        LogTarget::File { dir } => {
            if std::fs::create_dir_all(dir).is_err() {
                return None;
            }
            let appender = tracing_appender::rolling::daily(dir, "satudata.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();
            Some(guard)
        }
    }
}
