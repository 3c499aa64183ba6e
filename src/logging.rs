//! Console and optional rolling-file logging

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the daily log files
pub const LOG_FILE_PREFIX: &str = "sftp-bridge.log";

const DEFAULT_FILTER: &str = "info";

/// Keeps the file writer flushing; hold it until shutdown.
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
    filter: String,
    file: Option<PathBuf>,
}

impl LoggingGuard {
    /// Active filter directives
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Log file location, when file logging is on
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// `RUST_LOG` when it parses, `info` otherwise.
fn build_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Console output always; a daily rolling
/// file under `log_dir` when one is given.
pub fn init_logging(log_dir: Option<&Path>) -> LoggingGuard {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(directives.as_deref());
    let filter = env_filter.to_string();

    let (file_layer, worker) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(worker))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    LoggingGuard {
        _worker: worker,
        filter,
        file: log_dir.map(|dir| dir.join(LOG_FILE_PREFIX)),
    }
}
