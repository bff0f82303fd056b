use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "edtech";
const KEPT_LOG_FILES: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `edtech_backend=debug,sqlx=warn`.
    pub filter: String,
    /// Directory for daily-rotated log files; stdout only when `None`.
    pub file_dir: Option<PathBuf>,
}

impl LogConfig {
    /// `RUST_LOG`, plus `ENABLE_FILE_LOGS` / `LOG_DIR` for the file sink.
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("RUST_LOG").ok(),
            std::env::var("ENABLE_FILE_LOGS").ok().as_deref(),
            std::env::var("LOG_DIR").ok(),
        )
    }

    fn from_values(filter: Option<String>, enable_files: Option<&str>, dir: Option<String>) -> Self {
        let files_on = matches!(enable_files.map(str::trim), Some("true" | "1"));
        Self {
            filter: filter
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            file_dir: files_on.then(|| PathBuf::from(dir.unwrap_or_else(|| "./logs".to_string()))),
        }
    }
}

/// Installs the global subscriber. Hold the returned guard until shutdown so
/// buffered file output is flushed.
pub fn init_tracing(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, guard) = match config.file_dir.as_deref().map(file_writer) {
        Some(Ok((writer, guard))) => (Some(writer), Some(guard)),
        Some(Err(err)) => {
            // the subscriber is not up yet
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };
    let file_layer = writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}
