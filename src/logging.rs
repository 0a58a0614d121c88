use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "vocab-review.log";

/// Keeps the non-blocking file writer alive; drop flushes it.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    /// Daily-rolling file output, when enabled
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(level: &str) -> Self {
        let file_dir = file_logging_enabled().then(|| {
            std::env::var("LOG_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs"))
        });

        Self {
            level: level.to_string(),
            file_dir,
        }
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let file_output = settings.file_dir.as_ref().and_then(|dir| {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        Some(tracing_appender::non_blocking(appender))
    });

    let (file_layer, guard) = match file_output {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
