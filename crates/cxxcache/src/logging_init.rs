//! Process-wide tracing initialization: an `EnvFilter` from `RUST_LOG`,
//! plus a daily rolling file appender when a log directory is configured.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must stay alive for the lifetime of the process for the
/// non-blocking file writer to keep flushing. Dropping it silently stops
/// log delivery, so the caller holds it in `main`.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initializes the global tracing subscriber. `log_dir` enables a daily
/// rolling file appender (`cxxcache.log.YYYY-MM-DD`) alongside stderr.
pub fn init(log_dir: Option<&str>) -> LoggingGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cxxcache.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            LoggingGuard {
                _file_guard: Some(guard),
            }
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(stderr_layer).init();
            LoggingGuard { _file_guard: None }
        }
    }
}
