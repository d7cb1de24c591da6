use std::path::Path;
use stl_catalog_core::AppConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Our crates log at `level`; dependencies (rusqlite, reqwest, rayon) only at warn.
fn filter_directives(level: &str) -> String {
    format!("warn,stl_catalog={0},stl_catalog_core={0}", level.trim())
}

/// Install stdout and file logging from `log_level` / `log_file`.
/// `RUST_LOG`, when set, replaces the computed filter.
///
/// Keep the returned guard alive for the lifetime of the process or buffered
/// file lines are lost.
pub fn init_logger(config: &AppConfig) -> WorkerGuard {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.log_level)));

    let log_path = Path::new(&config.log_file);
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "stl-catalog.log".into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    info!(log_file = %config.log_file, level = %config.log_level, "Logging configured");

    guard
}
