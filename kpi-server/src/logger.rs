//! Logging Infrastructure
//!
//! - Console output: pretty in development, JSON in production
//! - Optional daily rotating file log (`app.YYYY-MM-DD`), last 14 files kept
//!
//! `RUST_LOG` overrides the configured level when set.

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

const RETAINED_LOG_FILES: usize = 14;

/// Initialize the global subscriber
///
/// # Arguments
/// * `level` - default filter (e.g. "info", "kpi_server=debug,tower_http=info")
/// * `json_format` - JSON lines instead of pretty output
/// * `log_dir` - directory for the rolling file log
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let file_layer = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            fs::create_dir_all(log_dir)?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("app")
                .max_log_files(RETAINED_LOG_FILES)
                .build(log_dir)?;

            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::sync::Mutex::new(appender))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
