//! Logging setup and per-document spans
//!
//! Everything the coordinator logs about one document runs inside a
//! [`document_span`], so file output reads `document{id=nb1}: ...` and a
//! single notebook's history can be grepped out of an interleaved log.

use std::path::PathBuf;

use tracing::Span;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;
use crate::types::DocumentId;

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "SPARKCONN_LOG";

/// Filter used when `SPARKCONN_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "sparkconn=info,spark_connector=info,warn";

const LOG_FILE_PREFIX: &str = "sparkconn.log";

/// Install the file logger.
///
/// Output goes to a daily-rolling file under the platform data directory
/// (`~/.local/share/spark-connector/logs/` on Linux); stdout stays free for
/// headless events.
///
/// ```bash
/// SPARKCONN_LOG=debug sparkconn --headless
/// SPARKCONN_LOG=sparkconn_app::handler=trace sparkconn --headless
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        "Spark connector logging started"
    );
    Ok(())
}

/// Span tagging log lines with the document they concern
pub fn document_span(document: &DocumentId) -> Span {
    tracing::info_span!("document", id = %document)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("spark-connector")
        .join("logs")
}
