//! Spark connector - per-document Spark connection coordinator
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use spark_connector::OutputMode;

/// Spark connector - drive the connection coordinator from stdin events
#[derive(Parser, Debug)]
#[command(name = "sparkconn")]
#[command(about = "Per-document Spark connection coordinator", long_about = None)]
struct Args {
    /// Directory holding .sparkconn/config.toml
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Emit NDJSON events instead of rendered phases
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    sparkconn_core::logging::init()?;

    let base_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let mode = if args.headless {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    spark_connector::run_headless(&base_path, mode).await?;
    Ok(())
}
