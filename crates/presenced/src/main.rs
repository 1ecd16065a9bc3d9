//! presenced - attendance confirmation service
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Presence engine
//! - Prompt presenter (published over IPC)
//! - IPC server

use anyhow::Result;
use clap::Parser;
use presence_util::default_config_path;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod presenter;
mod service;

use service::Service;

/// presenced - periodically asks the signed-in staff member to confirm presence
#[derive(Parser, Debug)]
#[command(name = "presenced")]
#[command(about = "Attendance confirmation service", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.config/presenced/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set PRESENCE_SOCKET env var)
    #[arg(short, long, env = "PRESENCE_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set PRESENCE_DATA_DIR env var)
    #[arg(short, long, env = "PRESENCE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Start a session for this staff member right away
    #[arg(long)]
    staff: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "presenced starting");

    if presence_util::is_mock_time_active() {
        info!(
            now = %presence_util::format_datetime_full(&presence_util::now()),
            "Mock time is active"
        );
    }

    let service = Service::new(&args).await?;
    service.run().await
}
