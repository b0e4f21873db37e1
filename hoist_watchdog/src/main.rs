//! # Hoist Watchdog Binary
//!
//! # Usage
//!
//! ```bash
//! hoist_watchdog --config config/hoist.toml
//! ```

use clap::Parser;
use hoist_common::config::HoistConfig;
use hoist_common::consts::FATAL_EXIT_CODE;
use hoist_common::logging;
use hoist_common::role::Role;
use hoist_watchdog::WatchdogContext;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

/// Hoist watchdog - dead-man switch for the hoist
#[derive(Parser, Debug)]
#[command(name = "hoist_watchdog")]
#[command(version)]
#[command(about = "Dead-man switch forcing a hoist RESET after inactivity")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Watchdog failed: {}", e);
        eprintln!("hoist_watchdog: {e}");
        std::process::exit(FATAL_EXIT_CODE);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HoistConfig::resolve(args.config.as_deref())?;
    let _log = logging::init(&config, Role::Watchdog, args.verbose, args.json)?;

    info!("Hoist watchdog v{} booting...", env!("CARGO_PKG_VERSION"));

    let watchdog = async {
        let mut context = WatchdogContext::boot(&config).await?;
        context.run().await
    };

    tokio::select! {
        result = watchdog => result?,
        signal = signal::ctrl_c() => {
            signal?;
            info!("Received shutdown signal (Ctrl+C)");
        }
    }

    info!("Watchdog shutdown complete");
    Ok(())
}
