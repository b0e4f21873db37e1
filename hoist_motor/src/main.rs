//! # Hoist Motor Binary
//!
//! Simulated motor for one axis of the hoist.
//!
//! # Usage
//!
//! ```bash
//! # X axis with defaults
//! hoist_motor --axis x
//!
//! # Z axis, custom config, verbose JSON logs
//! hoist_motor --axis z --config config/hoist.toml -v --json
//! ```

use clap::Parser;
use hoist_common::config::HoistConfig;
use hoist_common::consts::FATAL_EXIT_CODE;
use hoist_common::logging;
use hoist_common::prelude::{Axis, Role};
use hoist_motor::{ExitReason, MotorActor};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// Hoist motor - drives one axis and reports its position
#[derive(Parser, Debug)]
#[command(name = "hoist_motor")]
#[command(version)]
#[command(about = "Simulated motor for one hoist axis")]
#[command(long_about = None)]
struct Args {
    /// Axis driven by this motor (x or z)
    #[arg(short, long)]
    axis: Axis,

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

fn main() {
    if let Err(e) = run() {
        error!("Motor failed: {}", e);
        eprintln!("hoist_motor: {e}");
        std::process::exit(FATAL_EXIT_CODE);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HoistConfig::resolve(args.config.as_deref())?;
    let _log = logging::init(&config, Role::Motor(args.axis), args.verbose, args.json)?;

    info!(
        "Hoist motor {} v{} booting...",
        args.axis,
        env!("CARGO_PKG_VERSION")
    );

    let mut actor = MotorActor::boot(args.axis, &config)?;

    // Installed after boot so that Ctrl+C still kills a motor stuck in a handshake.
    let running = actor.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    match actor.run()? {
        ExitReason::Shutdown => info!("Motor {} shut down", args.axis),
        ExitReason::Interrupted => info!("Motor {} interrupted", args.axis),
    }
    Ok(())
}
