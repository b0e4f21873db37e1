//! # Hoist Commander Binary
//!
//! Keyboard console: A/D move X, W/S move Z, X/Z halt an axis, Q quits.
//!
//! # Usage
//!
//! ```bash
//! hoist_commander --config config/hoist.toml
//! ```

use clap::Parser;
use hoist_commander::CommanderContext;
use hoist_common::config::HoistConfig;
use hoist_common::consts::FATAL_EXIT_CODE;
use hoist_common::logging;
use hoist_common::role::Role;
use hoist_common::terminal::{TerminalKeys, commander_banner};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

/// Hoist commander - keyboard control of the hoist motors
#[derive(Parser, Debug)]
#[command(name = "hoist_commander")]
#[command(version)]
#[command(about = "Keyboard commander for the hoist")]
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

fn main() {
    if let Err(e) = run() {
        error!("Commander failed: {}", e);
        eprintln!("hoist_commander: {e}");
        std::process::exit(FATAL_EXIT_CODE);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HoistConfig::resolve(args.config.as_deref())?;
    let _log = logging::init(&config, Role::Commander, args.verbose, args.json)?;

    info!("Hoist commander v{} booting...", env!("CARGO_PKG_VERSION"));
    println!("Commander: booting up...");

    let mut commander = CommanderContext::boot(&config)?;

    let mut stdout = std::io::stdout();
    write!(stdout, "\x1bc{}", commander_banner())?;
    stdout.flush()?;

    let mut keys = TerminalKeys::raw()?;
    commander.run(&mut keys)?;

    info!("Commander shutdown complete");
    Ok(())
}
