//! # Hoist Inspector Binary
//!
//! Started without `--role`, the process becomes the controller and spawns
//! its own renderer child (`--role renderer`).
//!
//! # Usage
//!
//! ```bash
//! hoist_inspector --config config/hoist.toml
//! ```

use clap::{Parser, ValueEnum};
use hoist_common::channel::ChannelDirectory;
use hoist_common::config::HoistConfig;
use hoist_common::consts::FATAL_EXIT_CODE;
use hoist_common::logging;
use hoist_common::role::Role;
use hoist_common::terminal::{AsciiHoist, TerminalKeys};
use hoist_inspector::{ControllerContext, ProcessLauncher, Renderer, handshake, spawn_renderer};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InspectorRole {
    Controller,
    Renderer,
}

/// Hoist inspector - display and emergency console
#[derive(Parser, Debug)]
#[command(name = "hoist_inspector")]
#[command(version)]
#[command(about = "Inspector console for the hoist")]
#[command(long_about = None)]
struct Args {
    /// Process role; the renderer is normally started by the controller
    #[arg(long, value_enum, default_value_t = InspectorRole::Controller)]
    role: InspectorRole,

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
        error!("Inspector failed: {}", e);
        eprintln!("hoist_inspector: {e}");
        std::process::exit(FATAL_EXIT_CODE);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HoistConfig::resolve(args.config.as_deref())?;

    match args.role {
        InspectorRole::Renderer => run_renderer(&args, &config),
        InspectorRole::Controller => run_controller(&args, &config),
    }
}

fn run_renderer(args: &Args, config: &HoistConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _log = logging::init(config, Role::Renderer, args.verbose, args.json)?;
    info!("Hoist renderer v{} booting...", env!("CARGO_PKG_VERSION"));

    let dir = ChannelDirectory::new(&config.paths.channel_dir);
    dir.prepare()?;
    let display = AsciiHoist::new(std::io::stdout(), config.telemetry.display_max);
    let mut renderer = Renderer::connect(&dir, config, display)?;

    let running = renderer.running_flag();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })?;

    renderer.run()?;
    Ok(())
}

fn run_controller(args: &Args, config: &HoistConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _log = logging::init(config, Role::Inspector, args.verbose, args.json)?;
    info!("Hoist inspector v{} booting...", env!("CARGO_PKG_VERSION"));
    println!("Inspector: booting up...");

    let dir = ChannelDirectory::new(&config.paths.channel_dir);
    dir.prepare()?;

    let (boot, inbox) = handshake(&dir)?;
    let renderer = spawn_renderer(args.config.as_deref(), args.verbose, args.json)?;

    let launcher = ProcessLauncher {
        binary: config.paths.motor_binary.clone(),
        config: args.config.clone(),
        verbose: args.verbose,
        json: args.json,
    };
    let mut controller =
        ControllerContext::connect(dir, config, boot.motors, inbox, launcher, Some(renderer))?;

    let mut keys = TerminalKeys::raw()?;
    controller.run(&mut keys)?;

    info!("Inspector shutdown complete");
    Ok(())
}
