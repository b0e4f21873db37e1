//! Motor actor: boot handshake and the fixed-cadence tick loop.

use crate::motor::{MotorState, Outcome, TelemetryNoise};
use hoist_common::channel::identity;
use hoist_common::channel::{ChannelDirectory, ChannelReader, ChannelResult, ChannelWriter};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// SHUTDOWN command received.
    Shutdown,
    /// The running flag was cleared (Ctrl+C).
    Interrupted,
}

#[derive(Debug, Default)]
struct TickStats {
    ticks: u64,
    overruns: u64,
    dropped_records: u64,
}

/// Everything one motor process owns.
pub struct MotorActor {
    state: MotorState,
    noise: TelemetryNoise,
    /// Inspector channel first, then commander channel.
    inbound: [ChannelReader<MotorCommand>; 2],
    telemetry: ChannelWriter<Telemetry>,
    tick: Duration,
    running: Arc<AtomicBool>,
    rng: StdRng,
    stats: TickStats,
}

impl MotorActor {
    /// Full boot sequence.
    ///
    /// 1. Acquire the watchdog identity.
    /// 2. Publish our identity to the inspector, then to the watchdog.
    /// 3. Open the command readers and the telemetry writer.
    pub fn boot(axis: Axis, config: &HoistConfig) -> ChannelResult<Self> {
        let dir = ChannelDirectory::new(&config.paths.channel_dir);
        dir.prepare()?;
        let me = Role::Motor(axis);

        let watchdog = identity::acquire(&dir.identity(Role::Watchdog, me))?;
        info!("Watchdog is {watchdog}");

        let own = Identity::current();
        identity::publish(&dir.identity(me, Role::Inspector), own)?;
        info!("Sent {own} to inspector");
        identity::publish(&dir.identity(me, Role::Watchdog), own)?;
        info!("Sent {own} to watchdog");

        Self::connect(axis, &dir, config)
    }

    /// Open the channels without the identity handshake.
    ///
    /// The telemetry writer blocks until the renderer listens.
    pub fn connect(axis: Axis, dir: &ChannelDirectory, config: &HoistConfig) -> ChannelResult<Self> {
        let inbound = [
            ChannelReader::open(dir.motor_commands(axis, Role::Inspector))?,
            ChannelReader::open(dir.motor_commands(axis, Role::Commander))?,
        ];
        let telemetry = ChannelWriter::open(dir.telemetry(axis))?;
        info!("Motor {axis} channels open");

        Ok(Self {
            state: MotorState::new(axis, config.axes.bound(axis)),
            noise: TelemetryNoise {
                jitter: config.telemetry.jitter,
                display_max: config.telemetry.display_max,
            },
            inbound,
            telemetry,
            tick: config.timing.tick(),
            running: Arc::new(AtomicBool::new(true)),
            rng: StdRng::from_entropy(),
            stats: TickStats::default(),
        })
    }

    /// Flag polled once per tick; clear it to stop the loop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn state(&self) -> &MotorState {
        &self.state
    }

    /// Run until SHUTDOWN or until the running flag is cleared.
    ///
    /// # Errors
    /// Any channel failure other than a malformed record.
    pub fn run(&mut self) -> ChannelResult<ExitReason> {
        let axis = self.state.axis();
        info!(
            "Starting motor {axis} loop (tick={}ms, bound={})",
            self.tick.as_millis(),
            self.state.bound()
        );

        while self.running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            let commands = self.poll_commands()?;
            if !commands.is_empty() {
                debug!(?commands, "Commands received");
            }

            match self.state.step(&commands) {
                Outcome::Shutdown => {
                    info!(
                        "Motor {axis}: SHUTDOWN received after {} ticks",
                        self.stats.ticks
                    );
                    return Ok(ExitReason::Shutdown);
                }
                Outcome::Continue(tick) => {
                    if tick.reset {
                        info!("Motor {axis}: RESET applied");
                    }
                    if tick.clamped {
                        info!("Motor {axis}: reached end of track at {}", tick.position);
                    }
                    let reported = self.noise.estimate(tick.position, &mut self.rng);
                    self.telemetry.send(&Telemetry { position: reported })?;
                }
            }

            self.stats.ticks += 1;
            let elapsed = tick_start.elapsed();
            if elapsed < self.tick {
                std::thread::sleep(self.tick - elapsed);
            } else {
                self.stats.overruns += 1;
                warn!(
                    "Motor {axis}: tick overrun #{} ({}ms)",
                    self.stats.overruns,
                    elapsed.as_millis()
                );
            }
        }

        info!(
            "Motor {axis} loop stopped after {} ticks (dropped records: {})",
            self.stats.ticks, self.stats.dropped_records
        );
        Ok(ExitReason::Interrupted)
    }

    /// At most one record from each inbound channel, inspector first.
    fn poll_commands(&mut self) -> ChannelResult<Vec<MotorCommand>> {
        let mut commands = Vec::with_capacity(self.inbound.len());
        for reader in &mut self.inbound {
            match reader.try_recv() {
                Ok(Some(command)) => commands.push(command),
                Ok(None) => {}
                Err(e) if !e.is_fatal() => {
                    self.stats.dropped_records += 1;
                    warn!("Dropping record: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(commands)
    }
}
