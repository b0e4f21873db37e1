//! Renderer role: telemetry in, hoist drawing out.

use hoist_common::channel::{ChannelDirectory, ChannelError, ChannelReader, ChannelResult};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use hoist_common::terminal::Render;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RendererError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("display failed: {0}")]
    Display(#[from] io::Error),
}

/// Telemetry readers plus a display.
pub struct Renderer<D: Render> {
    telemetry: AxisMap<ChannelReader<Telemetry>>,
    display: D,
    tick: Duration,
    running: Arc<AtomicBool>,
}

impl<D: Render> Renderer<D> {
    /// Open both telemetry channels. Never blocks.
    pub fn connect(dir: &ChannelDirectory, config: &HoistConfig, display: D) -> ChannelResult<Self> {
        let telemetry = AxisMap::try_from_fn(|axis| ChannelReader::open(dir.telemetry(axis)))?;
        info!("Renderer listening for telemetry");
        Ok(Self {
            telemetry,
            display,
            tick: config.timing.tick(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    /// Block for one X and one Z reading, then draw them.
    pub fn render_once(&mut self) -> Result<AxisMap<f32>, RendererError> {
        let x = self.next_position(Axis::X)?;
        let z = self.next_position(Axis::Z)?;
        self.display.render(x, z)?;
        Ok(AxisMap { x, z })
    }

    pub fn run(&mut self) -> Result<(), RendererError> {
        while self.running.load(Ordering::SeqCst) {
            self.render_once()?;
            std::thread::sleep(self.tick);
        }
        info!("Renderer stopped");
        Ok(())
    }

    fn next_position(&mut self, axis: Axis) -> Result<f32, RendererError> {
        loop {
            match self.telemetry[axis].recv() {
                Ok(reading) => return Ok(reading.position),
                Err(e) if !e.is_fatal() => warn!("Dropping telemetry for {axis}: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
    }
}
