//! Motor kinematics.
//!
//! `MotorState` is the pure part of the motor actor: it applies the commands
//! received during one tick, integrates the speed into the position and clamps
//! the result to `[0, bound]`. No I/O happens here.

use hoist_common::axis::Axis;
use hoist_common::protocol::MotorCommand;
use rand::Rng;
use tracing::trace;

/// Position and speed of one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorState {
    axis: Axis,
    bound: f32,
    position: f32,
    speed: f32,
    /// Set by STOP, cleared only by RESET. Velocity deltas are ignored meanwhile.
    stopped: bool,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Keep running; carries what happened this tick.
    Continue(Tick),
    /// SHUTDOWN received. The tick was not integrated.
    Shutdown,
}

/// Observable effect of one integrated tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Position after integration, before clamping.
    pub pre_clamp: f32,
    /// Position after clamping, always in `[0, bound]`.
    pub position: f32,
    /// Speed used for the integration.
    pub speed: f32,
    /// The position had to be clamped (end of track).
    pub clamped: bool,
    /// A RESET was applied this tick.
    pub reset: bool,
}

impl MotorState {
    /// Motor at rest at position 0.
    pub fn new(axis: Axis, bound: f32) -> Self {
        Self {
            axis,
            bound,
            position: 0.0,
            speed: 0.0,
            stopped: false,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn bound(&self) -> f32 {
        self.bound
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Apply one command. Returns `false` for SHUTDOWN.
    pub fn apply(&mut self, command: MotorCommand) -> bool {
        match command {
            MotorCommand::Shutdown => return false,
            MotorCommand::Reset => {
                self.speed = 0.0;
                self.position = -self.bound;
                self.stopped = false;
            }
            MotorCommand::Stop => {
                self.speed = 0.0;
                self.stopped = true;
            }
            MotorCommand::Velocity(delta) if !self.stopped => self.speed += delta,
            MotorCommand::Velocity(delta) => {
                trace!(axis = %self.axis, delta, "Velocity ignored while stopped");
            }
        }
        true
    }

    /// Apply `commands` in order, then integrate and clamp.
    pub fn step(&mut self, commands: &[MotorCommand]) -> Outcome {
        let mut reset = false;
        for &command in commands {
            if !self.apply(command) {
                return Outcome::Shutdown;
            }
            reset |= command == MotorCommand::Reset;
        }

        self.position += self.speed;
        let pre_clamp = self.position;
        self.position = self.position.clamp(0.0, self.bound);

        Outcome::Continue(Tick {
            pre_clamp,
            position: self.position,
            speed: self.speed,
            clamped: pre_clamp != self.position,
            reset,
        })
    }
}

/// Perturbation applied to reported positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryNoise {
    /// Half-width of the uniform error.
    pub jitter: f32,
    /// Upper clamp of the reported value.
    pub display_max: f32,
}

impl TelemetryNoise {
    /// `clamp(position + U(-jitter, jitter), 0, display_max)`.
    pub fn estimate<R: Rng + ?Sized>(&self, position: f32, rng: &mut R) -> f32 {
        let error = if self.jitter > 0.0 {
            rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        (position + error).clamp(0.0, self.display_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tick(state: &mut MotorState, commands: &[MotorCommand]) -> Tick {
        match state.step(commands) {
            Outcome::Continue(tick) => tick,
            Outcome::Shutdown => panic!("unexpected shutdown"),
        }
    }

    #[test]
    fn eleven_unit_steps_reach_66() {
        let mut motor = MotorState::new(Axis::X, 100.0);
        for _ in 0..11 {
            tick(&mut motor, &[MotorCommand::Velocity(1.0)]);
        }
        assert_eq!(motor.speed(), 11.0);
        assert_eq!(motor.position(), 66.0);
    }

    #[test]
    fn large_steps_clamp_at_bound_and_stay() {
        let mut motor = MotorState::new(Axis::X, 100.0);
        let first = tick(&mut motor, &[MotorCommand::Velocity(50.0)]);
        assert_eq!(first.position, 50.0);
        assert!(!first.clamped);

        let second = tick(&mut motor, &[MotorCommand::Velocity(50.0)]);
        assert_eq!(second.pre_clamp, 150.0);
        assert_eq!(second.position, 100.0);
        assert!(second.clamped);

        let third = tick(&mut motor, &[MotorCommand::Velocity(50.0)]);
        assert_eq!(third.position, 100.0);
        assert_eq!(motor.speed(), 150.0);
    }

    #[test]
    fn reset_snaps_to_negative_bound_then_clamps() {
        let mut motor = MotorState::new(Axis::Z, 100.0);
        tick(&mut motor, &[MotorCommand::Velocity(75.0)]);
        tick(&mut motor, &[MotorCommand::Velocity(-70.0)]);
        assert_eq!(motor.position(), 80.0);
        assert_eq!(motor.speed(), 5.0);

        let reset = tick(&mut motor, &[MotorCommand::Reset]);
        assert!(reset.reset);
        assert_eq!(reset.speed, 0.0);
        assert_eq!(reset.pre_clamp, -100.0);
        assert_eq!(reset.position, 0.0);
    }

    #[test]
    fn stop_is_sticky_until_reset() {
        let mut motor = MotorState::new(Axis::X, 100.0);
        tick(&mut motor, &[MotorCommand::Velocity(3.0)]);
        tick(&mut motor, &[MotorCommand::Stop]);
        assert!(motor.is_stopped());

        let position = motor.position();
        for _ in 0..5 {
            tick(&mut motor, &[MotorCommand::Velocity(1.0)]);
        }
        assert_eq!(motor.speed(), 0.0);
        assert_eq!(motor.position(), position);

        tick(&mut motor, &[MotorCommand::Reset]);
        assert!(!motor.is_stopped());
        tick(&mut motor, &[MotorCommand::Velocity(2.0)]);
        assert_eq!(motor.position(), 2.0);
    }

    #[test]
    fn inspector_reset_then_commander_velocity_in_one_tick() {
        let mut motor = MotorState::new(Axis::X, 100.0);
        tick(&mut motor, &[MotorCommand::Stop]);
        let t = tick(
            &mut motor,
            &[MotorCommand::Reset, MotorCommand::Velocity(4.0)],
        );
        assert_eq!(t.speed, 4.0);
        assert_eq!(t.pre_clamp, -96.0);
        assert_eq!(t.position, 0.0);
    }

    #[test]
    fn shutdown_skips_integration() {
        let mut motor = MotorState::new(Axis::Z, 100.0);
        tick(&mut motor, &[MotorCommand::Velocity(10.0)]);
        let before = motor.clone();
        assert_eq!(
            motor.step(&[MotorCommand::Velocity(5.0), MotorCommand::Shutdown]),
            Outcome::Shutdown
        );
        assert_eq!(motor.position(), before.position());
    }

    #[test]
    fn no_commands_keeps_speed() {
        let mut motor = MotorState::new(Axis::X, 100.0);
        tick(&mut motor, &[MotorCommand::Velocity(2.0)]);
        tick(&mut motor, &[]);
        tick(&mut motor, &[]);
        assert_eq!(motor.position(), 6.0);
    }

    #[test]
    fn noise_stays_within_jitter_and_display_range() {
        let noise = TelemetryNoise {
            jitter: 0.5,
            display_max: 100.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for position in [0.0f32, 0.2, 50.0, 99.9, 100.0] {
            for _ in 0..100 {
                let reported = noise.estimate(position, &mut rng);
                assert!((0.0..=100.0).contains(&reported));
                assert!((reported - position).abs() <= 0.5);
            }
        }
    }

    #[test]
    fn zero_jitter_reports_exact_position() {
        let noise = TelemetryNoise {
            jitter: 0.0,
            display_max: 100.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(noise.estimate(42.0, &mut rng), 42.0);
    }
}
