//! Motor supervision against fake motor processes.

mod common;

use common::{FakeMotors, collect, drain, identity_of, kill_quietly, setup, sleeper};
use hoist_common::prelude::*;
use hoist_common::supervisor::is_alive;
use hoist_inspector::{MotorLauncher, MotorSupervisor};
use nix::sys::signal::Signal;
use std::cell::Cell;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::Child;
use std::rc::Rc;

/// Command readers standing in for the motors found at boot.
fn boot_channels(dir: &ChannelDirectory) -> AxisMap<ChannelReader<MotorCommand>> {
    AxisMap::from_fn(|axis| ChannelReader::open(dir.motor_commands(axis, Role::Inspector)).unwrap())
}

#[test]
fn adopted_motors_receive_commands() {
    let (_tmp, dir, config) = setup();
    let mut readers = boot_channels(&dir);
    let (launcher, _rx) = FakeMotors::new(&dir);
    let identities = AxisMap::from_fn(|_| Identity::current());

    let mut supervisor =
        MotorSupervisor::adopt(dir, launcher, config.timing.respawn_timeout(), identities).unwrap();

    supervisor.send(Axis::Z, MotorCommand::Stop).unwrap();
    supervisor.broadcast(MotorCommand::Reset).unwrap();

    assert_eq!(drain(&mut readers.x), vec![MotorCommand::Reset]);
    assert_eq!(
        drain(&mut readers.z),
        vec![MotorCommand::Stop, MotorCommand::Reset]
    );
    assert_eq!(supervisor.motor(Axis::X).generation(), 0);
    assert_eq!(supervisor.identities(), identities);
}

#[test]
fn forceful_terminate_kills_and_respawn_reconnects() {
    let (_tmp, dir, config) = setup();
    let _readers = boot_channels(&dir);
    let (launcher, rx) = FakeMotors::new(&dir);
    let mut originals = AxisMap::from_fn(|_| sleeper());
    let identities = AxisMap::from_fn(|axis| identity_of(&originals[axis]));

    let mut supervisor =
        MotorSupervisor::adopt(dir, launcher, config.timing.respawn_timeout(), identities).unwrap();

    supervisor.terminate(Axis::X, true).unwrap();
    let status = originals.x.wait().unwrap();
    assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));

    // Killing a process that is already gone is not an error.
    supervisor.terminate(Axis::X, true).unwrap();

    let fresh = supervisor.respawn(Axis::X).unwrap();
    let mut booted = collect(&rx, 1).x.unwrap();
    assert_eq!(fresh, booted.identity);
    assert_ne!(fresh, identities.x);
    assert_eq!(supervisor.motor(Axis::X).generation(), 1);
    assert_eq!(supervisor.motor(Axis::Z).generation(), 0);

    supervisor.send(Axis::X, MotorCommand::Velocity(2.0)).unwrap();
    assert_eq!(drain(&mut booted.commands), vec![MotorCommand::Velocity(2.0)]);

    // A launched motor is reaped by terminate.
    supervisor.terminate(Axis::X, true).unwrap();
    assert!(!is_alive(fresh));

    supervisor.terminate(Axis::Z, true).unwrap();
    originals.z.wait().unwrap();
}

#[test]
fn replace_all_relaunches_both_axes() {
    let (_tmp, dir, config) = setup();
    let _readers = boot_channels(&dir);
    let (launcher, rx) = FakeMotors::new(&dir);
    let identities = AxisMap::from_fn(|_| Identity::current());

    let mut supervisor =
        MotorSupervisor::adopt(dir, launcher, config.timing.respawn_timeout(), identities).unwrap();

    let fresh = supervisor.replace_all().unwrap();
    let booted = collect(&rx, 2);
    for axis in Axis::ALL {
        let motor = booted[axis].as_ref().unwrap();
        assert_eq!(fresh[axis], motor.identity);
        assert_eq!(supervisor.motor(axis).identity(), motor.identity);
        assert_eq!(supervisor.motor(axis).generation(), 1);
    }

    for axis in Axis::ALL {
        supervisor.terminate(axis, true).unwrap();
        assert!(!is_alive(fresh[axis]));
    }
}

#[test]
fn graceful_terminate_sends_shutdown() {
    let (_tmp, dir, config) = setup();
    let mut readers = boot_channels(&dir);
    let (launcher, _rx) = FakeMotors::new(&dir);
    let identities = AxisMap::from_fn(|_| Identity::current());

    let mut supervisor =
        MotorSupervisor::adopt(dir, launcher, config.timing.respawn_timeout(), identities).unwrap();

    supervisor.terminate(Axis::X, false).unwrap();
    assert_eq!(drain(&mut readers.x), vec![MotorCommand::Shutdown]);
    assert!(drain(&mut readers.z).is_empty());

    // The motor already released its channel.
    let AxisMap { x, z: _z } = readers;
    x.close();
    supervisor.terminate(Axis::X, false).unwrap();
}

#[test]
fn respawn_times_out_without_identity() {
    let (_tmp, dir, mut config) = setup();
    config.timing.respawn_timeout_ms = 100;
    let _readers = boot_channels(&dir);
    let identities = AxisMap::from_fn(|_| Identity::current());

    // Launches a process that never performs the handshake.
    struct Silent(Rc<Cell<Option<Identity>>>);
    impl MotorLauncher for Silent {
        fn launch(&mut self, _axis: Axis) -> io::Result<Child> {
            let child = sleeper();
            self.0.set(Some(identity_of(&child)));
            Ok(child)
        }
    }

    let launched = Rc::new(Cell::new(None));
    let mut supervisor = MotorSupervisor::adopt(
        dir,
        Silent(Rc::clone(&launched)),
        config.timing.respawn_timeout(),
        identities,
    )
    .unwrap();

    let err = supervisor.respawn(Axis::Z).unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::IdentityTimeout { axis: Axis::Z, .. }
    ));
    assert!(err.to_string().contains("motor z"));
    // The old identity is kept.
    assert_eq!(supervisor.motor(Axis::Z).identity(), identities.z);

    kill_quietly(launched.get().unwrap());
}
