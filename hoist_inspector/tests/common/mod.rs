//! Fake motors for inspector tests.
//!
//! A fake motor is a `sleep` process standing in for the real binary plus a
//! helper thread that performs the motor side of the boot handshake: it
//! publishes the sleeper's pid and opens the inspector command channel.

#![allow(dead_code)]

use hoist_common::channel::identity;
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use hoist_inspector::MotorLauncher;
use nix::sys::signal::{Signal, kill};
use std::io;
use std::process::{Child, Command};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

pub fn setup() -> (TempDir, ChannelDirectory, HoistConfig) {
    let tmp = TempDir::new().unwrap();
    let mut config = HoistConfig::default();
    config.paths.channel_dir = tmp.path().join("tmp");
    config.timing.respawn_timeout_ms = 3_000;
    let dir = ChannelDirectory::new(&config.paths.channel_dir);
    dir.prepare().unwrap();
    (tmp, dir, config)
}

pub fn sleeper() -> Child {
    Command::new("sleep").arg("30").spawn().unwrap()
}

pub fn identity_of(child: &Child) -> Identity {
    Identity {
        pid: child.id() as i32,
    }
}

pub fn kill_quietly(identity: Identity) {
    let _ = kill(identity.as_pid(), Signal::SIGKILL);
}

/// Motor-side command channel of a relaunched fake motor.
pub struct Booted {
    pub axis: Axis,
    pub identity: Identity,
    pub commands: ChannelReader<MotorCommand>,
}

pub struct FakeMotors {
    dir: ChannelDirectory,
    booted: Sender<Booted>,
}

impl FakeMotors {
    pub fn new(dir: &ChannelDirectory) -> (Self, Receiver<Booted>) {
        let (booted, rx) = mpsc::channel();
        (
            Self {
                dir: dir.clone(),
                booted,
            },
            rx,
        )
    }
}

impl MotorLauncher for FakeMotors {
    fn launch(&mut self, axis: Axis) -> io::Result<Child> {
        let child = sleeper();
        let identity = identity_of(&child);
        let dir = self.dir.clone();
        let booted = self.booted.clone();
        thread::spawn(move || {
            identity::publish(&dir.identity(Role::Motor(axis), Role::Inspector), identity)
                .unwrap();
            let commands =
                ChannelReader::open(dir.motor_commands(axis, Role::Inspector)).unwrap();
            booted
                .send(Booted {
                    axis,
                    identity,
                    commands,
                })
                .unwrap();
        });
        Ok(child)
    }
}

/// Wait for the helper threads of `count` launches.
pub fn collect(rx: &Receiver<Booted>, count: usize) -> AxisMap<Option<Booted>> {
    let mut out = AxisMap { x: None, z: None };
    for _ in 0..count {
        let booted = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let axis = booted.axis;
        out[axis] = Some(booted);
    }
    out
}

pub fn drain<R: Record>(reader: &mut ChannelReader<R>) -> Vec<R> {
    let mut records = Vec::new();
    while let Some(record) = reader.try_recv().unwrap() {
        records.push(record);
    }
    records
}
