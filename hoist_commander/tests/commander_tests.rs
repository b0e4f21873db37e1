//! Commander dispatch tests over real FIFOs.
//!
//! The test owns the reader end of every channel the commander writes to and
//! checks exactly which records arrive where.

use hoist_commander::{Action, CommanderContext, Flow};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use hoist_common::terminal::ScriptedKeys;
use tempfile::TempDir;

struct Peers {
    motors: AxisMap<ChannelReader<MotorCommand>>,
    watchdog: ChannelReader<ControlMessage>,
    inspector: ChannelReader<ControlMessage>,
}

impl Peers {
    fn open(dir: &ChannelDirectory) -> Self {
        Self {
            motors: AxisMap::from_fn(|axis| {
                ChannelReader::open(dir.motor_commands(axis, Role::Commander)).unwrap()
            }),
            watchdog: ChannelReader::open(dir.control(Role::Watchdog, Role::Commander)).unwrap(),
            inspector: ChannelReader::open(dir.control(Role::Inspector, Role::Commander)).unwrap(),
        }
    }
}

fn drain<R: Record>(reader: &mut ChannelReader<R>) -> Vec<R> {
    let mut records = Vec::new();
    while let Some(record) = reader.try_recv().unwrap() {
        records.push(record);
    }
    records
}

fn setup() -> (TempDir, ChannelDirectory, HoistConfig) {
    let tmp = TempDir::new().unwrap();
    let mut config = HoistConfig::default();
    config.paths.channel_dir = tmp.path().join("tmp");
    config.timing.quit_grace_ms = 0;
    let dir = ChannelDirectory::new(&config.paths.channel_dir);
    dir.prepare().unwrap();
    (tmp, dir, config)
}

#[test]
fn key_script_routes_commands_and_pings() {
    let (_tmp, dir, config) = setup();
    let mut peers = Peers::open(&dir);
    let mut commander = CommanderContext::connect(&dir, &config).unwrap();

    let mut keys = ScriptedKeys::new(*b"adwsxz?rq");
    commander.run(&mut keys).unwrap();

    assert_eq!(
        drain(&mut peers.motors.x),
        vec![
            MotorCommand::Velocity(-1.0),
            MotorCommand::Velocity(1.0),
            MotorCommand::Stop,
            MotorCommand::Shutdown,
        ]
    );
    assert_eq!(
        drain(&mut peers.motors.z),
        vec![
            MotorCommand::Velocity(-1.0),
            MotorCommand::Velocity(1.0),
            MotorCommand::Stop,
            MotorCommand::Shutdown,
        ]
    );

    let mut expected = vec![ControlMessage::Ping; 6];
    expected.push(ControlMessage::Terminate);
    assert_eq!(drain(&mut peers.watchdog), expected);
    assert_eq!(drain(&mut peers.inspector), vec![ControlMessage::Terminate]);
}

#[test]
fn end_of_input_quits() {
    let (_tmp, dir, config) = setup();
    let mut peers = Peers::open(&dir);
    let mut commander = CommanderContext::connect(&dir, &config).unwrap();

    commander.run(&mut ScriptedKeys::new([b'd'])).unwrap();

    assert_eq!(
        drain(&mut peers.motors.x),
        vec![MotorCommand::Velocity(1.0), MotorCommand::Shutdown]
    );
    assert_eq!(drain(&mut peers.inspector), vec![ControlMessage::Terminate]);
}

#[test]
fn ctrl_c_byte_quits_before_remaining_keys() {
    let (_tmp, dir, config) = setup();
    let mut peers = Peers::open(&dir);
    let mut commander = CommanderContext::connect(&dir, &config).unwrap();

    commander.run(&mut ScriptedKeys::new([0x03, b'a'])).unwrap();

    assert_eq!(drain(&mut peers.motors.x), vec![MotorCommand::Shutdown]);
    assert_eq!(drain(&mut peers.watchdog), vec![ControlMessage::Terminate]);
}

#[test]
fn command_to_replaced_motor_is_dropped() {
    let (_tmp, dir, config) = setup();
    let Peers {
        motors,
        mut watchdog,
        inspector: _inspector,
    } = Peers::open(&dir);
    let mut commander = CommanderContext::connect(&dir, &config).unwrap();

    // Motor X goes away: its reader closes.
    let AxisMap { x, z: mut motor_z } = motors;
    x.close();

    let nudge_x = Action::Nudge {
        axis: Axis::X,
        delta: 1.0,
    };
    assert_eq!(commander.dispatch(nudge_x).unwrap(), Flow::Continue);
    assert_eq!(commander.dropped(), 1);

    assert_eq!(commander.dispatch(Action::Halt(Axis::Z)).unwrap(), Flow::Continue);
    assert_eq!(drain(&mut motor_z), vec![MotorCommand::Stop]);
    assert_eq!(drain(&mut watchdog), vec![ControlMessage::Ping; 2]);
}
