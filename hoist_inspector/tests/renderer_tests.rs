//! Renderer over real telemetry FIFOs.

mod common;

use common::setup;
use hoist_common::prelude::*;
use hoist_common::terminal::{AsciiHoist, Render};
use hoist_inspector::Renderer;
use std::io;
use std::thread;

#[derive(Default)]
struct Frames(Vec<(f32, f32)>);

impl Render for Frames {
    fn render(&mut self, x: f32, z: f32) -> io::Result<()> {
        self.0.push((x, z));
        Ok(())
    }
}

#[test]
fn renders_one_frame_per_pair_of_readings() {
    let (_tmp, dir, config) = setup();
    let mut renderer = Renderer::connect(&dir, &config, Frames::default()).unwrap();
    let mut motors =
        AxisMap::from_fn(|axis| ChannelWriter::<Telemetry>::open(dir.telemetry(axis)).unwrap());

    motors.z.send(&Telemetry { position: 3.0 }).unwrap();
    motors.x.send(&Telemetry { position: 10.0 }).unwrap();
    motors.x.send(&Telemetry { position: 11.0 }).unwrap();
    motors.z.send(&Telemetry { position: 4.0 }).unwrap();

    assert_eq!(renderer.render_once().unwrap(), AxisMap { x: 10.0, z: 3.0 });
    assert_eq!(renderer.render_once().unwrap(), AxisMap { x: 11.0, z: 4.0 });
    assert_eq!(renderer.display().0, vec![(10.0, 3.0), (11.0, 4.0)]);
}

#[test]
fn waits_for_the_slower_axis() {
    let (_tmp, dir, config) = setup();
    let mut renderer = Renderer::connect(&dir, &config, Frames::default()).unwrap();
    let mut x = ChannelWriter::<Telemetry>::open(dir.telemetry(Axis::X)).unwrap();
    x.send(&Telemetry { position: 1.0 }).unwrap();

    let z_path = dir.telemetry(Axis::Z);
    let late = thread::spawn(move || {
        thread::sleep(std::time::Duration::from_millis(50));
        let mut z = ChannelWriter::<Telemetry>::open(z_path).unwrap();
        z.send(&Telemetry { position: 2.0 }).unwrap();
    });

    assert_eq!(renderer.render_once().unwrap(), AxisMap { x: 1.0, z: 2.0 });
    late.join().unwrap();
}

#[test]
fn ascii_display_writes_coordinates() {
    let (_tmp, dir, config) = setup();
    let display = AsciiHoist::new(Vec::new(), config.telemetry.display_max);
    let mut renderer = Renderer::connect(&dir, &config, display).unwrap();
    let mut motors =
        AxisMap::from_fn(|axis| ChannelWriter::<Telemetry>::open(dir.telemetry(axis)).unwrap());

    motors.x.send(&Telemetry { position: 12.0 }).unwrap();
    motors.z.send(&Telemetry { position: 0.5 }).unwrap();
    renderer.render_once().unwrap();

    let frame = String::from_utf8(renderer.into_display().into_inner()).unwrap();
    assert!(frame.contains("X: 12.0 | Z: 0.5"), "{frame}");
}
