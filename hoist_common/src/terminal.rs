//! Terminal collaborators: raw key capture and the ASCII hoist display.

use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use tracing::debug;

/// Key codes understood by the actors.
pub mod keys {
    pub const LEFT: u8 = b'a';
    pub const RIGHT: u8 = b'd';
    pub const UP: u8 = b'w';
    pub const DOWN: u8 = b's';
    pub const HALT_X: u8 = b'x';
    pub const HALT_Z: u8 = b'z';
    pub const QUIT: u8 = b'q';
    /// Ctrl+C as delivered in raw mode (ISIG is cleared).
    pub const INTERRUPT: u8 = 0x03;
    pub const RESET: u8 = b'r';
    pub const EMERGENCY: u8 = b' ';
}

/// Blocking source of single key presses.
pub trait KeySource {
    /// Wait for the next key.
    fn next_key(&mut self) -> io::Result<u8>;
}

/// Keyboard on stdin, switched to raw mode for the lifetime of the value.
///
/// Raw here means no line buffering, no echo and no signal generation: every
/// byte, Ctrl+C included, is delivered as a key. The previous settings are
/// restored on drop. When stdin is not a terminal the mode is left alone.
pub struct TerminalKeys {
    input: File,
    saved: Option<Termios>,
}

impl TerminalKeys {
    pub fn raw() -> io::Result<Self> {
        let stdin = io::stdin();
        // Reading through our own descriptor bypasses Stdin's buffer, so a
        // poll on the fd never misses a key already slurped into userspace.
        let input = File::from(stdin.as_fd().try_clone_to_owned()?);

        let saved = if stdin.is_terminal() {
            let original = termios::tcgetattr(&input).map_err(io::Error::from)?;
            let mut raw = original.clone();
            raw.local_flags
                .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::ISIG);
            raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
            raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
            termios::tcsetattr(&input, SetArg::TCSANOW, &raw).map_err(io::Error::from)?;
            debug!("Terminal switched to raw mode");
            Some(original)
        } else {
            None
        };

        Ok(Self { input, saved })
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.input.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

impl AsFd for TerminalKeys {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.input.as_fd()
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            let _ = termios::tcsetattr(&self.input, SetArg::TCSANOW, &saved);
        }
    }
}

/// Pre-recorded keys. Reports `UnexpectedEof` once exhausted.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeys {
    keys: VecDeque<u8>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = u8>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> io::Result<u8> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more scripted keys"))
    }
}

/// Display of the current hoist position.
pub trait Render {
    fn render(&mut self, x: f32, z: f32) -> io::Result<()>;
}

/// Horizontal units per character column.
const X_SCALE: f32 = 1.5;
/// Vertical units per text row.
const Z_SCALE: f32 = 7.5;

const ANSI_CLEAR: &str = "\x1bc";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_TITLE: &str = "\x1b[1;32m";
const ANSI_CONSOLE: &str = "\x1b[1;35m";
const ANSI_BODY: &str = "\x1b[1;33m";
const ANSI_KEY: &str = "\x1b[1;31m";
const ANSI_COORDS: &str = "\x1b[1;34m";

/// Plain-text drawing of the hoist for positions in `[0, max]`.
///
/// Layout, top to bottom: the track with the body `H`, one `|` cable row per
/// vertical step, the hook `J`, blank rows down to the floor, the floor `_`.
pub fn draw_frame(x: f32, z: f32, max: f32) -> String {
    let width = (max / X_SCALE).ceil() as usize;
    let depth = (max / Z_SCALE).ceil() as usize;
    let col = ((x.clamp(0.0, max) / X_SCALE).round() as usize).min(width.saturating_sub(1));
    let rows = ((z.clamp(0.0, max) / Z_SCALE).round() as usize).min(depth);

    let mut out = String::new();
    for i in 0..width {
        out.push(match i {
            i if i == col => 'H',
            i if i % 2 == 0 => '=',
            _ => '-',
        });
    }
    out.push('\n');

    let pad = " ".repeat(col);
    for _ in 0..rows {
        out.push_str(&pad);
        out.push_str("|\n");
    }
    out.push_str(&pad);
    out.push_str("J\n");
    for _ in rows..depth {
        out.push('\n');
    }
    out.push_str(&"_".repeat(width));
    out.push('\n');
    out
}

/// Coordinate line shown below the frame.
pub fn coordinates_line(x: f32, z: f32) -> String {
    format!("X: {x:.1} | Z: {z:.1}")
}

fn banner(console: &str) -> String {
    format!(
        "{ANSI_TITLE}HOIST: two-axis gantry simulator{ANSI_RESET}\n\n{ANSI_CONSOLE}{console} Console{ANSI_RESET}\n\n"
    )
}

/// Help screen printed by the commander.
pub fn commander_banner() -> String {
    let mut out = banner("Commander");
    let entries = [
        ("LEFT", "A"),
        ("RIGHT", "D"),
        ("UP", "W"),
        ("DOWN", "S"),
        ("HALT X AXIS", "X"),
        ("HALT Z AXIS", "Z"),
        ("QUIT", "Q"),
    ];
    let help: Vec<String> = entries
        .iter()
        .map(|(label, key)| format!("{ANSI_KEY}{label}: {ANSI_RESET}{key}"))
        .collect();
    out.push_str(&help.join(" | "));
    out.push('\n');
    out
}

/// Colored ASCII hoist written to any terminal-like sink.
pub struct AsciiHoist<W: Write> {
    out: W,
    max: f32,
}

impl<W: Write> AsciiHoist<W> {
    pub fn new(out: W, max: f32) -> Self {
        Self { out, max }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for AsciiHoist<W> {
    fn render(&mut self, x: f32, z: f32) -> io::Result<()> {
        let frame = draw_frame(x, z, self.max);
        write!(
            self.out,
            "{ANSI_CLEAR}{}{ANSI_BODY}{frame}{ANSI_RESET}\n{ANSI_KEY}RESET HOIST: {ANSI_RESET}R | {ANSI_KEY}EMERGENCY STOP: {ANSI_RESET}spacebar       {ANSI_COORDS}{}{ANSI_RESET}\n",
            banner("Inspector"),
            coordinates_line(x, z),
        )?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_places_body_and_hook_in_same_column() {
        let frame = draw_frame(30.0, 15.0, 100.0);
        let lines: Vec<&str> = frame.lines().collect();

        let body = lines[0].find('H').unwrap();
        assert_eq!(body, 20);
        assert_eq!(lines[1].find('|'), Some(body));
        assert_eq!(lines[2].find('|'), Some(body));
        assert_eq!(lines[3].find('J'), Some(body));
        assert!(lines.last().unwrap().chars().all(|c| c == '_'));
    }

    #[test]
    fn frame_height_is_independent_of_depth() {
        let top = draw_frame(0.0, 0.0, 100.0);
        let bottom = draw_frame(100.0, 100.0, 100.0);
        assert_eq!(top.lines().count(), bottom.lines().count());
        assert!(bottom.lines().next().unwrap().ends_with('H'));
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        assert_eq!(draw_frame(-5.0, -5.0, 100.0), draw_frame(0.0, 0.0, 100.0));
        assert_eq!(
            draw_frame(250.0, 250.0, 100.0),
            draw_frame(100.0, 100.0, 100.0)
        );
    }

    #[test]
    fn render_includes_coordinates() {
        let mut hoist = AsciiHoist::new(Vec::new(), 100.0);
        hoist.render(12.34, 56.78).unwrap();
        let text = String::from_utf8(hoist.into_inner()).unwrap();
        assert!(text.contains("X: 12.3 | Z: 56.8"));
        assert!(text.contains("EMERGENCY STOP"));
    }

    #[test]
    fn scripted_keys_run_dry() {
        let mut keys = ScriptedKeys::new(*b"ad");
        assert_eq!(keys.next_key().unwrap(), b'a');
        assert_eq!(keys.next_key().unwrap(), b'd');
        assert_eq!(
            keys.next_key().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
