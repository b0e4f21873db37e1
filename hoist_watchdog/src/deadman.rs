//! Dead-man switch timer state.

use tokio::time::{Duration, Instant};

/// A single countdown with a cancel flag.
///
/// Armed at the start of each window. Activity disarms it; a window that
/// elapses while still armed fires.
#[derive(Debug, Clone)]
pub struct DeadManSwitch {
    window: Duration,
    deadline: Option<Instant>,
}

impl DeadManSwitch {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Start a fresh window at `now` and return its deadline.
    pub fn arm(&mut self, now: Instant) -> Instant {
        let deadline = now + self.window;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Whether the window elapsed while armed. Firing disarms the switch.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn fires_once_after_window() {
        let start = Instant::now();
        let mut switch = DeadManSwitch::new(WINDOW);
        assert_eq!(switch.arm(start), start + WINDOW);

        assert!(!switch.expire(start + Duration::from_secs(59)));
        assert!(switch.expire(start + WINDOW));
        assert!(!switch.is_armed());
        assert!(!switch.expire(start + WINDOW * 2));
    }

    #[test]
    fn disarmed_switch_never_fires() {
        let start = Instant::now();
        let mut switch = DeadManSwitch::new(WINDOW);
        switch.arm(start);
        switch.disarm();
        assert!(!switch.expire(start + WINDOW * 10));
    }

    #[test]
    fn rearming_moves_deadline() {
        let start = Instant::now();
        let mut switch = DeadManSwitch::new(WINDOW);
        switch.arm(start);
        let later = start + Duration::from_secs(30);
        switch.arm(later);
        assert!(!switch.expire(start + WINDOW));
        assert_eq!(switch.deadline(), Some(later + WINDOW));
    }
}
