//! Key bindings of the commander console.

use hoist_common::axis::Axis;
use hoist_common::consts::VELOCITY_STEP;
use hoist_common::terminal::keys;

/// What a key press asks the commander to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Add `delta` to the speed of `axis`.
    Nudge { axis: Axis, delta: f32 },
    /// Non-emergency STOP of one axis.
    Halt(Axis),
    /// Shut the whole hoist down.
    Quit,
}

/// Map a key to its action. Unbound keys yield `None`.
pub fn action_for(key: u8) -> Option<Action> {
    let action = match key {
        keys::LEFT => Action::Nudge {
            axis: Axis::X,
            delta: -VELOCITY_STEP,
        },
        keys::RIGHT => Action::Nudge {
            axis: Axis::X,
            delta: VELOCITY_STEP,
        },
        keys::UP => Action::Nudge {
            axis: Axis::Z,
            delta: -VELOCITY_STEP,
        },
        keys::DOWN => Action::Nudge {
            axis: Axis::Z,
            delta: VELOCITY_STEP,
        },
        keys::HALT_X => Action::Halt(Axis::X),
        keys::HALT_Z => Action::Halt(Axis::Z),
        keys::QUIT | keys::INTERRUPT => Action::Quit,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys() {
        assert_eq!(
            action_for(b'a'),
            Some(Action::Nudge {
                axis: Axis::X,
                delta: -1.0
            })
        );
        assert_eq!(
            action_for(b'd'),
            Some(Action::Nudge {
                axis: Axis::X,
                delta: 1.0
            })
        );
        assert_eq!(
            action_for(b'w'),
            Some(Action::Nudge {
                axis: Axis::Z,
                delta: -1.0
            })
        );
        assert_eq!(
            action_for(b's'),
            Some(Action::Nudge {
                axis: Axis::Z,
                delta: 1.0
            })
        );
    }

    #[test]
    fn halt_and_quit_keys() {
        assert_eq!(action_for(b'x'), Some(Action::Halt(Axis::X)));
        assert_eq!(action_for(b'z'), Some(Action::Halt(Axis::Z)));
        assert_eq!(action_for(b'q'), Some(Action::Quit));
        assert_eq!(action_for(0x03), Some(Action::Quit));
    }

    #[test]
    fn other_keys_are_ignored() {
        for key in [b'r', b' ', b'A', b'\n', 0x1b] {
            assert_eq!(action_for(key), None);
        }
    }
}
