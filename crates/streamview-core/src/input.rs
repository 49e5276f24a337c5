//! Window and keyboard events, backend-neutral.
//!
//! Renderer backends translate their native events into `InputEvent` so the
//! main loop never sees a windowing-library type.

// MARK: - Key

/// Keys the player reacts to. Everything else arrives as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Q,
    Space,
    Other,
}

// MARK: - InputEvent

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Window resized to the given size, as reported by the window system.
    Resized { width: i32, height: i32 },

    /// Window closed or the process was asked to quit.
    Quit,

    /// Key pressed.
    KeyDown(Key),

    /// The engine asked for the pending frame to become visible.
    PresentRequested,
}

// MARK: - Action

/// What a key press does to the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePause,
}

impl Key {
    pub fn action(&self) -> Option<Action> {
        match self {
            Key::Escape | Key::Q => Some(Action::Quit),
            Key::Space => Some(Action::TogglePause),
            Key::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys() {
        assert_eq!(Key::Escape.action(), Some(Action::Quit));
        assert_eq!(Key::Q.action(), Some(Action::Quit));
    }

    #[test]
    fn space_toggles_pause() {
        assert_eq!(Key::Space.action(), Some(Action::TogglePause));
        assert_eq!(Key::Other.action(), None);
    }
}
