//! Keyboard and cursor state collected from window events
//!
//! The window feeds raw events in; the camera reads this state once per frame.
//! Keys are translated to [`KeyCode`] at the window boundary so nothing below
//! it depends on glfw.

use std::collections::HashSet;

/// Keys the harness reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Move forward
    W,
    /// Strafe left
    A,
    /// Move back
    S,
    /// Strafe right
    D,
    /// Move up
    Space,
    /// Move down
    LeftShift,
    /// Close the window
    Escape,
}

/// Pressed keys and accumulated cursor movement
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    last_cursor: Option<(f64, f64)>,
    cursor_delta: (f64, f64),
}

impl InputState {
    /// Create an empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press or release
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    /// Record an absolute cursor position
    ///
    /// The first sample only establishes the reference point; later samples
    /// add their offset from the previous one.
    pub fn handle_mouse_move(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.last_cursor {
            self.cursor_delta.0 += x - last_x;
            self.cursor_delta.1 += y - last_y;
        }
        self.last_cursor = Some((x, y));
    }

    /// Whether a key is held down
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Cursor movement since the last call, then reset to zero
    pub fn take_cursor_delta(&mut self) -> (f64, f64) {
        std::mem::take(&mut self.cursor_delta)
    }

    /// Forget held keys and the cursor reference, e.g. after focus loss
    pub fn reset(&mut self) {
        self.pressed.clear();
        self.last_cursor = None;
        self.cursor_delta = (0.0, 0.0);
    }
}
