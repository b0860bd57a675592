use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Per-frame keyboard snapshot.
///
/// `keys_pressed` only records the released-to-pressed transition, so OS key
/// repeat never shows up as a second press while a key is held.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    /// Record a key going down. Repeats of a held key are ignored.
    pub fn press(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    /// Drop every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_down.clear();
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key went down this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once_while_held() {
        let mut input = Input::new();
        input.press(KeyCode::Escape);
        assert!(input.key_pressed(KeyCode::Escape));

        input.begin_frame();
        input.press(KeyCode::Escape); // key repeat
        assert!(input.key_down(KeyCode::Escape));
        assert!(!input.key_pressed(KeyCode::Escape));
    }

    #[test]
    fn release_then_press_fires_again() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        input.begin_frame();
        input.release(KeyCode::KeyW);
        assert!(!input.key_down(KeyCode::KeyW));

        input.begin_frame();
        input.press(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut input = Input::new();
        input.press(KeyCode::KeyA);
        input.press(KeyCode::KeyD);
        input.release_all();
        assert!(!input.key_down(KeyCode::KeyA));
        assert!(!input.key_down(KeyCode::KeyD));
    }
}
