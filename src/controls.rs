//! Routing of keyboard and cursor input into camera commands.
//!
//! The [`InputRouter`] owns the cursor-lock mode. Escape is overloaded: the
//! first press releases the cursor, a second press while released asks the
//! viewer to close. A dedicated lock key grabs the cursor again.
//!
//! ```text
//!            Escape                    Escape
//!  Locked ───────────▶ Unlocked ───────────────▶ close requested
//!    ▲                    │
//!    └────── lock key ────┘
//! ```

use glam::Vec2;
use log::debug;
use winit::keyboard::KeyCode;

use crate::camera::{Camera, CameraMovement};
use crate::input::Input;

/// Whether cursor motion currently steers the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorLock {
    #[default]
    Locked,
    Unlocked,
}

/// A change the router made this frame that the window needs to mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockTransition {
    /// The cursor was released for free use.
    Released,
    /// The cursor was captured again.
    Relocked,
    /// Escape was pressed while already released.
    CloseRequested,
}

/// Key assignments for the router.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyBindings {
    pub movement: Vec<(KeyCode, CameraMovement)>,
    pub release: KeyCode,
    pub lock: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            movement: vec![
                (KeyCode::KeyW, CameraMovement::Forward),
                (KeyCode::KeyS, CameraMovement::Backward),
                (KeyCode::KeyA, CameraMovement::Left),
                (KeyCode::KeyD, CameraMovement::Right),
                (KeyCode::Space, CameraMovement::Up),
                (KeyCode::ShiftLeft, CameraMovement::Down),
            ],
            release: KeyCode::Escape,
            lock: KeyCode::KeyL,
        }
    }
}

/// Turns absolute cursor positions into offsets.
///
/// The first sample after a [`reset`](Self::reset) only records a reference
/// point, so re-capturing the cursor never makes the camera jump.
#[derive(Clone, Copy, Debug, Default)]
pub struct CursorTracker {
    last: Option<Vec2>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset since the previous sample. Y is flipped so that moving the
    /// cursor up gives a positive offset.
    pub fn sample(&mut self, position: Vec2) -> Vec2 {
        let offset = match self.last {
            Some(last) => Vec2::new(position.x - last.x, last.y - position.y),
            None => Vec2::ZERO,
        };
        self.last = Some(position);
        offset
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Applies per-frame input to a [`Camera`] and tracks the cursor lock.
#[derive(Debug, Default)]
pub struct InputRouter {
    bindings: KeyBindings,
    lock: CursorLock,
    cursor: CursorTracker,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            lock: CursorLock::Locked,
            cursor: CursorTracker::new(),
        }
    }

    pub fn lock_state(&self) -> CursorLock {
        self.lock
    }

    /// Handle this frame's keys: movement goes to the camera, the escape and
    /// lock keys drive the lock state.
    pub fn route_keys(
        &mut self,
        input: &Input,
        camera: &mut Camera,
        delta_time: f32,
    ) -> Option<LockTransition> {
        let held = self
            .bindings
            .movement
            .iter()
            .filter(|(key, _)| input.key_down(*key))
            .map(|(_, movement)| *movement);
        camera.process_keyboard(held, delta_time);

        let transition = if input.key_pressed(self.bindings.release) {
            match self.lock {
                CursorLock::Locked => {
                    self.lock = CursorLock::Unlocked;
                    Some(LockTransition::Released)
                }
                CursorLock::Unlocked => Some(LockTransition::CloseRequested),
            }
        } else if self.lock == CursorLock::Unlocked && input.key_pressed(self.bindings.lock) {
            self.lock = CursorLock::Locked;
            self.cursor.reset();
            Some(LockTransition::Relocked)
        } else {
            None
        };

        if let Some(transition) = transition {
            debug!("cursor lock transition: {transition:?}");
        }
        transition
    }

    /// Feed one cursor sample. Ignored entirely while unlocked.
    pub fn cursor_moved(&mut self, position: Vec2, camera: &mut Camera) {
        if self.lock == CursorLock::Unlocked {
            return;
        }
        let offset = self.cursor.sample(position);
        camera.process_mouse_movement(offset.x, offset.y);
    }

    /// Feed one relative pointer motion, for windows whose cursor is pinned
    /// in place while locked. `delta` is in screen orientation (y down).
    /// Ignored while unlocked.
    pub fn pointer_moved(&mut self, delta: Vec2, camera: &mut Camera) {
        if self.lock == CursorLock::Unlocked {
            return;
        }
        camera.process_mouse_movement(delta.x, -delta.y);
    }
}
