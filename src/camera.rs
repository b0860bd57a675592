//! A free-flying Euler-angle camera.
//!
//! [`Camera`] keeps yaw and pitch in degrees and derives its `front`, `right`
//! and `up` basis from them after every orientation change. It knows nothing
//! about windows or keys: the [`InputRouter`](crate::InputRouter) translates
//! input into the three `process_*` calls.
//!
//! # Example
//!
//! ```
//! use lantern::{Camera, CameraMovement};
//!
//! let mut camera = Camera::new();
//! camera.process_keyboard([CameraMovement::Forward], 1.0);
//! camera.process_mouse_movement(10.0, -5.0);
//! let view = camera.view_matrix();
//! # let _ = view;
//! ```

use glam::{Mat4, Vec3};

/// Pitch is held short of the poles so the basis never flips.
pub const PITCH_LIMIT: f32 = 89.0;

/// Default yaw: looking down -Z.
pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

/// A direction the camera can be pushed in by held keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Inclusive bounds for the camera's field of view, in degrees.
///
/// The bounds are always ordered; [`new`](Self::new) swaps inverted input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomRange {
    min: f32,
    max: f32,
}

impl ZoomRange {
    pub fn new(a: f32, b: f32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::new(1.0, 45.0)
    }
}

/// First-person camera state.
///
/// The basis vectors are private so they can only change through
/// [`update_vectors`](Self::update_vectors), which keeps them orthonormal.
#[derive(Clone, Debug)]
pub struct Camera {
    /// World-space position.
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    /// Degrees of rotation per unit of cursor offset.
    pub sensitivity: f32,
    zoom: f32,
    zoom_range: ZoomRange,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            speed: DEFAULT_SPEED,
            sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
            zoom_range: ZoomRange::default(),
        };
        camera.update_vectors();
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting position.
    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the starting orientation in degrees. Pitch is clamped.
    pub fn orientation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set the zoom bounds. The current zoom is pulled into the new range.
    pub fn zoom_range(mut self, range: ZoomRange) -> Self {
        self.zoom_range = range;
        self.zoom = range.clamp(self.zoom);
        self
    }

    /// Set the field of view in degrees, clamped to the zoom range.
    pub fn zoom(mut self, zoom: f32) -> Self {
        self.zoom = self.zoom_range.clamp(zoom);
        self
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Yaw in degrees.
    pub fn yaw_degrees(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, always within ±[`PITCH_LIMIT`].
    pub fn pitch_degrees(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn fov_degrees(&self) -> f32 {
        self.zoom
    }

    /// Move along the camera basis for every direction given.
    ///
    /// Directions add up without normalization, so a diagonal moves faster
    /// than a single axis.
    pub fn process_keyboard<I>(&mut self, directions: I, delta_time: f32)
    where
        I: IntoIterator<Item = CameraMovement>,
    {
        let step = self.speed * delta_time;
        for direction in directions {
            let axis = match direction {
                CameraMovement::Forward => self.front,
                CameraMovement::Backward => -self.front,
                CameraMovement::Left => -self.right,
                CameraMovement::Right => self.right,
                CameraMovement::Up => self.up,
                CameraMovement::Down => -self.up,
            };
            self.position += axis * step;
        }
    }

    /// Rotate by a cursor offset. Positive `yoffset` looks up.
    pub fn process_mouse_movement(&mut self, xoffset: f32, yoffset: f32) {
        self.yaw += xoffset * self.sensitivity;
        self.pitch = (self.pitch + yoffset * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Narrow the field of view for positive scroll, widen it for negative.
    pub fn process_mouse_scroll(&mut self, yoffset: f32) {
        self.zoom = self.zoom_range.clamp(self.zoom - yoffset);
    }

    /// Right-handed look-at matrix for the current state.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
