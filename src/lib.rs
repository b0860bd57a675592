//! # Lantern
//!
//! **A free-flying camera viewer for a field of textured, lit cubes.**
//!
//! Fly with WASD, Space and Left Shift, look around with the mouse and zoom
//! with the scroll wheel. Escape releases the cursor, a second Escape closes
//! the window and `L` captures the cursor again.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lantern::{ViewerConfig, run};
//!
//! fn main() -> Result<(), lantern::ViewerError> {
//!     run(ViewerConfig::new().title("Cubes").dynamic_light(true))
//! }
//! ```
//!
//! ## Layout
//!
//! - [`Camera`] is pure math: yaw/pitch orientation, movement and zoom.
//! - [`InputRouter`] turns keys and cursor motion into camera commands and
//!   owns the cursor lock.
//! - [`ShaderProgram`] builds a pipeline from two WGSL files and exposes
//!   uniforms by name.
//! - [`FrameRenderer`] draws one frame of the scene with the current
//!   camera.
//! - [`ViewerContext`] ties the window-independent parts together and is
//!   what the event loop in [`run`] drives.

mod app;
mod camera;
mod config;
mod controls;
mod error;
mod gpu;
mod input;
mod mesh;
mod renderer;
pub mod scene;
pub mod shader;
mod texture;
mod timing;

pub use app::{ViewerContext, WindowCallbacks, run};
pub use camera::{Camera, CameraMovement, ZoomRange};
pub use config::{ShaderPaths, ViewerConfig};
pub use controls::{CursorLock, CursorTracker, InputRouter, KeyBindings, LockTransition};
pub use error::{ShaderError, ViewerError};
pub use gpu::GpuContext;
pub use input::Input;
pub use mesh::{Mesh, Vertex3d, cube_geometry};
pub use renderer::{FrameRenderer, FrameState, FrameTransforms, MeshId, TextureSetId, Viewport};
pub use scene::{Lighting, Material, PointLight, SceneInstance};
pub use shader::{ShaderProgram, UniformBlock, UniformLayout, Uniforms};
pub use texture::{DecodedImage, Texture, TextureSet, decode_image};
pub use timing::FrameTiming;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
