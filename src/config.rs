use std::path::PathBuf;

use crate::camera::{self, ZoomRange};
use crate::controls::KeyBindings;

/// Startup configuration for the viewer.
///
/// Every field has a working default; the builder methods override them.
///
/// ```
/// use lantern::{ViewerConfig, ZoomRange};
///
/// let config = ViewerConfig::new()
///     .title("Cubes")
///     .size(1280, 720)
///     .zoom_range(ZoomRange::new(1.0, 90.0))
///     .dynamic_light(true);
/// assert_eq!(config.width, 1280);
/// ```
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 3],
    pub scene_shader: ShaderPaths,
    pub light_shader: ShaderPaths,
    /// Textures bound to units 0 and 1 of the scene material.
    pub textures: [PathBuf; 2],
    pub near: f32,
    pub far: f32,
    pub zoom_range: ZoomRange,
    pub camera_position: [f32; 3],
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    /// Modulate the light color over time.
    pub dynamic_light: bool,
    /// Add a time-varying rotation to every scene instance.
    pub spin: bool,
    pub key_bindings: KeyBindings,
}

/// The two source files a shader program is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Lantern".to_string(),
            width: 1200,
            height: 800,
            clear_color: [0.2, 0.3, 0.5],
            scene_shader: ShaderPaths::new(
                "assets/shaders/scene.vert.wgsl",
                "assets/shaders/scene.frag.wgsl",
            ),
            light_shader: ShaderPaths::new(
                "assets/shaders/light.vert.wgsl",
                "assets/shaders/light.frag.wgsl",
            ),
            textures: [
                PathBuf::from("assets/textures/container.png"),
                PathBuf::from("assets/textures/overlay.png"),
            ],
            near: 0.1,
            far: 100.0,
            zoom_range: ZoomRange::default(),
            camera_position: [0.0, 0.0, 3.0],
            camera_speed: camera::DEFAULT_SPEED,
            mouse_sensitivity: camera::DEFAULT_SENSITIVITY,
            dynamic_light: false,
            spin: true,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, r: f64, g: f64, b: f64) -> Self {
        self.clear_color = [r, g, b];
        self
    }

    pub fn scene_shader(mut self, paths: ShaderPaths) -> Self {
        self.scene_shader = paths;
        self
    }

    pub fn light_shader(mut self, paths: ShaderPaths) -> Self {
        self.light_shader = paths;
        self
    }

    pub fn textures(mut self, first: impl Into<PathBuf>, second: impl Into<PathBuf>) -> Self {
        self.textures = [first.into(), second.into()];
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn zoom_range(mut self, range: ZoomRange) -> Self {
        self.zoom_range = range;
        self
    }

    pub fn camera_position(mut self, position: [f32; 3]) -> Self {
        self.camera_position = position;
        self
    }

    pub fn camera_speed(mut self, speed: f32) -> Self {
        self.camera_speed = speed;
        self
    }

    pub fn mouse_sensitivity(mut self, sensitivity: f32) -> Self {
        self.mouse_sensitivity = sensitivity;
        self
    }

    pub fn dynamic_light(mut self, enabled: bool) -> Self {
        self.dynamic_light = enabled;
        self
    }

    pub fn spin(mut self, enabled: bool) -> Self {
        self.spin = enabled;
        self
    }

    pub fn key_bindings(mut self, bindings: KeyBindings) -> Self {
        self.key_bindings = bindings;
        self
    }
}
