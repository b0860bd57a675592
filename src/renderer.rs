//! Per-frame drawing of the lit cubes and the light marker.
//!
//! A frame is built in two phases. First every uniform is set and every draw
//! recorded on the CPU (see [`ShaderProgram::draw`]), then the snapshots are
//! uploaded and the whole frame is encoded into a single render pass.

use glam::{Mat4, Vec3};
use log::warn;

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::scene::{self, Lighting, SceneInstance};
use crate::shader::{ShaderProgram, Uniforms};
use crate::texture::{Texture, TextureSet};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Handle to a mesh owned by the [`FrameRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Handle to a texture set owned by the [`FrameRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSetId(pub(crate) usize);

/// Size of the drawable area in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero height (minimized window) counts as one pixel.
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Matrices shared by every draw in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub camera_position: Vec3,
    /// Aspect ratio the projection was built with.
    pub aspect: f32,
}

impl FrameTransforms {
    pub fn new(camera: &Camera, viewport: Viewport, near: f32, far: f32) -> Self {
        let aspect = viewport.aspect();
        Self {
            projection: Mat4::perspective_rh(camera.fov_degrees().to_radians(), aspect, near, far),
            view: camera.view_matrix(),
            camera_position: camera.position,
            aspect,
        }
    }
}

/// Everything the renderer needs from the loop for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameState {
    pub transforms: FrameTransforms,
    /// Seconds since startup.
    pub time: f32,
}

/// What gets drawn each frame, independent of any GPU resources.
#[derive(Clone, Debug)]
struct SceneContent {
    cube: MeshId,
    material: TextureSetId,
    instances: Vec<SceneInstance>,
    lighting: Lighting,
    spin: bool,
}

impl SceneContent {
    /// One lit, textured cube per instance, sharing the frame's matrices.
    fn record_scene(&self, program: &mut ShaderProgram, frame: &FrameState) {
        program.begin_frame();
        program.set_mat4("projection", frame.transforms.projection);
        program.set_mat4("view", frame.transforms.view);
        program.set_float("mix_value", scene::texture_mix(frame.time));
        self.lighting
            .apply(program, frame.time, frame.transforms.camera_position);

        let spin = scene::spin_angle(self.spin, frame.time);
        for instance in &self.instances {
            let model = instance.model_matrix(spin);
            program.set_mat4("model", model);
            program.set_mat4("normal_matrix", model.inverse().transpose());
            program.draw(self.cube, Some(self.material));
        }
    }

    fn record_light_marker(&self, program: &mut ShaderProgram, frame: &FrameState) {
        program.begin_frame();
        program.set_mat4("projection", frame.transforms.projection);
        program.set_mat4("view", frame.transforms.view);
        program.set_mat4("model", self.lighting.marker_matrix());
        program.set_vec3("color", self.lighting.light_color(frame.time));
        program.draw(self.cube, None);
    }
}

/// Owns the programs, geometry and textures and draws one frame at a time.
pub struct FrameRenderer {
    scene_program: ShaderProgram,
    light_program: ShaderProgram,
    meshes: Vec<Mesh>,
    texture_sets: Vec<TextureSet>,
    content: SceneContent,
    clear_color: wgpu::Color,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl FrameRenderer {
    pub fn new(gpu: &GpuContext, config: &ViewerConfig) -> Self {
        let texture_layout = TextureSet::layout(gpu);
        let scene_program =
            ShaderProgram::new(gpu, "Scene", &config.scene_shader, &texture_layout);
        let light_program =
            ShaderProgram::new(gpu, "Light Marker", &config.light_shader, &texture_layout);
        for program in [&scene_program, &light_program] {
            if !program.is_linked() {
                warn!(
                    "{}: not drawing, fix {} or {} and restart",
                    program.label(),
                    program.paths().vertex.display(),
                    program.paths().fragment.display()
                );
            }
        }

        let [first, second] = &config.textures;
        let textures = [
            Texture::load_or_blank(gpu, first),
            Texture::load_or_blank(gpu, second),
        ];
        let material = TextureSet::new(gpu, &texture_layout, [&textures[0], &textures[1]]);

        let [r, g, b] = config.clear_color;
        Self {
            scene_program,
            light_program,
            meshes: vec![Mesh::cube(gpu)],
            texture_sets: vec![material],
            content: SceneContent {
                cube: MeshId(0),
                material: TextureSetId(0),
                instances: scene::default_instances(),
                lighting: Lighting {
                    dynamic_color: config.dynamic_light,
                    ..Lighting::default()
                },
                spin: config.spin,
            },
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            depth_view: create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    /// Recreate the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Draw and present one frame.
    pub fn render(&mut self, gpu: &GpuContext, frame: &FrameState) {
        self.content.record_scene(&mut self.scene_program, frame);
        self.content
            .record_light_marker(&mut self.light_program, frame);
        self.scene_program.flush(gpu);
        self.light_program.flush(gpu);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                warn!("surface {err}, reconfiguring");
                gpu.reconfigure();
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.scene_program
                .encode(&mut pass, &self.meshes, &self.texture_sets);
            self.light_program
                .encode(&mut pass, &self.meshes, &self.texture_sets);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::ShaderPaths;
    use crate::shader::{UniformLayout, compile_stage, link, read_stage};

    fn shipped_layout(paths: &ShaderPaths) -> UniformLayout {
        let stage = |name: &'static str, path: &Path| {
            let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
            let source = read_stage(name, &path).unwrap();
            compile_stage(name, &path, &source).unwrap()
        };
        let vertex = stage("vertex", paths.vertex.as_path());
        let fragment = stage("fragment", paths.fragment.as_path());
        link(&vertex, &fragment).unwrap().uniforms
    }

    fn content() -> SceneContent {
        SceneContent {
            cube: MeshId(0),
            material: TextureSetId(3),
            instances: scene::default_instances(),
            lighting: Lighting::default(),
            spin: true,
        }
    }

    fn frame() -> FrameState {
        let camera = Camera::new().position([0.0, 0.0, 3.0]);
        FrameState {
            transforms: FrameTransforms::new(&camera, Viewport::new(1200, 800), 0.1, 100.0),
            time: 1.5,
        }
    }

    fn read_f32(bytes: &[u8], at: usize) -> f32 {
        bytemuck::pod_read_unaligned(&bytes[at..at + 4])
    }

    #[test]
    fn scene_records_one_draw_per_instance() {
        let config = ViewerConfig::default();
        let layout = shipped_layout(&config.scene_shader);
        let model = layout.field("model").unwrap().offset as usize;
        let shininess = layout.field("material.shininess").unwrap().offset as usize;
        let stride = 512;
        let mut program = ShaderProgram::recording_only("Scene", layout, stride);

        let content = content();
        content.record_scene(&mut program, &frame());
        let recorder = program.recorder().unwrap();
        assert_eq!(recorder.len(), content.instances.len());

        let spin = scene::spin_angle(true, 1.5);
        for (i, (draw, instance)) in recorder.draws().iter().zip(&content.instances).enumerate() {
            assert_eq!(draw.mesh, MeshId(0));
            assert_eq!(draw.textures, Some(TextureSetId(3)));

            let expected = instance.model_matrix(spin).to_cols_array();
            let snapshot = &recorder.bytes()[i * stride..];
            for (k, value) in expected.iter().enumerate() {
                assert_eq!(read_f32(snapshot, model + k * 4), *value);
            }
            assert_eq!(read_f32(snapshot, shininess), 32.0);
        }

        // Re-recording replaces the previous frame's draws.
        content.record_scene(&mut program, &frame());
        assert_eq!(program.recorder().unwrap().len(), content.instances.len());
    }

    #[test]
    fn light_marker_records_a_single_untextured_draw() {
        let config = ViewerConfig::default();
        let layout = shipped_layout(&config.light_shader);
        let color = layout.field("color").unwrap().offset as usize;
        let mut program = ShaderProgram::recording_only("Light Marker", layout, 256);

        content().record_light_marker(&mut program, &frame());
        let recorder = program.recorder().unwrap();
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.draws()[0].textures, None);
        for k in 0..3 {
            assert_eq!(read_f32(recorder.bytes(), color + k * 4), 1.0);
        }
    }

    #[test]
    fn aspect_survives_zero_height() {
        assert_eq!(Viewport::new(800, 0).aspect(), 800.0);
        assert_eq!(Viewport::new(0, 0).aspect(), 1.0);
    }

    #[test]
    fn projection_uses_viewport_aspect_and_zoom() {
        let camera = Camera::new();
        let transforms = FrameTransforms::new(&camera, Viewport::new(800, 600), 0.1, 100.0);
        let expected = Mat4::perspective_rh(45f32.to_radians(), 800.0 / 600.0, 0.1, 100.0);
        assert_eq!(transforms.aspect, 800.0 / 600.0);
        assert!(transforms.projection.abs_diff_eq(expected, 1e-6));
        assert_eq!(transforms.view, camera.view_matrix());
    }

    #[test]
    fn zoom_narrows_projection() {
        let mut camera = Camera::new();
        let wide = FrameTransforms::new(&camera, Viewport::new(100, 100), 0.1, 100.0);
        camera.process_mouse_scroll(20.0);
        let narrow = FrameTransforms::new(&camera, Viewport::new(100, 100), 0.1, 100.0);
        assert!(narrow.projection.y_axis.y > wide.projection.y_axis.y);
    }
}
