//! Shader programs built from a vertex and a fragment WGSL file.
//!
//! A [`ShaderProgram`] compiles both stages with naga, "links" them by
//! checking entry points and merging their uniform declarations, and then
//! builds a render pipeline. Any failure along the way is logged and leaves
//! the program in a degraded state where draws are skipped; construction
//! itself never fails.
//!
//! # Uniforms
//!
//! Each program reads its uniforms from a single struct bound at
//! `@group(0) @binding(0)`. Its members are reflected once into a
//! [`UniformLayout`], and the typed setters look names up in that layout.
//! Nested structs are addressed with dotted names:
//!
//! ```wgsl
//! struct Material { diffuse: vec3<f32>, shininess: f32 }
//! struct Uniforms { model: mat4x4<f32>, material: Material }
//! @group(0) @binding(0) var<uniform> u: Uniforms;
//! ```
//!
//! ```ignore
//! program.set_mat4("model", model);
//! program.set_float("material.shininess", 32.0);
//! program.set_float("does_not_exist", 1.0); // silently ignored
//! ```
//!
//! Every [`draw`](ShaderProgram::draw) snapshots the current uniform values,
//! so each draw sees exactly what was set before it even though the GPU work
//! is recorded and submitted later.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Mat4, Vec3, Vec4};
use log::{error, info, trace};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, ScalarKind, ShaderStage, TypeInner, VectorSize};

use crate::config::ShaderPaths;
use crate::error::ShaderError;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use crate::renderer::{DEPTH_FORMAT, MeshId, TextureSetId};
use crate::texture::TextureSet;

/// Entry point expected in the vertex stage file.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Entry point expected in the fragment stage file.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Bind group holding the uniform struct.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group holding material textures.
pub const TEXTURE_GROUP: u32 = 1;

/// Smallest uniform binding ever created, so an empty block still binds.
const MIN_BLOCK_SIZE: usize = 16;
const INITIAL_DRAW_SLOTS: usize = 16;

/// Typed uniform setters addressed by name.
pub trait Uniforms {
    fn set_bool(&mut self, name: &str, value: bool);
    fn set_int(&mut self, name: &str, value: i32);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_vec3(&mut self, name: &str, value: Vec3);
    fn set_vec4(&mut self, name: &str, value: Vec4);
    fn set_mat4(&mut self, name: &str, value: Mat4);
}

/// Host-shareable member types the setters can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    UInt,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    fn from_inner(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
                ScalarKind::Sint => Some(Self::Int),
                ScalarKind::Uint => Some(Self::UInt),
                ScalarKind::Float => Some(Self::Float),
                _ => None,
            },
            TypeInner::Vector { size, scalar }
                if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
            {
                match size {
                    VectorSize::Tri => Some(Self::Vec3),
                    VectorSize::Quad => Some(Self::Vec4),
                    VectorSize::Bi => None,
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar.width == 4 => Some(Self::Mat4),
            _ => None,
        }
    }
}

/// Location of one uniform inside the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name-to-location table for a program's uniform struct.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    fields: HashMap<String, UniformField>,
    size: u32,
}

impl UniformLayout {
    /// Reflect the uniform struct bound at `@group(0) @binding(0)`.
    ///
    /// Returns an empty layout if the module declares no such struct.
    pub fn reflect(module: &naga::Module) -> Self {
        let mut layout = Self::default();
        let uniform = module.global_variables.iter().find(|(_, var)| {
            var.space == AddressSpace::Uniform
                && var
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == 0)
        });
        if let Some((_, var)) = uniform {
            if let TypeInner::Struct { span, .. } = module.types[var.ty].inner {
                layout.size = span;
                collect_fields(module, var.ty, 0, "", &mut layout.fields);
            }
        }
        layout
    }

    pub fn field(&self, name: &str) -> Option<UniformField> {
        self.fields.get(name).copied()
    }

    /// Byte size of the whole struct.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fold another stage's declaration into this one. Both stages must agree
    /// on every member they share.
    pub fn merge(&mut self, other: UniformLayout) -> Result<(), String> {
        for (name, field) in other.fields {
            match self.fields.get(&name) {
                Some(existing) if *existing != field => {
                    return Err(format!(
                        "uniform `{name}` declared as {:?}@{} and {:?}@{}",
                        existing.kind, existing.offset, field.kind, field.offset
                    ));
                }
                Some(_) => {}
                None => {
                    self.fields.insert(name, field);
                }
            }
        }
        self.size = self.size.max(other.size);
        Ok(())
    }
}

fn collect_fields(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    base: u32,
    prefix: &str,
    fields: &mut HashMap<String, UniformField>,
) {
    let TypeInner::Struct { ref members, .. } = module.types[ty].inner else {
        return;
    };
    for member in members {
        let Some(name) = member.name.as_deref() else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let offset = base + member.offset;
        let inner = &module.types[member.ty].inner;
        if let TypeInner::Struct { .. } = inner {
            collect_fields(module, member.ty, offset, &path, fields);
        } else if let Some(kind) = UniformKind::from_inner(inner) {
            fields.insert(path, UniformField { offset, kind });
        }
    }
}

/// CPU-side copy of a program's uniform struct.
#[derive(Clone, Debug)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size as usize];
        Self { layout, data }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn write(&mut self, name: &str, accepts: &[UniformKind], bytes: &[u8]) {
        let Some(field) = self.layout.field(name) else {
            trace!("uniform `{name}` not declared, ignoring");
            return;
        };
        if !accepts.contains(&field.kind) {
            trace!("uniform `{name}` is {:?}, ignoring write", field.kind);
            return;
        }
        let start = field.offset as usize;
        if let Some(slot) = self.data.get_mut(start..start + bytes.len()) {
            slot.copy_from_slice(bytes);
        }
    }
}

impl Uniforms for UniformBlock {
    fn set_bool(&mut self, name: &str, value: bool) {
        let value = value as u32;
        self.write(
            name,
            &[UniformKind::Int, UniformKind::UInt],
            bytemuck::bytes_of(&value),
        );
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.write(
            name,
            &[UniformKind::Int, UniformKind::UInt],
            bytemuck::bytes_of(&value),
        );
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, &[UniformKind::Float], bytemuck::bytes_of(&value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        let value = value.to_array();
        self.write(name, &[UniformKind::Vec3], bytemuck::cast_slice(&value));
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        let value = value.to_array();
        self.write(name, &[UniformKind::Vec4], bytemuck::cast_slice(&value));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        let value = value.to_cols_array();
        self.write(name, &[UniformKind::Mat4], bytemuck::cast_slice(&value));
    }
}

/// Read one stage's source file.
pub fn read_stage(stage: &'static str, path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::Read {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

/// Parse and validate one stage.
pub fn compile_stage(
    stage: &'static str,
    path: &Path,
    source: &str,
) -> Result<naga::Module, ShaderError> {
    let compile_error = |log: String| ShaderError::Compile {
        stage,
        path: path.to_path_buf(),
        log,
    };
    let module =
        naga::front::wgsl::parse_str(source).map_err(|err| compile_error(err.emit_to_string(source)))?;
    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| compile_error(err.emit_to_string(source)))?;
    Ok(module)
}

/// What the linked stages expect from the pipeline.
#[derive(Clone, Debug)]
pub struct ProgramInterface {
    pub uniforms: UniformLayout,
    pub uses_textures: bool,
}

/// Check that the stages fit together and merge their uniform declarations.
pub fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<ProgramInterface, ShaderError> {
    let has_entry = |module: &naga::Module, stage: ShaderStage, name: &str| {
        module
            .entry_points
            .iter()
            .any(|entry| entry.stage == stage && entry.name == name)
    };
    if !has_entry(vertex, ShaderStage::Vertex, VERTEX_ENTRY) {
        return Err(ShaderError::Link(format!(
            "vertex stage has no `@vertex fn {VERTEX_ENTRY}`"
        )));
    }
    if !has_entry(fragment, ShaderStage::Fragment, FRAGMENT_ENTRY) {
        return Err(ShaderError::Link(format!(
            "fragment stage has no `@fragment fn {FRAGMENT_ENTRY}`"
        )));
    }

    let mut uniforms = UniformLayout::reflect(vertex);
    uniforms
        .merge(UniformLayout::reflect(fragment))
        .map_err(ShaderError::Link)?;

    let uses_textures = [vertex, fragment].iter().any(|module| {
        module
            .global_variables
            .iter()
            .any(|(_, var)| var.binding.as_ref().is_some_and(|b| b.group == TEXTURE_GROUP))
    });

    Ok(ProgramInterface {
        uniforms,
        uses_textures,
    })
}

/// One recorded draw: which mesh and textures to use. Its uniform snapshot
/// sits at the same index in the [`DrawRecorder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PendingDraw {
    pub(crate) mesh: MeshId,
    pub(crate) textures: Option<TextureSetId>,
}

/// A frame's draws and the uniform values each one saw.
///
/// Snapshot `i` starts at byte `i * stride`, which is also the dynamic offset
/// the draw binds at encode time, so the whole buffer uploads in one write.
#[derive(Clone, Debug)]
pub(crate) struct DrawRecorder {
    stride: usize,
    snapshots: Vec<u8>,
    draws: Vec<PendingDraw>,
}

impl DrawRecorder {
    pub(crate) fn new(stride: usize) -> Self {
        Self {
            stride,
            snapshots: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
        self.draws.clear();
    }

    /// Copy `block` into the next slot and queue a draw that reads it.
    pub(crate) fn record(
        &mut self,
        block: &UniformBlock,
        mesh: MeshId,
        textures: Option<TextureSetId>,
    ) {
        let start = self.draws.len() * self.stride;
        self.snapshots.resize(start + self.stride, 0);
        let bytes = block.bytes();
        let len = bytes.len().min(self.stride);
        self.snapshots[start..start + len].copy_from_slice(&bytes[..len]);
        self.draws.push(PendingDraw { mesh, textures });
    }

    pub(crate) fn len(&self) -> usize {
        self.draws.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub(crate) fn draws(&self) -> &[PendingDraw] {
        &self.draws
    }

    /// Every snapshot back to back, `stride` bytes apart.
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.snapshots
    }

    /// Dynamic offset of the `index`th draw's snapshot.
    pub(crate) fn offset(&self, index: usize) -> u32 {
        (index * self.stride) as u32
    }
}

/// Uniform buffer holding one snapshot per draw, addressed by dynamic offset.
struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

struct ProgramResources {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    ring: UniformRing,
    block_size: u64,
    stride: usize,
    uses_textures: bool,
}

impl ProgramResources {
    fn new(
        gpu: &GpuContext,
        label: &str,
        vertex: naga::Module,
        fragment: naga::Module,
        interface: &ProgramInterface,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let device = &gpu.device;
        let block_size = (interface.uniforms.size() as usize).max(MIN_BLOCK_SIZE);
        let alignment = device.limits().min_uniform_buffer_offset_alignment as usize;
        let stride = block_size.next_multiple_of(alignment);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Vertex")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vertex)),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Fragment")),
            source: wgpu::ShaderSource::Naga(Cow::Owned(fragment)),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Uniform Layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(block_size as u64),
                },
                count: None,
            }],
        });

        let mut bind_group_layouts = vec![&uniform_layout];
        if interface.uses_textures {
            bind_group_layouts.push(texture_layout);
        }
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label} Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let ring = UniformRing::new(
            gpu,
            label,
            &uniform_layout,
            block_size as u64,
            stride,
            INITIAL_DRAW_SLOTS,
        );

        Self {
            pipeline,
            uniform_layout,
            ring,
            block_size: block_size as u64,
            stride,
            uses_textures: interface.uses_textures,
        }
    }
}

impl UniformRing {
    fn new(
        gpu: &GpuContext,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        block_size: u64,
        stride: usize,
        capacity: usize,
    ) -> Self {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Uniforms")),
            size: (stride * capacity) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Uniform Bind Group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block_size),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            capacity,
        }
    }
}

/// A vertex + fragment program with by-name uniform setters.
pub struct ShaderProgram {
    label: String,
    paths: ShaderPaths,
    block: UniformBlock,
    /// Present once the program has a pipeline to replay draws into.
    recorder: Option<DrawRecorder>,
    resources: Option<ProgramResources>,
}

impl ShaderProgram {
    /// Read, compile and link both stages.
    ///
    /// Never fails: problems are logged and produce a program whose draws are
    /// skipped. Check [`is_linked`](Self::is_linked) to tell the two apart.
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        paths: &ShaderPaths,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let vertex_source = read_stage("vertex", &paths.vertex).unwrap_or_else(|err| {
            error!("{label}: {err}");
            String::new()
        });
        let fragment_source = read_stage("fragment", &paths.fragment).unwrap_or_else(|err| {
            error!("{label}: {err}");
            String::new()
        });

        let vertex = compile_stage("vertex", &paths.vertex, &vertex_source);
        let fragment = compile_stage("fragment", &paths.fragment, &fragment_source);

        let mut program = Self {
            label: label.to_string(),
            paths: paths.clone(),
            block: UniformBlock::new(UniformLayout::default()),
            recorder: None,
            resources: None,
        };

        let (vertex, fragment) = match (vertex, fragment) {
            (Ok(vertex), Ok(fragment)) => (vertex, fragment),
            (vertex, fragment) => {
                for err in [vertex.err(), fragment.err()].into_iter().flatten() {
                    error!("{label}: {err}");
                }
                return program;
            }
        };

        let interface = match link(&vertex, &fragment) {
            Ok(interface) => interface,
            Err(err) => {
                error!("{label}: {err}");
                return program;
            }
        };
        program.block = UniformBlock::new(interface.uniforms.clone());

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let resources =
            ProgramResources::new(gpu, label, vertex, fragment, &interface, texture_layout);
        match pollster::block_on(gpu.device.pop_error_scope()) {
            Some(err) => error!("{label}: {}", ShaderError::Device(err.to_string())),
            None => {
                info!(
                    "{label}: shader program linked ({} uniforms, {} bytes)",
                    interface.uniforms.len(),
                    interface.uniforms.size()
                );
                program.recorder = Some(DrawRecorder::new(resources.stride));
                program.resources = Some(resources);
            }
        }
        program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The vertex and fragment files this program was built from.
    pub fn paths(&self) -> &ShaderPaths {
        &self.paths
    }

    /// Whether both stages compiled and linked into a usable pipeline.
    pub fn is_linked(&self) -> bool {
        self.resources.is_some()
    }

    /// Draws recorded since [`begin_frame`](Self::begin_frame).
    pub(crate) fn recorder(&self) -> Option<&DrawRecorder> {
        self.recorder.as_ref()
    }

    /// Drop last frame's recorded draws. Uniform values are kept.
    pub fn begin_frame(&mut self) {
        if let Some(recorder) = &mut self.recorder {
            recorder.clear();
        }
    }

    /// Record a draw of `mesh` with the uniforms as they are right now.
    pub fn draw(&mut self, mesh: MeshId, textures: Option<TextureSetId>) {
        if let Some(recorder) = &mut self.recorder {
            recorder.record(&self.block, mesh, textures);
        }
    }

    /// Upload this frame's snapshots. Call before the render pass begins.
    pub fn flush(&mut self, gpu: &GpuContext) {
        let (Some(resources), Some(recorder)) = (&mut self.resources, &self.recorder) else {
            return;
        };
        if recorder.is_empty() {
            return;
        }
        if recorder.len() > resources.ring.capacity {
            let capacity = recorder.len().next_power_of_two();
            resources.ring = UniformRing::new(
                gpu,
                &self.label,
                &resources.uniform_layout,
                resources.block_size,
                resources.stride,
                capacity,
            );
        }
        gpu.queue
            .write_buffer(&resources.ring.buffer, 0, recorder.bytes());
    }

    /// Make this program current in `pass`. Returns false for a program that
    /// failed to build.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        match &self.resources {
            Some(resources) => {
                pass.set_pipeline(&resources.pipeline);
                true
            }
            None => false,
        }
    }

    /// Replay the recorded draws into `pass`.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>, meshes: &[Mesh], textures: &[TextureSet]) {
        let (Some(resources), Some(recorder)) = (&self.resources, &self.recorder) else {
            return;
        };
        if !self.bind(pass) {
            return;
        }
        for (index, draw) in recorder.draws().iter().enumerate() {
            let Some(mesh) = meshes.get(draw.mesh.0) else {
                continue;
            };
            let offset = recorder.offset(index);
            pass.set_bind_group(UNIFORM_GROUP, &resources.ring.bind_group, &[offset]);
            if resources.uses_textures {
                let Some(set) = draw.textures.and_then(|id| textures.get(id.0)) else {
                    continue;
                };
                pass.set_bind_group(TEXTURE_GROUP, &set.bind_group, &[]);
            }
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    /// A program that records draws against `layout` without any GPU
    /// resources behind it.
    #[cfg(test)]
    pub(crate) fn recording_only(label: &str, layout: UniformLayout, stride: usize) -> Self {
        Self {
            label: label.to_string(),
            paths: ShaderPaths::new("", ""),
            block: UniformBlock::new(layout),
            recorder: Some(DrawRecorder::new(stride)),
            resources: None,
        }
    }
}

impl Uniforms for ShaderProgram {
    fn set_bool(&mut self, name: &str, value: bool) {
        self.block.set_bool(name, value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.block.set_int(name, value);
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.block.set_float(name, value);
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.block.set_vec3(name, value);
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.block.set_vec4(name, value);
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.block.set_mat4(name, value);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const VERTEX: &str = r#"
struct Material {
    ambient: vec3<f32>,
    shininess: f32,
}

struct Globals {
    model: mat4x4<f32>,
    tint: vec4<f32>,
    view_pos: vec3<f32>,
    mix_value: f32,
    count: i32,
    flags: u32,
    material: Material,
}

@group(0) @binding(0) var<uniform> u: Globals;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.model * vec4<f32>(position, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
struct Material {
    ambient: vec3<f32>,
    shininess: f32,
}

struct Globals {
    model: mat4x4<f32>,
    tint: vec4<f32>,
    view_pos: vec3<f32>,
    mix_value: f32,
    count: i32,
    flags: u32,
    material: Material,
}

@group(0) @binding(0) var<uniform> u: Globals;
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var samp: sampler;

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    return textureSample(tex, samp, frag.xy) * u.tint * u.mix_value;
}
"#;

    fn module(source: &str) -> naga::Module {
        compile_stage("test", Path::new("inline.wgsl"), source).expect("valid WGSL")
    }

    fn block() -> UniformBlock {
        UniformBlock::new(UniformLayout::reflect(&module(VERTEX)))
    }

    fn read_f32(block: &UniformBlock, name: &str, count: usize) -> Vec<f32> {
        let offset = block.layout().field(name).unwrap().offset as usize;
        bytemuck::cast_slice(&block.bytes()[offset..offset + count * 4]).to_vec()
    }

    #[test]
    fn reflects_wgsl_offsets() {
        let layout = UniformLayout::reflect(&module(VERTEX));
        let field = |name| layout.field(name).unwrap();

        assert_eq!(field("model"), UniformField { offset: 0, kind: UniformKind::Mat4 });
        assert_eq!(field("tint").offset, 64);
        assert_eq!(field("view_pos"), UniformField { offset: 80, kind: UniformKind::Vec3 });
        assert_eq!(field("mix_value").offset, 92);
        assert_eq!(field("count").kind, UniformKind::Int);
        assert_eq!(field("flags").kind, UniformKind::UInt);
        assert_eq!(field("material.ambient").offset, 112);
        assert_eq!(field("material.shininess").offset, 124);
        assert_eq!(layout.size(), 128);
        assert!(layout.field("material").is_none());
    }

    #[test]
    fn module_without_uniforms_reflects_empty() {
        let source = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        let layout = UniformLayout::reflect(&module(source));
        assert!(layout.is_empty());
        assert_eq!(layout.size(), 0);
    }

    #[test]
    fn setters_write_at_reflected_offsets() {
        let mut block = block();
        block.set_vec3("view_pos", Vec3::new(1.0, 2.0, 3.0));
        block.set_float("mix_value", 0.25);
        block.set_float("material.shininess", 32.0);
        block.set_vec4("tint", Vec4::new(0.1, 0.2, 0.3, 0.4));
        block.set_mat4("model", Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0)));

        assert_eq!(read_f32(&block, "view_pos", 3), vec![1.0, 2.0, 3.0]);
        assert_eq!(read_f32(&block, "mix_value", 1), vec![0.25]);
        assert_eq!(read_f32(&block, "material.shininess", 1), vec![32.0]);
        assert_eq!(read_f32(&block, "tint", 4), vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(read_f32(&block, "model", 16)[12..15], [5.0, 6.0, 7.0]);
    }

    #[test]
    fn integer_and_bool_setters() {
        let mut block = block();
        block.set_int("count", -7);
        block.set_bool("flags", true);
        let at = |name: &str| block.layout().field(name).unwrap().offset as usize;
        let count: i32 = bytemuck::pod_read_unaligned(&block.bytes()[at("count")..at("count") + 4]);
        let flags: u32 = bytemuck::pod_read_unaligned(&block.bytes()[at("flags")..at("flags") + 4]);
        assert_eq!(count, -7);
        assert_eq!(flags, 1);
    }

    #[test]
    fn unknown_or_mismatched_names_are_no_ops() {
        let mut block = block();
        let before = block.bytes().to_vec();
        block.set_float("missing", 1.0);
        block.set_float("model", 1.0);
        block.set_mat4("view_pos", Mat4::IDENTITY);
        block.set_bool("mix_value", true);
        assert_eq!(block.bytes(), before.as_slice());
    }

    #[test]
    fn link_merges_stages_and_detects_textures() {
        let interface = link(&module(VERTEX), &module(FRAGMENT)).unwrap();
        assert!(interface.uses_textures);
        assert_eq!(interface.uniforms, UniformLayout::reflect(&module(VERTEX)));
    }

    #[test]
    fn link_requires_entry_points() {
        let empty = module("");
        assert!(matches!(link(&empty, &module(FRAGMENT)), Err(ShaderError::Link(_))));
        assert!(matches!(link(&module(VERTEX), &empty), Err(ShaderError::Link(_))));
    }

    #[test]
    fn link_rejects_conflicting_declarations() {
        let fragment = r#"
struct Globals { view_pos: vec4<f32> }
@group(0) @binding(0) var<uniform> u: Globals;
@fragment fn fs_main() -> @location(0) vec4<f32> { return u.view_pos; }
"#;
        let err = link(&module(VERTEX), &module(fragment)).unwrap_err();
        assert!(err.to_string().contains("view_pos"));
    }

    #[test]
    fn each_draw_keeps_the_uniforms_set_before_it() {
        let layout = UniformLayout::reflect(&module(VERTEX));
        let model = layout.field("model").unwrap().offset as usize;
        let stride = 256;
        let mut program = ShaderProgram::recording_only("test", layout, stride);

        program.begin_frame();
        for i in 0..4 {
            program.set_mat4("model", Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)));
            program.draw(MeshId(0), None);
        }

        let recorder = program.recorder().unwrap();
        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.bytes().len(), 4 * stride);
        for i in 0..4 {
            assert_eq!(recorder.offset(i), (i * stride) as u32);
            // Translation x is column 3, row 0.
            let start = i * stride + model + 48;
            let x: f32 = bytemuck::pod_read_unaligned(&recorder.bytes()[start..start + 4]);
            assert_eq!(x, i as f32);
        }

        program.begin_frame();
        assert!(program.recorder().unwrap().is_empty());
    }

    #[test]
    fn draws_remember_mesh_and_textures() {
        let mut program = ShaderProgram::recording_only("test", UniformLayout::default(), 16);
        program.draw(MeshId(2), Some(TextureSetId(1)));
        program.draw(MeshId(0), None);
        assert_eq!(
            program.recorder().unwrap().draws(),
            &[
                PendingDraw { mesh: MeshId(2), textures: Some(TextureSetId(1)) },
                PendingDraw { mesh: MeshId(0), textures: None },
            ]
        );
    }

    #[test]
    fn compile_errors_carry_diagnostics() {
        let err = compile_stage("vertex", Path::new("broken.wgsl"), "fn vs_main( {").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("vertex shader broken.wgsl failed to compile"));
        assert!(message.lines().count() > 1);
    }

    #[test]
    fn missing_source_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("nope.wgsl");
        let err = read_stage("fragment", &path).unwrap_err();
        assert!(matches!(err, ShaderError::Read { stage: "fragment", .. }));
    }

    #[test]
    fn reads_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.wgsl");
        std::fs::write(&path, VERTEX).unwrap();
        let source = read_stage("vertex", &path).unwrap();
        assert!(compile_stage("vertex", &path, &source).is_ok());
    }
}
