//! [`GraphicsDevice`] over wgpu.
//!
//! wgpu records command buffers instead of executing calls immediately, so the
//! immediate-mode contract is emulated:
//!
//! - texture units are a table of texture ids; each uploaded texture owns a
//!   bind group (view + sampler) that a draw picks up from the sampler's unit
//! - uniforms live in a CPU-side block
//! - `draw_triangle_strip` snapshots the uniform block, the current vertices,
//!   and the bind group at the sampler's unit into a [`DrawRecord`]
//! - `present` uploads all vertices and uniform blocks, then replays the
//!   records in one render pass using dynamic uniform offsets
//!
//! Pixel uploads go through the queue immediately. A texture re-uploaded while
//! a recorded draw still samples it gets fresh storage, so that draw keeps the
//! pixels it was recorded with.

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::Mat3;
use crate::device::{
    AttributeLocation, BlendMode, DeviceError, FilterMode, GraphicsDevice, PixelData,
    RenderState, SamplerParams, ShaderStage, SpriteVertex, UniformLocation, VertexLayout,
    WrapMode,
};
use crate::paint::Color;

use super::reflect::{self, FRAGMENT_ENTRY, Interface, UniformSlot, VERTEX_ENTRY};
use super::{GpuContext, GpuInit, SurfaceErrorAction};

// ── uniform block ─────────────────────────────────────────────────────────

/// CPU mirror of the WGSL `SpriteUniforms` block (112 bytes).
///
///  offset  0  u_projection  mat3x3<f32>  (3 × vec4 columns)
///  offset 48  u_view        mat3x3<f32>
///  offset 96  u_alpha       f32
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpriteUniforms {
    projection: [[f32; 4]; 3],
    view: [[f32; 4]; 3],
    alpha: f32,
    _pad: [f32; 3],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<SpriteUniforms>() as u64;

impl Default for SpriteUniforms {
    fn default() -> Self {
        let identity = columns(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        Self { projection: identity, view: identity, alpha: 1.0, _pad: [0.0; 3] }
    }
}

/// Column-major mat3 → std140 columns.
fn columns(m: &Mat3) -> [[f32; 4]; 3] {
    [
        [m[0], m[1], m[2], 0.0],
        [m[3], m[4], m[5], 0.0],
        [m[6], m[7], m[8], 0.0],
    ]
}

fn uniform_min_binding_size() -> Option<NonZeroU64> {
    NonZeroU64::new(UNIFORM_SIZE)
}

fn premul_alpha_blend() -> wgpu::BlendState {
    let over = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: over, alpha: over }
}

// ── handles ───────────────────────────────────────────────────────────────

/// Compiled and linked sprite program.
pub struct WgpuProgram {
    id: u64,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    interface: Interface,
}

/// Texture handle. Storage is allocated on first upload.
#[derive(Debug)]
pub struct WgpuTexture(u64);

/// Vertex buffer handle. Contents stay on the CPU until `present`.
#[derive(Debug)]
pub struct WgpuBuffer(u64);

struct TextureStorage {
    texture: wgpu::Texture,
    size: (u32, u32),
    sampler: SamplerParams,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: u64,
    position: u32,
    uv: u32,
    stride: u32,
    blend: Option<BlendMode>,
    cull: bool,
}

struct DrawRecord {
    pipeline: PipelineKey,
    uniforms: SpriteUniforms,
    first_vertex: u32,
    vertex_count: u32,
    texture_id: u64,
    texture: wgpu::BindGroup,
}

// ── device ────────────────────────────────────────────────────────────────

pub struct WgpuDevice<'w> {
    ctx: GpuContext<'w>,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<SamplerParams, wgpu::Sampler>,
    next_id: u64,

    // immediate state
    program: Option<WgpuProgram>,
    state: RenderState,
    textures: HashMap<u64, Option<TextureStorage>>,
    units: Vec<Option<u64>>,
    buffers: HashMap<u64, Vec<SpriteVertex>>,
    bound_buffer: Option<(u64, VertexLayout)>,
    uniforms: SpriteUniforms,
    sampler_unit: usize,
    viewport: (u32, u32),

    // current frame
    clear_color: Color,
    vertices: Vec<SpriteVertex>,
    records: Vec<DrawRecord>,

    // frame upload buffers
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    uniform_buffer: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_capacity: usize,
    uniform_stride: u64,
    uniform_staging: Vec<u8>,
}

impl<'w> WgpuDevice<'w> {
    /// Acquires a GPU context for `window` and builds the fixed resource layout.
    pub async fn new(window: &'w Window, init: &GpuInit) -> Result<Self, DeviceError> {
        let ctx = GpuContext::new(window, init)
            .await
            .map_err(|err| DeviceError::Context(format!("{err:#}")))?;
        Ok(Self::from_context(ctx))
    }

    /// [`Self::new`], driven to completion on the calling thread.
    pub fn new_blocking(window: &'w Window, init: &GpuInit) -> Result<Self, DeviceError> {
        pollster::block_on(Self::new(window, init))
    }

    pub fn from_context(ctx: GpuContext<'w>) -> Self {
        let device = ctx.device();
        let limits = device.limits();

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: uniform_min_binding_size(),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nabu texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nabu sprite pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let align = u64::from(limits.min_uniform_buffer_offset_alignment).max(1);
        let uniform_stride = UNIFORM_SIZE.div_ceil(align) * align;
        let units = limits.max_sampled_textures_per_shader_stage as usize;

        log::debug!("wgpu device: {units} texture units, uniform stride {uniform_stride}");

        Self {
            ctx,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            next_id: 1,
            program: None,
            state: RenderState::sprite(),
            textures: HashMap::new(),
            units: vec![None; units],
            buffers: HashMap::new(),
            bound_buffer: None,
            uniforms: SpriteUniforms::default(),
            sampler_unit: 0,
            viewport: (0, 0),
            clear_color: Color::transparent(),
            vertices: Vec::new(),
            records: Vec::new(),
            vertex_buffer: None,
            vertex_capacity: 0,
            uniform_buffer: None,
            uniform_bind_group: None,
            uniform_capacity: 0,
            uniform_stride,
            uniform_staging: Vec::new(),
        }
    }

    pub fn context(&self) -> &GpuContext<'w> {
        &self.ctx
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn uniform_slot(&self, location: UniformLocation) -> Option<UniformSlot> {
        self.program.as_ref()?.interface.uniform_slot(location.0)
    }

    fn end_frame(&mut self) {
        self.records.clear();
        self.vertices.clear();
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_sampler(&mut self, params: SamplerParams) -> wgpu::Sampler {
        let device = self.ctx.device();
        self.samplers
            .entry(params)
            .or_insert_with(|| {
                let filter = |f: FilterMode| match f {
                    FilterMode::Nearest => wgpu::FilterMode::Nearest,
                    FilterMode::Linear => wgpu::FilterMode::Linear,
                };
                let wrap = |w: WrapMode| match w {
                    WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
                    WrapMode::Repeat => wgpu::AddressMode::Repeat,
                };
                device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("nabu bitmap sampler"),
                    address_mode_u: wrap(params.wrap_s),
                    address_mode_v: wrap(params.wrap_t),
                    address_mode_w: wgpu::AddressMode::ClampToEdge,
                    mag_filter: filter(params.mag_filter),
                    min_filter: filter(params.min_filter),
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    ..Default::default()
                })
            })
            .clone()
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(program) = self.program.as_ref() else {
            return;
        };

        let attributes = [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: key.position,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: u64::from(SpriteVertex::UV_OFFSET),
                shader_location: key.uv,
            },
        ];

        let blend = key.blend.map(|mode| match mode {
            BlendMode::PremultipliedOver => premul_alpha_blend(),
        });

        let pipeline = self.ctx.device().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("nabu sprite pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: u64::from(key.stride),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.ctx.surface_format(),
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.cull.then_some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipelines.insert(key, pipeline);
    }

    fn ensure_vertex_capacity(&mut self, required: usize) {
        if required <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        self.vertex_buffer = Some(self.ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("nabu frame vbo"),
            size: (new_cap * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }

    fn ensure_uniform_capacity(&mut self, records: usize) {
        if records <= self.uniform_capacity && self.uniform_bind_group.is_some() {
            return;
        }
        let new_cap = records.next_power_of_two().max(64);
        let device = self.ctx.device();

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("nabu frame ubo"),
            size: new_cap as u64 * self.uniform_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nabu uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: uniform_min_binding_size(),
                }),
            }],
        });

        self.uniform_buffer = Some(buffer);
        self.uniform_bind_group = Some(bind_group);
        self.uniform_capacity = new_cap;
    }

    /// Writes every recorded vertex and uniform block for this frame.
    fn upload_frame(&mut self) {
        if self.records.is_empty() {
            return;
        }

        self.ensure_vertex_capacity(self.vertices.len());
        self.ensure_uniform_capacity(self.records.len());

        let stride = self.uniform_stride as usize;
        self.uniform_staging.clear();
        self.uniform_staging.resize(self.records.len() * stride, 0);
        for (i, record) in self.records.iter().enumerate() {
            let at = i * stride;
            self.uniform_staging[at..at + UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&record.uniforms));
        }

        let queue = self.ctx.queue();
        if let Some(vbo) = self.vertex_buffer.as_ref() {
            queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.vertices));
        }
        if let Some(ubo) = self.uniform_buffer.as_ref() {
            queue.write_buffer(ubo, 0, &self.uniform_staging);
        }
    }
}

impl GraphicsDevice for WgpuDevice<'_> {
    type Program = WgpuProgram;
    type Texture = WgpuTexture;
    type Buffer = WgpuBuffer;

    fn max_texture_units(&self) -> usize {
        self.units.len()
    }

    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<WgpuProgram, DeviceError> {
        let vs = reflect::compile(ShaderStage::Vertex, vertex)?;
        let fs = reflect::compile(ShaderStage::Fragment, fragment)?;
        let interface = reflect::link(&vs, &fs)?;

        let device = self.ctx.device();
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu sprite vertex shader"),
            source: wgpu::ShaderSource::Wgsl(vertex.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nabu sprite fragment shader"),
            source: wgpu::ShaderSource::Wgsl(fragment.into()),
        });

        Ok(WgpuProgram { id: self.next_id(), vertex, fragment, interface })
    }

    fn attribute_location(&self, program: &WgpuProgram, name: &str) -> Option<AttributeLocation> {
        program.interface.attributes.get(name).copied().map(AttributeLocation)
    }

    fn uniform_location(&self, program: &WgpuProgram, name: &str) -> Option<UniformLocation> {
        program.interface.uniform_index(name).map(UniformLocation)
    }

    fn use_program(&mut self, program: &WgpuProgram) {
        self.program = Some(WgpuProgram {
            id: program.id,
            vertex: program.vertex.clone(),
            fragment: program.fragment.clone(),
            interface: program.interface.clone(),
        });
    }

    fn apply_render_state(&mut self, state: RenderState) -> Result<(), DeviceError> {
        if state.depth_test {
            return Err(DeviceError::Unsupported("depth testing"));
        }
        self.state = state;
        Ok(())
    }

    fn create_buffer(&mut self) -> Result<WgpuBuffer, DeviceError> {
        let id = self.next_id();
        self.buffers.insert(id, Vec::new());
        Ok(WgpuBuffer(id))
    }

    fn upload_vertices(&mut self, buffer: &WgpuBuffer, layout: VertexLayout, vertices: &[SpriteVertex]) {
        let data = self.buffers.entry(buffer.0).or_default();
        data.clear();
        data.extend_from_slice(vertices);
        self.bound_buffer = Some((buffer.0, layout));
    }

    fn create_texture(&mut self) -> Result<WgpuTexture, DeviceError> {
        let id = self.next_id();
        self.textures.insert(id, None);
        Ok(WgpuTexture(id))
    }

    fn bind_texture(&mut self, unit: usize, texture: &WgpuTexture) {
        match self.units.get_mut(unit) {
            Some(slot) => *slot = Some(texture.0),
            None => log::warn!("texture unit {unit} out of range"),
        }
    }

    fn upload_pixels(
        &mut self,
        texture: &WgpuTexture,
        pixels: PixelData<'_>,
        sampler: SamplerParams,
    ) -> Result<(), DeviceError> {
        let (w, h) = (pixels.width, pixels.height);
        check_texture_size(w, h, self.ctx.device().limits().max_texture_dimension_2d)?;

        let in_flight = self.records.iter().any(|r| r.texture_id == texture.0);
        let sampler_obj = self.ensure_sampler(sampler);
        let device = self.ctx.device();
        let Some(slot) = self.textures.get_mut(&texture.0) else {
            log::warn!("upload to deleted texture {}", texture.0);
            return Ok(());
        };

        if !reuse_storage(slot.as_ref().map(|s| s.size), (w, h), in_flight) {
            let tex = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("nabu bitmap texture"),
                size: wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let bind_group = texture_bind_group(device, &self.texture_layout, &tex, &sampler_obj);
            *slot = Some(TextureStorage { texture: tex, size: (w, h), sampler, bind_group });
        }

        let Some(storage) = slot.as_mut() else {
            return Ok(());
        };
        if storage.sampler != sampler {
            storage.bind_group =
                texture_bind_group(device, &self.texture_layout, &storage.texture, &sampler_obj);
            storage.sampler = sampler;
        }

        self.ctx.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &storage.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
        Ok(())
    }

    fn delete_texture(&mut self, texture: WgpuTexture) {
        self.textures.remove(&texture.0);
        for unit in &mut self.units {
            if *unit == Some(texture.0) {
                *unit = None;
            }
        }
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3) {
        match self.uniform_slot(location) {
            Some(UniformSlot::Projection) => self.uniforms.projection = columns(value),
            Some(UniformSlot::View) => self.uniforms.view = columns(value),
            other => log::warn!("uniform {} is not a mat3 ({other:?})", location.0),
        }
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        match self.uniform_slot(location) {
            Some(UniformSlot::Alpha) => self.uniforms.alpha = value,
            other => log::warn!("uniform {} is not an f32 ({other:?})", location.0),
        }
    }

    fn set_uniform_sampler(&mut self, location: UniformLocation, unit: usize) {
        match self.uniform_slot(location) {
            Some(UniformSlot::Texture) => self.sampler_unit = unit,
            other => log::warn!("uniform {} is not a sampler ({other:?})", location.0),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32, _display: (f32, f32)) {
        // The window owns its on-screen size.
        self.ctx.resize(PhysicalSize::new(width, height));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
        self.end_frame();
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) {
        let Some((buffer, layout)) = self.bound_buffer else {
            log::trace!("draw without vertices");
            return;
        };
        let Some(program) = self.program.as_ref() else {
            log::trace!("draw without program");
            return;
        };
        let texture = self.units.get(self.sampler_unit).copied().flatten().and_then(|id| {
            let storage = self.textures.get(&id)?.as_ref()?;
            Some((id, storage.bind_group.clone()))
        });
        let Some((texture_id, texture)) = texture else {
            log::trace!("draw with empty texture unit {}", self.sampler_unit);
            return;
        };

        let key = PipelineKey {
            program: program.id,
            position: layout.position.0,
            uv: layout.uv.0,
            stride: layout.stride,
            blend: self.state.blend,
            cull: self.state.cull_faces,
        };

        let Some(source) = self.buffers.get(&buffer) else {
            return;
        };
        let count = (vertex_count as usize).min(source.len());
        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&source[..count]);

        self.ensure_pipeline(key);
        self.records.push(DrawRecord {
            pipeline: key,
            uniforms: self.uniforms,
            first_vertex,
            vertex_count: count as u32,
            texture_id,
            texture,
        });
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        if !self.ctx.is_drawable() {
            self.end_frame();
            return Ok(());
        }

        let frame = match self.ctx.acquire() {
            Ok(frame) => frame,
            Err(err) => {
                self.end_frame();
                return match self.ctx.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(DeviceError::SurfaceLost),
                    action => {
                        log::debug!("frame dropped: {action:?}");
                        Ok(())
                    }
                };
            }
        };

        self.upload_frame();

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nabu frame encoder"),
            });

        {
            let c = self.clear_color;
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("nabu sprite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(c.r),
                            g: f64::from(c.g),
                            b: f64::from(c.b),
                            a: f64::from(c.a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let (sw, sh) = self.ctx.surface_size();
            let (vw, vh) = (self.viewport.0.min(sw), self.viewport.1.min(sh));
            if vw > 0 && vh > 0 {
                rpass.set_viewport(0.0, 0.0, vw as f32, vh as f32, 0.0, 1.0);
            }

            if let (Some(vbo), Some(ubg)) = (&self.vertex_buffer, &self.uniform_bind_group) {
                rpass.set_vertex_buffer(0, vbo.slice(..));
                for (i, record) in self.records.iter().enumerate() {
                    let Some(pipeline) = self.pipelines.get(&record.pipeline) else {
                        continue;
                    };
                    let offset = (i as u64 * self.uniform_stride) as u32;
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, ubg, &[offset]);
                    rpass.set_bind_group(1, &record.texture, &[]);
                    rpass.draw(record.first_vertex..record.first_vertex + record.vertex_count, 0..1);
                }
            }
        }

        self.ctx.queue().submit(std::iter::once(encoder.finish()));
        frame.present();
        self.end_frame();
        Ok(())
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("nabu bitmap bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn check_texture_size(width: u32, height: u32, max: u32) -> Result<(), DeviceError> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(DeviceError::TextureSize { width, height, max });
    }
    Ok(())
}

/// Whether an upload of `size` may overwrite the texture's current storage.
///
/// Storage sampled by a draw recorded this frame is left alone.
fn reuse_storage(current: Option<(u32, u32)>, size: (u32, u32), in_flight: bool) -> bool {
    current == Some(size) && !in_flight
}
