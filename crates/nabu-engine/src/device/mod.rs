//! Graphics device boundary.
//!
//! The renderer never touches a graphics API directly. Everything it needs is
//! the narrow capability set of [`GraphicsDevice`]:
//! - compile/link a program, look up its attributes and uniforms
//! - configure blend/depth/cull state
//! - create, bind, fill, and delete textures on numbered texture units
//! - upload the shared vertex buffer and set uniforms
//! - clear, size the surface, issue a triangle-strip draw, present
//!
//! The semantics are those of a classic immediate-mode rasterizer: binding a
//! texture to a unit persists until something else is bound there, and a draw
//! samples whatever is bound at the unit the sampler uniform points to.
//!
//! [`gpu::WgpuDevice`] implements this on top of wgpu.

mod error;
pub mod gpu;
mod vertex;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{DeviceError, ShaderStage};
pub use vertex::{SpriteVertex, VertexLayout};

use crate::coords::Mat3;
use crate::paint::Color;

/// Location of a vertex attribute in a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttributeLocation(pub u32);

/// Location of a uniform in a linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// Color blend equation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `src · 1 + dst · (1 − src.a)`: "over" for premultiplied input.
    PremultipliedOver,
}

/// Fixed-function state configured once per program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderState {
    pub blend: Option<BlendMode>,
    pub depth_test: bool,
    pub cull_faces: bool,
}

impl RenderState {
    /// State for 2D sprites: premultiplied blending, no depth, no culling.
    pub const fn sprite() -> Self {
        Self {
            blend: Some(BlendMode::PremultipliedOver),
            depth_test: false,
            cull_faces: false,
        }
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::sprite()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// Sampling parameters applied to a texture on upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerParams {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl SamplerParams {
    /// Linear filtering, clamped at the edges.
    pub const fn linear_clamp() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
        }
    }
}

/// Tightly packed premultiplied RGBA8 pixels.
#[derive(Debug, Copy, Clone)]
pub struct PixelData<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// Minimal capability set the renderer needs from a graphics backend.
pub trait GraphicsDevice {
    /// Linked program handle.
    type Program;
    /// GPU texture handle.
    type Texture;
    /// Vertex buffer handle.
    type Buffer;

    /// Number of texture units a single draw can sample from.
    fn max_texture_units(&self) -> usize;

    /// Compiles both stages and links them.
    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self::Program, DeviceError>;

    fn attribute_location(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Option<AttributeLocation>;

    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    /// Makes `program` current for subsequent uniforms and draws.
    fn use_program(&mut self, program: &Self::Program);

    /// Configures blend/depth/cull for the current program.
    fn apply_render_state(&mut self, state: RenderState) -> Result<(), DeviceError>;

    fn create_buffer(&mut self) -> Result<Self::Buffer, DeviceError>;

    /// Replaces the buffer contents and points the attributes at it.
    fn upload_vertices(
        &mut self,
        buffer: &Self::Buffer,
        layout: VertexLayout,
        vertices: &[SpriteVertex],
    );

    fn create_texture(&mut self) -> Result<Self::Texture, DeviceError>;

    /// Attaches `texture` to `unit`, replacing whatever was bound there.
    fn bind_texture(&mut self, unit: usize, texture: &Self::Texture);

    /// Replaces the texture's storage with `pixels` and sets its sampling.
    ///
    /// Fails with [`DeviceError::TextureSize`], leaving the texture as it was,
    /// when the device cannot hold `pixels`.
    fn upload_pixels(
        &mut self,
        texture: &Self::Texture,
        pixels: PixelData<'_>,
        sampler: SamplerParams,
    ) -> Result<(), DeviceError>;

    fn delete_texture(&mut self, texture: Self::Texture);

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3);

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);

    /// Points a sampler uniform at a texture unit.
    fn set_uniform_sampler(&mut self, location: UniformLocation, unit: usize);

    /// Resizes the backing store in physical pixels.
    ///
    /// `display` is the logical size the surface is shown at; backends whose
    /// host owns the on-screen size may ignore it.
    fn resize_surface(&mut self, width: u32, height: u32, display: (f32, f32));

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clears the color buffer. Starts a new frame.
    fn clear(&mut self, color: Color);

    /// Draws `vertex_count` vertices of the current buffer as a triangle strip.
    fn draw_triangle_strip(&mut self, vertex_count: u32);

    /// Hands the finished frame to the display.
    fn present(&mut self) -> Result<(), DeviceError>;
}
