//! Recording device for tests.

use std::collections::HashMap;

use crate::coords::Mat3;
use crate::paint::Color;

use super::{
    AttributeLocation, DeviceError, GraphicsDevice, PixelData, RenderState, SamplerParams,
    ShaderStage, SpriteVertex, UniformLocation, VertexLayout,
};

const ATTRIBUTES: [&str; 2] = ["a_position", "a_uv"];
const UNIFORMS: [&str; 4] = ["u_projection", "u_view", "u_alpha", "u_texture"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateProgram,
    UseProgram,
    RenderState(RenderState),
    CreateBuffer,
    Vertices,
    CreateTexture(u32),
    Bind { unit: usize, texture: u32 },
    Upload { texture: u32, width: u32, height: u32 },
    Delete(u32),
    Resize(u32, u32),
    Viewport(u32, u32),
    Clear(Color),
    Draw { unit: usize, texture: Option<u32>, vertex_count: u32 },
    Present,
}

pub(crate) struct FakeProgram {
    source: String,
}

pub(crate) struct FakeTexture(pub u32);

pub(crate) struct FakeBuffer;

pub(crate) struct FakeDevice {
    pub units: usize,
    /// Largest texture side `upload_pixels` accepts.
    pub max_texture_size: u32,
    pub fail_compile: Option<ShaderStage>,
    pub fail_link: bool,
    pub hidden_binding: Option<&'static str>,

    pub calls: Vec<Call>,
    pub bound: Vec<Option<u32>>,
    pub pixels: HashMap<u32, Vec<u8>>,
    pub sampler: Option<SamplerParams>,
    pub sampler_unit: usize,
    pub mat3: HashMap<u32, Mat3>,
    pub floats: HashMap<u32, f32>,
    pub vertices: Vec<SpriteVertex>,
    pub layout: Option<VertexLayout>,
    pub surface: (u32, u32),
    pub display: (f32, f32),
    pub viewport: (u32, u32),
    pub clear_color: Option<Color>,
    pub render_state: Option<RenderState>,

    next_texture: u32,
}

impl FakeDevice {
    pub fn with_units(units: usize) -> Self {
        Self {
            units,
            max_texture_size: 8192,
            fail_compile: None,
            fail_link: false,
            hidden_binding: None,
            calls: Vec::new(),
            bound: vec![None; units],
            pixels: HashMap::new(),
            sampler: None,
            sampler_unit: 0,
            mat3: HashMap::new(),
            floats: HashMap::new(),
            vertices: Vec::new(),
            layout: None,
            surface: (0, 0),
            display: (0.0, 0.0),
            viewport: (0, 0),
            clear_color: None,
            render_state: None,
            next_texture: 1,
        }
    }

    pub fn uploads(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Upload { .. })).count()
    }

    pub fn uploads_of(&self, texture: u32) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Upload { texture: t, .. } if *t == texture))
            .count()
    }

    pub fn binds(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Bind { .. })).count()
    }

    pub fn draws(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Draw { .. })).collect()
    }

    pub fn textures_created(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::CreateTexture(_))).count()
    }

    pub fn forget_calls(&mut self) {
        self.calls.clear();
    }

    fn binding_visible(&self, program: &FakeProgram, name: &str) -> bool {
        self.hidden_binding != Some(name) && program.source.contains(name)
    }
}

impl GraphicsDevice for FakeDevice {
    type Program = FakeProgram;
    type Texture = FakeTexture;
    type Buffer = FakeBuffer;

    fn max_texture_units(&self) -> usize {
        self.units
    }

    fn create_program(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<FakeProgram, DeviceError> {
        self.calls.push(Call::CreateProgram);
        if let Some(stage) = self.fail_compile {
            return Err(DeviceError::Compile { stage, log: "syntax error".into() });
        }
        if self.fail_link {
            return Err(DeviceError::Link("varying mismatch".into()));
        }
        Ok(FakeProgram { source: format!("{vertex}\n{fragment}") })
    }

    fn attribute_location(&self, program: &FakeProgram, name: &str) -> Option<AttributeLocation> {
        let idx = ATTRIBUTES.iter().position(|a| *a == name)?;
        self.binding_visible(program, name).then_some(AttributeLocation(idx as u32))
    }

    fn uniform_location(&self, program: &FakeProgram, name: &str) -> Option<UniformLocation> {
        let idx = UNIFORMS.iter().position(|u| *u == name)?;
        self.binding_visible(program, name).then_some(UniformLocation(idx as u32))
    }

    fn use_program(&mut self, _program: &FakeProgram) {
        self.calls.push(Call::UseProgram);
    }

    fn apply_render_state(&mut self, state: RenderState) -> Result<(), DeviceError> {
        self.calls.push(Call::RenderState(state));
        self.render_state = Some(state);
        Ok(())
    }

    fn create_buffer(&mut self) -> Result<FakeBuffer, DeviceError> {
        self.calls.push(Call::CreateBuffer);
        Ok(FakeBuffer)
    }

    fn upload_vertices(
        &mut self,
        _buffer: &FakeBuffer,
        layout: VertexLayout,
        vertices: &[SpriteVertex],
    ) {
        self.calls.push(Call::Vertices);
        self.layout = Some(layout);
        self.vertices = vertices.to_vec();
    }

    fn create_texture(&mut self) -> Result<FakeTexture, DeviceError> {
        let id = self.next_texture;
        self.next_texture += 1;
        self.calls.push(Call::CreateTexture(id));
        Ok(FakeTexture(id))
    }

    fn bind_texture(&mut self, unit: usize, texture: &FakeTexture) {
        assert!(unit < self.units, "unit {unit} out of range");
        self.calls.push(Call::Bind { unit, texture: texture.0 });
        self.bound[unit] = Some(texture.0);
    }

    fn upload_pixels(
        &mut self,
        texture: &FakeTexture,
        pixels: PixelData<'_>,
        sampler: SamplerParams,
    ) -> Result<(), DeviceError> {
        assert_eq!(pixels.rgba.len(), (pixels.width * pixels.height * 4) as usize);
        let (width, height, max) = (pixels.width, pixels.height, self.max_texture_size);
        if width == 0 || height == 0 || width > max || height > max {
            return Err(DeviceError::TextureSize { width, height, max });
        }
        self.calls.push(Call::Upload {
            texture: texture.0,
            width: pixels.width,
            height: pixels.height,
        });
        self.pixels.insert(texture.0, pixels.rgba.to_vec());
        self.sampler = Some(sampler);
        Ok(())
    }

    fn delete_texture(&mut self, texture: FakeTexture) {
        self.calls.push(Call::Delete(texture.0));
        self.pixels.remove(&texture.0);
        for slot in &mut self.bound {
            if *slot == Some(texture.0) {
                *slot = None;
            }
        }
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3) {
        self.mat3.insert(location.0, *value);
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.floats.insert(location.0, value);
    }

    fn set_uniform_sampler(&mut self, _location: UniformLocation, unit: usize) {
        self.sampler_unit = unit;
    }

    fn resize_surface(&mut self, width: u32, height: u32, display: (f32, f32)) {
        self.calls.push(Call::Resize(width, height));
        self.surface = (width, height);
        self.display = display;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(Call::Clear(color));
        self.clear_color = Some(color);
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) {
        let unit = self.sampler_unit;
        self.calls.push(Call::Draw {
            unit,
            texture: self.bound.get(unit).copied().flatten(),
            vertex_count,
        });
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.calls.push(Call::Present);
        Ok(())
    }
}
