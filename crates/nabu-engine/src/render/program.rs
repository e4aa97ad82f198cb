//! Sprite shader program bootstrap.

use crate::device::{
    AttributeLocation, GraphicsDevice, RenderState, SpriteVertex, UniformLocation, VertexLayout,
};

use super::RenderError;

pub const VERTEX_SHADER: &str = include_str!("shaders/sprite.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("shaders/sprite.frag.wgsl");

/// Linked sprite program plus the binding locations the renderer uses.
///
/// Built once at renderer initialization. Either every stage compiles, the
/// program links, and all six bindings resolve, or construction fails and
/// nothing is returned.
pub struct ShaderProgram<P> {
    handle: P,
    pub position: AttributeLocation,
    pub uv: AttributeLocation,
    pub projection: UniformLocation,
    pub view: UniformLocation,
    pub alpha: UniformLocation,
    pub sampler: UniformLocation,
}

impl<P> ShaderProgram<P> {
    /// Builds the built-in sprite program.
    pub fn init<D>(device: &mut D) -> Result<Self, RenderError>
    where
        D: GraphicsDevice<Program = P>,
    {
        Self::from_sources(device, VERTEX_SHADER, FRAGMENT_SHADER)
    }

    /// Builds a program from custom stages exposing the same bindings.
    ///
    /// On success the program is current and [`RenderState::sprite`] is
    /// applied.
    pub fn from_sources<D>(device: &mut D, vertex: &str, fragment: &str) -> Result<Self, RenderError>
    where
        D: GraphicsDevice<Program = P>,
    {
        let handle = device.create_program(vertex, fragment)?;

        let attribute = |name: &'static str| {
            device
                .attribute_location(&handle, name)
                .ok_or(RenderError::MissingAttribute(name))
        };
        let position = attribute("a_position")?;
        let uv = attribute("a_uv")?;

        let uniform = |name: &'static str| {
            device
                .uniform_location(&handle, name)
                .ok_or(RenderError::MissingUniform(name))
        };
        let projection = uniform("u_projection")?;
        let view = uniform("u_view")?;
        let alpha = uniform("u_alpha")?;
        let sampler = uniform("u_texture")?;

        device.use_program(&handle);
        device.apply_render_state(RenderState::sprite())?;

        log::debug!(
            "sprite program linked (a_position={}, a_uv={})",
            position.0,
            uv.0
        );

        Ok(Self {
            handle,
            position,
            uv,
            projection,
            view,
            alpha,
            sampler,
        })
    }

    #[inline]
    pub fn handle(&self) -> &P {
        &self.handle
    }

    /// Interleaved position/uv layout for [`SpriteVertex`] buffers.
    #[inline]
    pub fn vertex_layout(&self) -> VertexLayout {
        VertexLayout {
            position: self.position,
            uv: self.uv,
            stride: SpriteVertex::STRIDE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::{Call, FakeDevice};
    use crate::device::{DeviceError, ShaderStage};

    #[test]
    fn init_resolves_bindings_and_configures_state() {
        let mut dev = FakeDevice::with_units(4);
        let program = ShaderProgram::init(&mut dev).unwrap();

        assert_ne!(program.position, program.uv);
        assert_eq!(program.vertex_layout().stride, 16);
        assert!(dev.calls.contains(&Call::UseProgram));
        assert_eq!(dev.render_state, Some(RenderState::sprite()));

        let state = RenderState::sprite();
        assert!(state.blend.is_some());
        assert!(!state.depth_test);
        assert!(!state.cull_faces);
    }

    #[test]
    fn compile_failure_aborts() {
        let mut dev = FakeDevice::with_units(4);
        dev.fail_compile = Some(ShaderStage::Fragment);

        let err = ShaderProgram::init(&mut dev).err().unwrap();
        assert!(matches!(
            err,
            RenderError::Device(DeviceError::Compile { stage: ShaderStage::Fragment, .. })
        ));
        // Nothing was configured on the way out.
        assert_eq!(dev.render_state, None);
    }

    #[test]
    fn link_failure_aborts() {
        let mut dev = FakeDevice::with_units(4);
        dev.fail_link = true;

        let err = ShaderProgram::init(&mut dev).err().unwrap();
        assert!(matches!(err, RenderError::Device(DeviceError::Link(_))));
    }

    #[test]
    fn missing_uniform_aborts() {
        let mut dev = FakeDevice::with_units(4);
        dev.hidden_binding = Some("u_alpha");

        let err = ShaderProgram::init(&mut dev).err().unwrap();
        assert_eq!(err, RenderError::MissingUniform("u_alpha"));
        assert!(!dev.calls.contains(&Call::UseProgram));
    }

    #[test]
    fn missing_attribute_aborts() {
        let mut dev = FakeDevice::with_units(4);
        let vertex = VERTEX_SHADER.replace("a_uv", "a_texcoord");

        let err = ShaderProgram::from_sources(&mut dev, &vertex, FRAGMENT_SHADER).err().unwrap();
        assert_eq!(err, RenderError::MissingAttribute("a_uv"));
    }
}
