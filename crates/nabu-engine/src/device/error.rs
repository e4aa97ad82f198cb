use std::fmt;

/// Shader stage named in compile errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure reported by a [`GraphicsDevice`](super::GraphicsDevice).
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Adapter, device, or surface could not be created.
    Context(String),
    /// A shader stage failed to compile; `log` is the backend's diagnostic.
    Compile { stage: ShaderStage, log: String },
    /// The compiled stages could not be linked into a program.
    Link(String),
    /// The backend cannot honor the requested state.
    Unsupported(&'static str),
    /// Pixel data the device cannot hold as a texture.
    TextureSize { width: u32, height: u32, max: u32 },
    /// The presentation surface is gone for good.
    SurfaceLost,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Context(msg) => write!(f, "graphics context unavailable: {msg}"),
            DeviceError::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile: {log}")
            }
            DeviceError::Link(log) => write!(f, "shader program failed to link: {log}"),
            DeviceError::Unsupported(what) => write!(f, "unsupported by this device: {what}"),
            DeviceError::TextureSize { width, height, max } => {
                write!(f, "cannot hold a {width}x{height} texture (max {max})")
            }
            DeviceError::SurfaceLost => f.write_str("presentation surface lost"),
        }
    }
}

impl std::error::Error for DeviceError {}
