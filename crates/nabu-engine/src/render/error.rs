use std::fmt;

use crate::device::DeviceError;

/// Renderer-level failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The device refused an operation (context, compile, link, state).
    Device(DeviceError),
    /// The linked program does not expose a required attribute.
    MissingAttribute(&'static str),
    /// The linked program does not expose a required uniform.
    MissingUniform(&'static str),
    /// The device (or the configured budget) offers no texture units.
    NoTextureUnits,
    /// Pixel buffer length does not match `width * height * 4`.
    InvalidBitmap { expected: usize, actual: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Device(err) => write!(f, "{err}"),
            RenderError::MissingAttribute(name) => {
                write!(f, "sprite program has no attribute `{name}`")
            }
            RenderError::MissingUniform(name) => {
                write!(f, "sprite program has no uniform `{name}`")
            }
            RenderError::NoTextureUnits => f.write_str("no texture units available"),
            RenderError::InvalidBitmap { expected, actual } => {
                write!(f, "bitmap holds {actual} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        RenderError::Device(err)
    }
}
