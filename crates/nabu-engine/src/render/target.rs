use crate::config::StageConfig;
use crate::coords::Mat3;

/// Backing surface geometry and the projection derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    display_width: f32,
    display_height: f32,
    projection: Mat3,
}

impl RenderTarget {
    /// Sizes the backing store at `logical × device_pixel_ratio`.
    pub fn from_stage(stage: &StageConfig) -> Self {
        let (width, height) = stage.backing_size();
        Self {
            width,
            height,
            display_width: stage.logical_width,
            display_height: stage.logical_height,
            projection: ortho_projection(width, height),
        }
    }

    /// Backing-store width in physical pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Backing-store height in physical pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// On-screen size in logical pixels.
    #[inline]
    pub fn display_size(&self) -> (f32, f32) {
        (self.display_width, self.display_height)
    }

    #[inline]
    pub fn projection(&self) -> &Mat3 {
        &self.projection
    }
}

/// Device pixels (top-left origin, +Y down) to clip space.
///
/// Column-major: `diag(2/w, −2/h)` with translation `(−1, 1, 1)`.
pub fn ortho_projection(width: u32, height: u32) -> Mat3 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    [
        2.0 / w, 0.0, 0.0,
        0.0, -2.0 / h, 0.0,
        -1.0, 1.0, 1.0,
    ]
}
