//! Renderer configuration.
//!
//! Keep these structures small. Hosts own them and mutate them between frames;
//! the renderer reads them on `begin()` and `resize()`.

/// What the stage (the host that mounts the surface) tells the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Background as `#RRGGBB`. Empty means "clear to transparent".
    pub background: String,

    /// Surface size in logical pixels.
    pub logical_width: f32,
    pub logical_height: f32,

    /// Physical pixels per logical pixel.
    pub device_pixel_ratio: f32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            background: String::new(),
            logical_width: 800.0,
            logical_height: 600.0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl StageConfig {
    /// Backing-store size in physical pixels, never below 1×1.
    pub fn backing_size(&self) -> (u32, u32) {
        let ratio = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        let scale = |logical: f32| {
            let px = (logical * ratio).round();
            if px.is_finite() && px >= 1.0 { px as u32 } else { 1 }
        };
        (scale(self.logical_width), scale(self.logical_height))
    }
}

/// Renderer tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererConfig {
    /// Upper bound on texture units used per frame.
    ///
    /// `None` uses everything the device reports. Values above the device
    /// maximum are clamped.
    pub unit_budget: Option<usize>,
}
