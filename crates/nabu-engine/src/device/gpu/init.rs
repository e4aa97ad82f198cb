/// How the wgpu backend picks its adapter, device limits, and surface.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: bitmaps and clear colors are already display-encoded,
    /// so they are written through unchanged.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Surface alpha mode. Falls back to a supported mode when unavailable.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Texture units to request from the adapter.
    ///
    /// `None` keeps the portable default limits. A request above what the
    /// adapter supports is lowered to the adapter maximum.
    pub texture_units: Option<u32>,

    /// Hint; support depends on platform and backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: Some(wgpu::CompositeAlphaMode::PreMultiplied),
            texture_units: None,
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Device limits to request from an adapter reporting `adapter` limits.
    pub(super) fn limits_for(&self, adapter: &wgpu::Limits) -> wgpu::Limits {
        let mut limits = wgpu::Limits::default().using_resolution(adapter.clone());
        if let Some(units) = self.texture_units {
            limits.max_sampled_textures_per_shader_stage =
                units.min(adapter.max_sampled_textures_per_shader_stage);
        }
        limits
    }
}
