//! Per-frame orchestration.
//!
//! One [`FrameRenderer`] owns the device, the sprite program, the shared
//! vertex buffer, and the texture slot cache. A host drives it once per tick:
//!
//! ```text
//! begin() → draw(node)* → end()
//! ```
//!
//! with `resize()` whenever the stage size or pixel ratio changed.

use crate::config::{RendererConfig, StageConfig};
use crate::device::{DeviceError, GraphicsDevice};
use crate::paint::Color;

use super::RenderError;
use super::node::{Bitmap, BitmapId, DrawNode};
use super::program::ShaderProgram;
use super::target::RenderTarget;
use super::texture_cache::TextureSlotCache;
use super::transform::compose_quad;

/// Why a node produced no draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// The node's bitmap is still being rasterized.
    Composing,
    /// Zero width or height.
    EmptyBitmap,
    /// The bitmap is mutably borrowed elsewhere.
    BitmapBusy,
    /// The device cannot hold the bitmap as a texture.
    TextureRejected,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawOutcome {
    Drawn { unit: usize },
    Skipped(SkipReason),
}

/// Counters for the frame in progress.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub draw_calls: usize,
    pub skipped: usize,
    pub uploads: usize,
    pub rebinds: usize,
    pub unit_overflows: usize,
}

pub struct FrameRenderer<D: GraphicsDevice> {
    device: D,
    program: ShaderProgram<D::Program>,
    vertices: D::Buffer,
    textures: TextureSlotCache<D::Texture>,

    stage: StageConfig,
    target: RenderTarget,

    draw_calls: usize,
    skipped: usize,

    // One-time notices.
    rejected_background: Option<String>,
    mask_noted: bool,
}

impl<D: GraphicsDevice> FrameRenderer<D> {
    /// Builds the program, the vertex buffer, and the initial render target.
    ///
    /// Any failure is returned before a renderer exists.
    pub fn init(
        mut device: D,
        stage: StageConfig,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let program = ShaderProgram::init(&mut device)?;
        let vertices = device.create_buffer()?;

        let max_units = device.max_texture_units();
        let budget = config.unit_budget.map_or(max_units, |cap| cap.min(max_units));
        if budget == 0 {
            return Err(RenderError::NoTextureUnits);
        }

        let target = RenderTarget::from_stage(&stage);
        let mut renderer = Self {
            device,
            program,
            vertices,
            textures: TextureSlotCache::new(budget),
            stage,
            target,
            draw_calls: 0,
            skipped: 0,
            rejected_background: None,
            mask_noted: false,
        };
        renderer.resize();

        log::debug!(
            "renderer ready: {} texture units (device max {max_units})",
            budget
        );
        Ok(renderer)
    }

    /// Clears the target and forgets last frame's unit assignments.
    pub fn begin(&mut self) {
        self.textures.begin_frame();
        self.draw_calls = 0;
        self.skipped = 0;

        let clear = self.background();
        self.device.clear(clear);
    }

    /// Draws one node, or skips it without touching the device.
    pub fn draw(&mut self, node: &DrawNode) -> Result<DrawOutcome, RenderError> {
        if node.composing {
            return Ok(self.skip(SkipReason::Composing));
        }
        let Ok(mut bitmap) = node.bitmap.try_borrow_mut() else {
            return Ok(self.skip(SkipReason::BitmapBusy));
        };
        if bitmap.is_empty() {
            return Ok(self.skip(SkipReason::EmptyBitmap));
        }

        let unit = match self.textures.assign(&mut self.device, &mut bitmap) {
            Ok(unit) => unit,
            Err(RenderError::Device(err @ DeviceError::TextureSize { .. })) => {
                log::debug!("bitmap {:?} not drawn: {err}", bitmap.id());
                return Ok(self.skip(SkipReason::TextureRejected));
            }
            Err(err) => return Err(err),
        };
        let quad = compose_quad(node.transform, node.region, bitmap.width(), bitmap.height());
        drop(bitmap);

        let alpha = if node.alpha.is_nan() { 0.0 } else { node.alpha.clamp(0.0, 1.0) };

        let dev = &mut self.device;
        dev.upload_vertices(&self.vertices, self.program.vertex_layout(), &quad.vertices);
        dev.set_uniform_sampler(self.program.sampler, unit);
        dev.set_uniform_f32(self.program.alpha, alpha);
        dev.set_uniform_mat3(self.program.projection, self.target.projection());
        dev.set_uniform_mat3(self.program.view, &quad.matrix.to_mat3());
        dev.draw_triangle_strip(4);

        self.draw_calls += 1;
        Ok(DrawOutcome::Drawn { unit })
    }

    /// Starts a clip region. Not implemented: content is drawn unclipped.
    pub fn begin_mask(&mut self, _node: &DrawNode) {
        self.note_mask();
    }

    /// Ends the clip region opened by [`Self::begin_mask`]. Not implemented.
    pub fn end_mask(&mut self) {
        self.note_mask();
    }

    /// Recomputes the backing store, viewport, and projection from the stage.
    pub fn resize(&mut self) {
        self.target = RenderTarget::from_stage(&self.stage);
        let (w, h) = (self.target.width(), self.target.height());

        self.device.resize_surface(w, h, self.target.display_size());
        self.device.set_viewport(w, h);
        log::debug!("render target {w}x{h} (ratio {})", self.stage.device_pixel_ratio);
    }

    /// Presents everything drawn since [`Self::begin`].
    pub fn end(&mut self) -> Result<(), RenderError> {
        self.device.present()?;
        Ok(())
    }

    /// Binds `bitmap` to a texture unit for this frame.
    pub fn assign(&mut self, bitmap: &mut Bitmap) -> Result<usize, RenderError> {
        self.textures.assign(&mut self.device, bitmap)
    }

    /// Drops the GPU texture held for a bitmap the owner no longer needs.
    pub fn release_bitmap(&mut self, id: BitmapId) {
        self.textures.release(&mut self.device, id);
    }

    pub fn stats(&self) -> FrameStats {
        let cache = self.textures.stats();
        FrameStats {
            draw_calls: self.draw_calls,
            skipped: self.skipped,
            uploads: cache.uploads,
            rebinds: cache.rebinds,
            unit_overflows: cache.unit_overflows,
        }
    }

    #[inline]
    pub fn unit_budget(&self) -> usize {
        self.textures.budget()
    }

    #[inline]
    pub fn stage(&self) -> &StageConfig {
        &self.stage
    }

    /// Call [`Self::resize`] after changing size or pixel ratio.
    #[inline]
    pub fn stage_mut(&mut self) -> &mut StageConfig {
        &mut self.stage
    }

    #[inline]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn background(&mut self) -> Color {
        let bg = self.stage.background.as_str();
        if bg.is_empty() {
            return Color::transparent();
        }
        if let Some(color) = Color::from_hex(bg) {
            return color;
        }

        if self.rejected_background.as_deref() != Some(bg) {
            log::warn!("background {bg:?} is not #RRGGBB; clearing to transparent");
            self.rejected_background = Some(bg.to_owned());
        }
        Color::transparent()
    }

    fn skip(&mut self, reason: SkipReason) -> DrawOutcome {
        self.skipped += 1;
        log::trace!("skipped node: {reason:?}");
        DrawOutcome::Skipped(reason)
    }

    fn note_mask(&mut self) {
        if !self.mask_noted {
            self.mask_noted = true;
            log::debug!("mask regions are not supported; drawing unclipped");
        }
    }
}

impl<D: GraphicsDevice> Drop for FrameRenderer<D> {
    fn drop(&mut self) {
        self.textures.release_all(&mut self.device);
    }
}
