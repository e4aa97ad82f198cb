//! Sprite rendering.
//!
//! Translates transformed, pre-rasterized bitmaps into one textured
//! triangle-strip draw each, through any [`GraphicsDevice`](crate::device::GraphicsDevice).
//!
//! Convention:
//! - geometry is in backing-store pixels (top-left origin, +Y down)
//! - the vertex stage maps it to clip space with `projection · view`
//! - texels are premultiplied; blending is premultiplied "over"
//!
//! Mask regions (`begin_mask` / `end_mask`) are accepted but not implemented.

mod error;
mod frame;
mod node;
pub mod program;
mod target;
pub mod texture_cache;
pub mod transform;

pub use error::RenderError;
pub use frame::{DrawOutcome, FrameRenderer, FrameStats, SkipReason};
pub use node::{AlphaMode, Bitmap, BitmapId, DrawNode, Region, SharedBitmap};
pub use program::ShaderProgram;
pub use target::{RenderTarget, ortho_projection};
pub use texture_cache::{CacheStats, TextureSlotCache};
pub use transform::{SpriteQuad, compose_quad};
