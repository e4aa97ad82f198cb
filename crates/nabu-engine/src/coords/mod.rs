//! Geometry types shared by the renderer.
//!
//! Canonical CPU space:
//! - device pixels of the backing store
//! - origin top-left
//! - +X right, +Y down
//!
//! The projection in `render::target` maps this space to clip space.

mod affine;
mod rect;

pub use affine::{Affine, Mat3};
pub use rect::Rect;
