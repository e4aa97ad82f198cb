//! Color model shared between the renderer and its hosts.
//!
//! Colors are premultiplied RGBA in the surface encoding, matching the
//! premultiplied-alpha blend state the sprite program runs with.

pub mod color;

pub use color::{Color, premultiply_rgba8};
