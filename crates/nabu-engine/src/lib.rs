//! Nabu engine crate.
//!
//! A 2D sprite renderer: a tree of transformed, pre-rasterized bitmaps in,
//! one textured draw per visible node out. Hosts own the window and the scene;
//! this crate owns the GPU side.

pub mod config;
pub mod coords;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
