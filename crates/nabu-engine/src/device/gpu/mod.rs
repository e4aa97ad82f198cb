//! wgpu backend.
//!
//! - [`GpuContext`]: Device/Queue/Surface ownership and surface configuration
//! - [`WgpuDevice`]: the [`GraphicsDevice`](super::GraphicsDevice) emulation on top of it

mod backend;
mod context;
mod init;
mod reflect;
mod surface;

pub use backend::{WgpuBuffer, WgpuDevice, WgpuProgram, WgpuTexture};
pub use context::GpuContext;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
