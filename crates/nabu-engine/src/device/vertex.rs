use bytemuck::{Pod, Zeroable};

/// Interleaved sprite vertex: pixel-space position, then texture coordinate.
///
/// Layout (16 bytes):
///
///  offset 0  position [f32; 2]
///  offset 8  uv       [f32; 2]
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    pub const STRIDE: u32 = std::mem::size_of::<SpriteVertex>() as u32;
    pub const UV_OFFSET: u32 = 8;

    #[inline]
    pub const fn new(x: f32, y: f32, s: f32, t: f32) -> Self {
        Self { position: [x, y], uv: [s, t] }
    }
}

/// Where the program reads each vertex field from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub position: super::AttributeLocation,
    pub uv: super::AttributeLocation,
    pub stride: u32,
}
