//! Inputs handed to the renderer by the scene graph.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coords::{Affine, Rect};
use crate::paint::premultiply_rgba8;

use super::RenderError;

/// Process-unique bitmap identity. Keys GPU texture records.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl BitmapId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BitmapId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How the color channels of a bitmap relate to its alpha.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlphaMode {
    Premultiplied,
    /// Converted to premultiplied on upload.
    Straight,
}

/// A pre-rasterized RGBA8 bitmap.
///
/// The owner sets the dirty flag whenever the pixels change (every mutator
/// here does); the texture cache clears it after uploading.
#[derive(Debug)]
pub struct Bitmap {
    id: BitmapId,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    alpha: AlphaMode,
    needs_update: bool,
}

/// Bitmaps are shared between the nodes that display them.
pub type SharedBitmap = Rc<RefCell<Bitmap>>;

impl Bitmap {
    /// Wraps tightly packed RGBA8 rows. A new bitmap always needs an upload.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        alpha: AlphaMode,
    ) -> Result<Self, RenderError> {
        check_len(width, height, &pixels)?;
        Ok(Self {
            id: BitmapId::next(),
            width,
            height,
            pixels,
            alpha,
            needs_update: true,
        })
    }

    /// A fully transparent bitmap.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            id: BitmapId::next(),
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            alpha: AlphaMode::Premultiplied,
            needs_update: true,
        }
    }

    pub fn into_shared(self) -> SharedBitmap {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn id(&self) -> BitmapId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the pixels changed since the last upload.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Flags the pixels as changed without replacing them.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.needs_update = true;
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.needs_update = false;
    }

    /// Replaces the content, possibly at a new size.
    pub fn replace(&mut self, width: u32, height: u32, pixels: Vec<u8>) -> Result<(), RenderError> {
        check_len(width, height, &pixels)?;
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        self.needs_update = true;
        Ok(())
    }

    /// Mutable access to the pixels; marks the bitmap dirty.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.needs_update = true;
        &mut self.pixels
    }

    /// Premultiplied texels, converting into `scratch` when stored straight.
    pub(crate) fn premultiplied<'a>(&'a self, scratch: &'a mut Vec<u8>) -> &'a [u8] {
        match self.alpha {
            AlphaMode::Premultiplied => &self.pixels[..],
            AlphaMode::Straight => {
                premultiply_rgba8(&self.pixels, scratch);
                &scratch[..]
            }
        }
    }
}

fn check_len(width: u32, height: u32, pixels: &[u8]) -> Result<(), RenderError> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(RenderError::InvalidBitmap { expected, actual: pixels.len() });
    }
    Ok(())
}

/// Which part of the bitmap a node shows.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Region {
    /// A sub-image of a shared atlas bitmap.
    Atlas(Rect),
    /// The node's own cached bitmap, padded by a margin on every side.
    Margins { x: f32, y: f32 },
}

impl Default for Region {
    fn default() -> Self {
        Region::Margins { x: 0.0, y: 0.0 }
    }
}

/// One visible display object as seen by the renderer.
#[derive(Debug, Clone)]
pub struct DrawNode {
    /// Cumulative transform (parents included), in backing-store pixels.
    pub transform: Affine,
    /// Cumulative opacity in `[0, 1]`.
    pub alpha: f32,
    pub bitmap: SharedBitmap,
    pub region: Region,
    /// Set while the bitmap is being re-rasterized; such nodes are not drawn.
    pub composing: bool,
}

impl DrawNode {
    pub fn new(bitmap: SharedBitmap) -> Self {
        Self {
            transform: Affine::IDENTITY,
            alpha: 1.0,
            bitmap,
            region: Region::default(),
            composing: false,
        }
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_atlas_rect(mut self, rect: Rect) -> Self {
        self.region = Region::Atlas(rect);
        self
    }

    pub fn with_margins(mut self, x: f32, y: f32) -> Self {
        self.region = Region::Margins { x, y };
        self
    }
}
