//! Procedural demo content.
//!
//! Three kinds of sprites orbit the window center:
//! - discs cut from one shared atlas bitmap (one texture, many nodes)
//! - tiles that each own a bitmap with a transparent margin, stored with
//!   straight alpha; one of them is periodically re-rasterized
//! - an optional user image in the middle

use std::path::Path;

use anyhow::{Context, Result};
use nabu_engine::coords::{Affine, Rect};
use nabu_engine::render::{AlphaMode, Bitmap, BitmapId, DrawNode};

const CELL: u32 = 32;
const ATLAS_CELLS: u32 = 4;
const TILE: u32 = 24;
const MARGIN: u32 = 2;

/// Frames between tile re-rasterizations.
const RECOMPOSE_EVERY: u64 = 45;
/// Frames a tile stays in the composing state.
const COMPOSE_FRAMES: u64 = 3;
/// Frames between tile bitmap replacements.
const REPLACE_EVERY: u64 = 600;

const PALETTE: [[u8; 3]; 6] = [
    [0xE0, 0x4F, 0x5F],
    [0xF2, 0xA5, 0x41],
    [0x4C, 0xB9, 0x63],
    [0x3A, 0x86, 0xFF],
    [0x9B, 0x5D, 0xE5],
    [0x2E, 0xC4, 0xB6],
];

// ── rasterization ─────────────────────────────────────────────────────────

/// Anti-aliased disc, premultiplied RGBA8.
pub fn disc(size: u32, rgb: [u8; 3]) -> Vec<u8> {
    let c = size as f32 / 2.0;
    let r = c - 1.0;
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - c;
            let dy = y as f32 + 0.5 - c;
            let coverage = (r - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0);
            let a = (coverage * 255.0).round() as u16;
            let mul = |v: u8| ((v as u16 * a + 127) / 255) as u8;
            out.extend_from_slice(&[mul(rgb[0]), mul(rgb[1]), mul(rgb[2]), a as u8]);
        }
    }
    out
}

/// Square with a transparent `margin` and a vertical alpha ramp, straight RGBA8.
pub fn tile(size: u32, margin: u32, rgb: [u8; 3], shade: u8) -> Vec<u8> {
    let inner = size.saturating_sub(margin * 2).max(1);
    let scale = |v: u8| ((v as u16 * shade as u16) / 255) as u8;
    let mut out = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let inside = (margin..size - margin).contains(&x) && (margin..size - margin).contains(&y);
            if inside {
                let a = 128 + ((y - margin) * 127 / inner) as u8;
                out.extend_from_slice(&[scale(rgb[0]), scale(rgb[1]), scale(rgb[2]), a]);
            } else {
                out.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    out
}

fn atlas() -> Result<Bitmap> {
    let width = CELL * ATLAS_CELLS;
    let row = (width * 4) as usize;
    let mut pixels = vec![0u8; row * CELL as usize];

    for i in 0..ATLAS_CELLS {
        let cell = disc(CELL, PALETTE[i as usize]);
        let cell_row = (CELL * 4) as usize;
        for y in 0..CELL as usize {
            let dst = y * row + i as usize * cell_row;
            pixels[dst..dst + cell_row].copy_from_slice(&cell[y * cell_row..(y + 1) * cell_row]);
        }
    }

    Ok(Bitmap::new(width, CELL, pixels, AlphaMode::Premultiplied)?)
}

/// Atlas sub-rectangle of disc `i`.
pub fn atlas_cell(i: u32) -> Rect {
    let i = i % ATLAS_CELLS;
    Rect::new((i * CELL) as f32, 0.0, CELL as f32, CELL as f32)
}

fn tile_bitmap(index: usize, shade: u8) -> Result<Bitmap> {
    let rgb = PALETTE[index % PALETTE.len()];
    Ok(Bitmap::new(TILE + MARGIN * 2, TILE + MARGIN * 2, tile(TILE + MARGIN * 2, MARGIN, rgb, shade), AlphaMode::Straight)?)
}

/// Decodes an image file into a straight-alpha bitmap.
pub fn load_image(path: &Path) -> Result<Bitmap> {
    let rgba = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    Bitmap::new(w, h, rgba.into_raw(), AlphaMode::Straight)
        .with_context(|| format!("invalid image {}", path.display()))
}

// ── scene ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Kind {
    Disc,
    Tile,
}

struct Sprite {
    node: DrawNode,
    kind: Kind,
    phase: f32,
    speed: f32,
    /// Orbit radius as a fraction of the half-extent.
    orbit: f32,
}

impl Sprite {
    fn content_size(&self) -> f32 {
        match self.kind {
            Kind::Disc => CELL as f32,
            Kind::Tile => TILE as f32,
        }
    }
}

pub struct DemoScene {
    sprites: Vec<Sprite>,
    image: Option<DrawNode>,
    retired: Vec<BitmapId>,
    frame: u64,
}

impl DemoScene {
    pub fn new(count: usize, image: Option<Bitmap>) -> Result<Self> {
        let atlas = atlas()?.into_shared();

        let mut sprites = Vec::with_capacity(count);
        for i in 0..count {
            let (kind, node) = if i % 2 == 0 {
                let node = DrawNode::new(atlas.clone()).with_atlas_rect(atlas_cell(i as u32 / 2));
                (Kind::Disc, node)
            } else {
                let node = DrawNode::new(tile_bitmap(i, 255)?.into_shared())
                    .with_margins(MARGIN as f32, MARGIN as f32);
                (Kind::Tile, node)
            };

            let t = i as f32 / count.max(1) as f32;
            sprites.push(Sprite {
                node,
                kind,
                phase: t * std::f32::consts::TAU,
                speed: 0.3 + 0.5 * ((i * 7) % 5) as f32 / 5.0,
                orbit: 0.35 + 0.5 * ((i * 3) % 4) as f32 / 4.0,
            });
        }

        Ok(Self {
            sprites,
            image: image.map(|bmp| DrawNode::new(bmp.into_shared())),
            retired: Vec::new(),
            frame: 0,
        })
    }

    /// Advances to time `t` (seconds) for a backing store of `size` pixels.
    pub fn update(&mut self, t: f32, size: (f32, f32), ratio: f32) {
        self.frame += 1;
        let (w, h) = size;
        let half = w.min(h) / 2.0;

        for sprite in &mut self.sprites {
            let angle = sprite.phase + t * sprite.speed;
            let x = w / 2.0 + angle.cos() * half * sprite.orbit;
            let y = h / 2.0 + angle.sin() * half * sprite.orbit;
            let c = sprite.content_size() / 2.0;

            sprite.node.transform = Affine::translation(x, y)
                .then(Affine::scale(ratio, ratio))
                .then(Affine::rotation(angle))
                .then(Affine::translation(-c, -c));
            sprite.node.alpha = 0.6 + 0.4 * (t + sprite.phase).sin();
        }

        if let Some(image) = self.image.as_mut() {
            let (iw, ih) = {
                let bmp = image.bitmap.borrow();
                (bmp.width().max(1) as f32, bmp.height().max(1) as f32)
            };
            let s = 0.8 * half / iw.max(ih);
            image.transform = Affine::translation(w / 2.0, h / 2.0)
                .then(Affine::rotation(0.1 * (t * 0.5).sin()))
                .then(Affine::scale(s, s))
                .then(Affine::translation(-iw / 2.0, -ih / 2.0));
        }

        self.recompose_tiles();
    }

    /// Simulates a producer re-rasterizing tile bitmaps.
    fn recompose_tiles(&mut self) {
        let tiles: Vec<usize> = (0..self.sprites.len())
            .filter(|&i| self.sprites[i].kind == Kind::Tile)
            .collect();
        if tiles.is_empty() {
            return;
        }

        let cycle = self.frame / RECOMPOSE_EVERY;
        let target = tiles[cycle as usize % tiles.len()];
        let step = self.frame % RECOMPOSE_EVERY;

        for &i in &tiles {
            self.sprites[i].node.composing = i == target && step < COMPOSE_FRAMES;
        }

        if step == COMPOSE_FRAMES {
            let shade = 140 + (cycle % 4) as u8 * 38;
            let rgb = PALETTE[target % PALETTE.len()];
            let mut bmp = self.sprites[target].node.bitmap.borrow_mut();
            let size = bmp.width();
            bmp.pixels_mut().copy_from_slice(&tile(size, MARGIN, rgb, shade));
        }

        if self.frame % REPLACE_EVERY == 0 {
            let i = tiles[(self.frame / REPLACE_EVERY) as usize % tiles.len()];
            if let Ok(fresh) = tile_bitmap(i + 1, 255) {
                let old = std::mem::replace(&mut self.sprites[i].node.bitmap, fresh.into_shared());
                self.retired.push(old.borrow().id());
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DrawNode> {
        self.sprites.iter().map(|s| &s.node)
    }

    /// Node the user image is drawn with, if any.
    pub fn image(&self) -> Option<&DrawNode> {
        self.image.as_ref()
    }

    /// Bitmaps dropped by the scene since the last call.
    pub fn take_retired(&mut self) -> Vec<BitmapId> {
        std::mem::take(&mut self.retired)
    }
}
