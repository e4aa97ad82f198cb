//! Per-node matrix and quad composition.
//!
//! The UV convention here must match the one the bitmap producer used when it
//! rasterized the node: atlas sub-rectangles are addressed in atlas pixels,
//! self-cached bitmaps carry an equal margin on both sides of each axis.

use crate::coords::Affine;
use crate::device::SpriteVertex;

use super::node::Region;

/// Geometry for one sprite draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteQuad {
    /// Node-local pixels to backing-store pixels.
    pub matrix: Affine,
    /// Triangle-strip order: top-left, top-right, bottom-left, bottom-right.
    pub vertices: [SpriteVertex; 4],
}

impl SpriteQuad {
    /// Trimmed content size in pixels.
    pub fn size(&self) -> (f32, f32) {
        let br = self.vertices[3].position;
        (br[0], br[1])
    }
}

/// Builds the view matrix and the four interleaved vertices for a node.
///
/// The margin offset `(2·mx, 2·my)` is applied in the node's local space,
/// before `transform`.
pub fn compose_quad(
    transform: Affine,
    region: Region,
    bitmap_width: u32,
    bitmap_height: u32,
) -> SpriteQuad {
    let bw = bitmap_width.max(1) as f32;
    let bh = bitmap_height.max(1) as f32;

    let (offset, uv_min, uv_max, w, h) = match region {
        Region::Atlas(rect) => (
            Affine::IDENTITY,
            [rect.x / bw, rect.y / bh],
            [rect.right() / bw, rect.bottom() / bh],
            rect.width,
            rect.height,
        ),
        Region::Margins { x, y } => (
            Affine::translation(x * 2.0, y * 2.0),
            [x / bw, y / bh],
            [(bw - x) / bw, (bh - y) / bh],
            bw - x * 2.0,
            bh - y * 2.0,
        ),
    };

    SpriteQuad {
        matrix: offset.prepend(transform),
        vertices: [
            SpriteVertex::new(0.0, 0.0, uv_min[0], uv_min[1]),
            SpriteVertex::new(w, 0.0, uv_max[0], uv_min[1]),
            SpriteVertex::new(0.0, h, uv_min[0], uv_max[1]),
            SpriteVertex::new(w, h, uv_max[0], uv_max[1]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-6 && (a[1] - b[1]).abs() < 1e-6
    }

    // ── atlas ─────────────────────────────────────────────────────────────

    #[test]
    fn atlas_rect_normalizes_by_atlas_size() {
        let region = Region::Atlas(Rect::new(10.0, 20.0, 30.0, 40.0));
        let q = compose_quad(Affine::IDENTITY, region, 100, 100);

        assert!(close(q.vertices[0].uv, [0.10, 0.20]));
        assert!(close(q.vertices[3].uv, [0.40, 0.60]));
        assert_eq!(q.vertices[0].position, [0.0, 0.0]);
        assert_eq!(q.vertices[3].position, [30.0, 40.0]);
        assert_eq!(q.size(), (30.0, 40.0));
    }

    #[test]
    fn atlas_rect_has_no_offset() {
        let node = Affine::translation(5.0, 7.0);
        let q = compose_quad(node, Region::Atlas(Rect::new(10.0, 20.0, 30.0, 40.0)), 100, 100);
        assert_eq!(q.matrix, node);
    }

    // ── strip order ───────────────────────────────────────────────────────

    #[test]
    fn vertices_form_a_triangle_strip() {
        let q = compose_quad(Affine::IDENTITY, Region::Atlas(Rect::new(0.0, 0.0, 8.0, 4.0)), 16, 16);
        let pos: Vec<[f32; 2]> = q.vertices.iter().map(|v| v.position).collect();
        assert_eq!(pos, vec![[0.0, 0.0], [8.0, 0.0], [0.0, 4.0], [8.0, 4.0]]);

        // Shared diagonal 1–2 carries the opposite UV corners.
        assert!(close(q.vertices[1].uv, [0.5, 0.0]));
        assert!(close(q.vertices[2].uv, [0.0, 0.25]));
    }

    // ── margins ───────────────────────────────────────────────────────────

    #[test]
    fn margins_trim_both_sides() {
        let q = compose_quad(Affine::IDENTITY, Region::Margins { x: 2.0, y: 1.0 }, 20, 10);

        assert_eq!(q.size(), (16.0, 8.0));
        assert!(close(q.vertices[0].uv, [0.1, 0.1]));
        assert!(close(q.vertices[3].uv, [0.9, 0.9]));
    }

    #[test]
    fn zero_margins_cover_whole_bitmap() {
        let q = compose_quad(Affine::IDENTITY, Region::default(), 64, 32);
        assert_eq!(q.size(), (64.0, 32.0));
        assert!(close(q.vertices[0].uv, [0.0, 0.0]));
        assert!(close(q.vertices[3].uv, [1.0, 1.0]));
    }

    #[test]
    fn margin_offset_is_applied_before_node_transform() {
        let node = Affine::new(2.0, 0.0, 0.0, 3.0, 100.0, 50.0);
        let q = compose_quad(node, Region::Margins { x: 2.0, y: 1.0 }, 20, 10);

        // Local offset (4, 2) is scaled by the node, then translated.
        assert_eq!(q.matrix.tx, 100.0 + 4.0 * 2.0);
        assert_eq!(q.matrix.ty, 50.0 + 2.0 * 3.0);
        assert_eq!((q.matrix.a, q.matrix.d), (2.0, 3.0));
    }
}
