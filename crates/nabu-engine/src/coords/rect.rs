/// Axis-aligned rectangle in bitmap pixels (top-left origin).
///
/// Used for atlas sub-rectangles: `x`/`y` locate the sub-image inside the
/// atlas bitmap, `width`/`height` are its trimmed content size.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Whether the rect lies entirely within a `width` × `height` bitmap.
    #[inline]
    pub fn fits_within(self, width: f32, height: f32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── edges ─────────────────────────────────────────────────────────────

    #[test]
    fn right_and_bottom_are_exclusive_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
    }

    // ── is_empty ──────────────────────────────────────────────────────────

    #[test]
    fn is_empty_zero_size() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(Rect::new(0.0, 0.0, 5.0, 0.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }

    // ── fits_within ───────────────────────────────────────────────────────

    #[test]
    fn fits_within_touching_edges() {
        assert!(Rect::new(70.0, 60.0, 30.0, 40.0).fits_within(100.0, 100.0));
    }

    #[test]
    fn fits_within_overhang() {
        assert!(!Rect::new(80.0, 0.0, 30.0, 10.0).fits_within(100.0, 100.0));
        assert!(!Rect::new(-1.0, 0.0, 10.0, 10.0).fits_within(100.0, 100.0));
    }
}
