/// Column-major 3×3 matrix as uploaded to `mat3x3<f32>` uniforms.
pub type Mat3 = [f32; 9];

/// 2D affine transform `(a, b, c, d, tx, ty)`.
///
/// Maps a point as:
/// - `x' = a·x + c·y + tx`
/// - `y' = b·x + d·y + ty`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[inline]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    #[inline]
    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Returns `outer ∘ self`: `self` is applied first, then `outer`.
    ///
    /// This is how a node-local offset is placed under the node's cumulative
    /// transform.
    #[inline]
    pub fn prepend(self, outer: Affine) -> Affine {
        Affine {
            a: outer.a * self.a + outer.c * self.b,
            b: outer.b * self.a + outer.d * self.b,
            c: outer.a * self.c + outer.c * self.d,
            d: outer.b * self.c + outer.d * self.d,
            tx: outer.a * self.tx + outer.c * self.ty + outer.tx,
            ty: outer.b * self.tx + outer.d * self.ty + outer.ty,
        }
    }

    /// Returns `self ∘ inner`: `inner` is applied first, then `self`.
    #[inline]
    pub fn then(self, inner: Affine) -> Affine {
        inner.prepend(self)
    }

    #[inline]
    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        [self.a, self.b, self.c, self.d, self.tx, self.ty]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Column-major matrix with the translation in the third column.
    #[inline]
    pub fn to_mat3(self) -> Mat3 {
        [
            self.a, self.b, 0.0,
            self.c, self.d, 0.0,
            self.tx, self.ty, 1.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    // ── prepend ───────────────────────────────────────────────────────────

    #[test]
    fn prepend_applies_self_first() {
        let offset = Affine::translation(10.0, 0.0);
        let node = Affine::scale(2.0, 3.0);

        let m = offset.prepend(node);
        // Offset in local space, then scaled: (1 + 10) * 2.
        assert!(approx(m.apply(1.0, 1.0), (22.0, 3.0)));
    }

    #[test]
    fn prepend_is_not_commutative() {
        let offset = Affine::translation(10.0, 0.0);
        let node = Affine::scale(2.0, 3.0);
        assert_ne!(offset.prepend(node), node.prepend(offset));
    }

    #[test]
    fn prepend_identity_is_noop() {
        let m = Affine::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(m.prepend(Affine::IDENTITY), m);
        assert_eq!(Affine::IDENTITY.prepend(m), m);
    }

    #[test]
    fn then_matches_prepend() {
        let a = Affine::rotation(0.5);
        let b = Affine::translation(3.0, -2.0);
        assert_eq!(a.then(b), b.prepend(a));
    }

    // ── to_mat3 ───────────────────────────────────────────────────────────

    #[test]
    fn to_mat3_is_column_major() {
        let m = Affine::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0).to_mat3();
        assert_eq!(m, [1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 5.0, 6.0, 1.0]);
    }

    #[test]
    fn rotation_quarter_turn() {
        let m = Affine::rotation(std::f32::consts::FRAC_PI_2);
        assert!(approx(m.apply(1.0, 0.0), (0.0, 1.0)));
    }
}
