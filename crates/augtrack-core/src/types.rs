//! Core data model: keypoints, ellipses, and the affine transform.

/// Dimensionality of a keypoint descriptor (fixed by the external feature detector).
pub const DESCRIPTOR_DIM: usize = 128;

/// An image feature produced by the external feature detector.
///
/// `radius` and `angle` are carried through for interface parity with the
/// detector's output but are never read by the tracker itself.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub angle: f32,
    pub descriptor: [f32; DESCRIPTOR_DIM],
}

impl Keypoint {
    pub fn new(x: f32, y: f32, descriptor: [f32; DESCRIPTOR_DIM]) -> Self {
        Self { x, y, radius: 0.0, angle: 0.0, descriptor }
    }
}

/// An oriented ellipse, used only at registration to delimit a patch.
#[derive(Debug, Clone, Copy)]
pub struct Ellipse {
    pub cx: f32,
    pub cy: f32,
    /// Semi-major axis. Invariant: `a >= 0`.
    pub a: f32,
    /// Semi-minor axis. Invariant: `b >= 0`.
    pub b: f32,
    /// Rotation angle in radians.
    pub theta: f32,
}

impl Ellipse {
    pub fn new(cx: f32, cy: f32, a: f32, b: f32, theta: f32) -> Self {
        debug_assert!(a >= 0.0 && b >= 0.0, "ellipse axes must be non-negative");
        Self { cx, cy, a, b, theta }
    }
}

/// A 3x3 affine transform acting on homogeneous 2-D points.
///
/// The bottom row is always `[0, 0, 1]`; `m` is stored row-major as
/// `[[m00, m01, tx], [m10, m11, ty], [0, 0, 1]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub m00: f32,
    pub m01: f32,
    pub tx: f32,
    pub m10: f32,
    pub m11: f32,
    pub ty: f32,
}

impl AffineTransform {
    /// The degenerate all-zero transform assigned at registration time.
    pub const ZERO: AffineTransform = AffineTransform { m00: 0.0, m01: 0.0, tx: 0.0, m10: 0.0, m11: 0.0, ty: 0.0 };

    pub const IDENTITY: AffineTransform = AffineTransform { m00: 1.0, m01: 0.0, tx: 0.0, m10: 0.0, m11: 1.0, ty: 0.0 };

    /// Build from the six-parameter vector `[m00, m01, m10, m11, tx, ty]`
    /// produced by the affine solver.
    pub fn from_solution(t: &[f32; 6]) -> Self {
        Self { m00: t[0], m01: t[1], m10: t[2], m11: t[3], tx: t[4], ty: t[5] }
    }

    /// Apply this transform to a homogeneous point `(x, y, 1)`.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.m00 * x + self.m01 * y + self.tx, self.m10 * x + self.m11 * y + self.ty)
    }

    fn as_matrix3(&self) -> nalgebra::Matrix3<f32> {
        nalgebra::Matrix3::new(
            self.m00, self.m01, self.tx,
            self.m10, self.m11, self.ty,
            0.0, 0.0, 1.0,
        )
    }

    /// Moore-Penrose pseudoinverse of the full 3x3 matrix.
    ///
    /// For an invertible transform this coincides with the ordinary
    /// inverse. For the zero matrix (the value assigned at
    /// registration, see [`crate::augmentation::Augmentation::create`])
    /// it again yields the zero matrix.
    pub fn pseudo_inverse(&self) -> AffineTransform {
        let m = self.as_matrix3();
        let inv = m.pseudo_inverse(1e-6).unwrap_or(nalgebra::Matrix3::zeros());
        AffineTransform {
            m00: inv[(0, 0)], m01: inv[(0, 1)], tx: inv[(0, 2)],
            m10: inv[(1, 0)], m11: inv[(1, 1)], ty: inv[(1, 2)],
        }
    }

    /// Skew magnitude used by update validation: `|m01 + m10|`.
    pub fn skew(&self) -> f32 {
        (self.m01 + self.m10).abs()
    }

    /// Scale-ratio magnitude used by update validation: `|m00 - m11|`.
    pub fn scale_ratio(&self) -> f32 {
        (self.m00 - self.m11).abs()
    }

    /// Column-major 4x4 lift of the affine matrix, z held identity, as
    /// returned by `get_transformation`.
    pub fn to_column_major_4x4(&self) -> [f32; 16] {
        [
            self.m00, self.m10, 0.0, 0.0,
            self.m01, self.m11, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            self.tx, self.ty, 0.0, 1.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pseudo_inverse_is_identity() {
        let t = AffineTransform::IDENTITY;
        let inv = t.pseudo_inverse();
        assert!((inv.m00 - 1.0).abs() < 1e-6);
        assert!((inv.m11 - 1.0).abs() < 1e-6);
        assert!(inv.m01.abs() < 1e-6 && inv.m10.abs() < 1e-6);
        assert!(inv.tx.abs() < 1e-6 && inv.ty.abs() < 1e-6);
    }

    #[test]
    fn zero_pseudo_inverse_is_zero() {
        let t = AffineTransform::ZERO;
        let inv = t.pseudo_inverse();
        assert_eq!(inv, AffineTransform::ZERO);
    }

    #[test]
    fn apply_then_pseudo_inverse_roundtrips_for_translation() {
        let t = AffineTransform { m00: 1.0, m01: 0.0, tx: 30.0, m10: 0.0, m11: 1.0, ty: -15.0 };
        let (x, y) = t.apply(10.0, 10.0);
        let inv = t.pseudo_inverse();
        let (ox, oy) = inv.apply(x, y);
        assert!((ox - 10.0).abs() < 1e-3);
        assert!((oy - 10.0).abs() < 1e-3);
    }

    #[test]
    fn column_major_layout_places_translation_in_the_last_row() {
        let t = AffineTransform { m00: 1.0, m01: 0.0, tx: 30.0, m10: 0.0, m11: 1.0, ty: -15.0 };
        let expected = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            30.0, -15.0, 0.0, 1.0,
        ];
        let got = t.to_column_major_4x4();
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-3, "got {got:?}, expected {expected:?}");
        }
    }
}
