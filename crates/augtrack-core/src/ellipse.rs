//! Ellipse containment predicate.

use crate::types::Ellipse;

/// Test whether `(x, y)` lies within `ellipse`.
///
/// The ellipse is first derotated around its center by an effective
/// angle of `theta` when `a > b` and `-theta` otherwise, then tested
/// against the axis-aligned quadratic form with `2a`/`2b` as the full
/// axis extents. Points exactly on the boundary are excluded (`< 1.0`,
/// strict). A degenerate ellipse (`a == 0` or `b == 0`) contains no
/// points, since the quadratic form is undefined (division by zero).
pub fn point_in_ellipse(x: f32, y: f32, ellipse: &Ellipse) -> bool {
    if ellipse.a == 0.0 || ellipse.b == 0.0 {
        return false;
    }

    let dx = x - ellipse.cx;
    let dy = y - ellipse.cy;

    // Effective rotation flips sign when the major/minor axes swap roles.
    let beta = if ellipse.a > ellipse.b { ellipse.theta } else { -ellipse.theta };

    // Rotate the offset into the ellipse's own frame. Note the sign flip
    // on the sine term relative to a textbook rotation matrix.
    let cos_t = beta.cos();
    let sin_t = beta.sin();
    let u = dx * cos_t - dy * sin_t;
    let v = -(dx * sin_t + dy * cos_t);

    let value = (u * u) / (4.0 * ellipse.a * ellipse.a) + (v * v) / (4.0 * ellipse.b * ellipse.b);
    value < 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_always_inside() {
        let e = Ellipse::new(10.0, 10.0, 5.0, 3.0, 0.0);
        assert!(point_in_ellipse(10.0, 10.0, &e));
    }

    #[test]
    fn point_on_major_axis_boundary_is_excluded() {
        // The full major-axis extent is 2a; exactly on it is outside (strict `< 1`).
        let e = Ellipse::new(0.0, 0.0, 5.0, 3.0, 0.0);
        assert!(!point_in_ellipse(10.0, 0.0, &e));
    }

    #[test]
    fn point_just_inside_major_axis_is_accepted() {
        let e = Ellipse::new(0.0, 0.0, 5.0, 3.0, 0.0);
        assert!(point_in_ellipse(9.9, 0.0, &e));
    }

    #[test]
    fn point_outside_major_axis_is_rejected() {
        let e = Ellipse::new(0.0, 0.0, 5.0, 3.0, 0.0);
        assert!(!point_in_ellipse(10.1, 0.0, &e));
    }

    #[test]
    fn point_outside_minor_axis_is_rejected() {
        let e = Ellipse::new(0.0, 0.0, 5.0, 3.0, 0.0);
        assert!(!point_in_ellipse(0.0, 6.1, &e));
    }

    #[test]
    fn rotation_moves_the_effective_major_axis() {
        // A wide ellipse (a > b) rotated 90 degrees becomes tall; a point that
        // was outside along x is now outside along the rotated y extent instead.
        let e = Ellipse::new(0.0, 0.0, 5.0, 1.0, std::f32::consts::FRAC_PI_2);
        assert!(point_in_ellipse(0.0, 8.0, &e));
        assert!(!point_in_ellipse(8.0, 0.0, &e));
    }

    #[test]
    fn angle_sign_flips_when_minor_axis_exceeds_major() {
        // With b > a the effective angle negates, so a +90 degree rotation
        // behaves like -90 degrees would for the a > b case above: the
        // point that ends up inside is the one along -y / +x, not +y.
        let e = Ellipse::new(0.0, 0.0, 1.0, 5.0, std::f32::consts::FRAC_PI_2);
        assert!(point_in_ellipse(8.0, 0.0, &e));
        assert!(!point_in_ellipse(0.0, 8.0, &e));
    }

    #[test]
    fn degenerate_ellipse_contains_nothing() {
        let e = Ellipse::new(0.0, 0.0, 0.0, 3.0, 0.0);
        assert!(!point_in_ellipse(0.0, 0.0, &e));
    }
}
