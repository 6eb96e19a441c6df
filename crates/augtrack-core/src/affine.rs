//! Affine model fit from matched keypoint pairs.

use nalgebra::DMatrix;

use crate::error::AugmentError;
use crate::types::AffineTransform;

/// Default minimum number of matched pairs required to attempt a fit.
pub const MIN_MATCHES: usize = 5;

/// A single correspondence between a reference-space point and its
/// observed counterpart in the current frame.
#[derive(Debug, Clone, Copy)]
pub struct Correspondence {
    pub ref_x: f32,
    pub ref_y: f32,
    pub obs_x: f32,
    pub obs_y: f32,
}

/// Solve the 6-DOF affine least-squares system `A t = b` via the
/// Moore-Penrose pseudoinverse, where `t = [m00, m01, m10, m11, tx, ty]`
/// and each correspondence contributes the row pair
/// `[x, y, 0, 0, 1, 0] -> obs_x` and `[0, 0, x, y, 0, 1] -> obs_y`.
///
/// Returns [`AugmentError::InsufficientMatches`] below `min_matches`
/// correspondences, rather than attempting a fit on a sparse system.
pub fn solve_affine(matches: &[Correspondence], min_matches: usize) -> Result<AffineTransform, AugmentError> {
    if matches.len() < min_matches {
        return Err(AugmentError::InsufficientMatches);
    }

    let rows = matches.len() * 2;
    let mut a = DMatrix::<f32>::zeros(rows, 6);
    let mut b = DMatrix::<f32>::zeros(rows, 1);

    for (i, m) in matches.iter().enumerate() {
        let r0 = 2 * i;
        let r1 = 2 * i + 1;
        a[(r0, 0)] = m.ref_x;
        a[(r0, 1)] = m.ref_y;
        a[(r0, 4)] = 1.0;
        b[(r0, 0)] = m.obs_x;

        a[(r1, 2)] = m.ref_x;
        a[(r1, 3)] = m.ref_y;
        a[(r1, 5)] = 1.0;
        b[(r1, 0)] = m.obs_y;
    }

    let pinv = a.pseudo_inverse(1e-6).map_err(|_| AugmentError::InsufficientMatches)?;
    let t = pinv * b;

    let solution: [f32; 6] = [t[(0, 0)], t[(1, 0)], t[(2, 0)], t[(3, 0)], t[(4, 0)], t[(5, 0)]];
    Ok(AffineTransform::from_solution(&solution))
}
