//! Planar projective transform (homography) between two quadrilaterals.
//!
//! # Solve
//! With exactly four correspondences (x, y) → (u, v) and h₃₃ fixed to 1, the
//! eight remaining entries satisfy, per point:
//!
//! ```text
//! [x y 1 0 0 0 -u·x -u·y] · h = u
//! [0 0 0 x y 1 -v·x -v·y] · h = v
//! ```
//!
//! The 8×8 system is solved directly (LU); no least squares is needed.
//!
//! ## Apply
//! (x', y', w') = H · (x, y, 1), result (x'/w', y'/w').

use crate::error::{CalibrationError, Result};
use crate::types::PixelPoint;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Smallest |w'| used in the perspective division (points on the horizon line).
const MIN_W: f64 = 1e-12;

/// A 3×3 projective transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Wrap an existing matrix. Fails if the matrix is not invertible.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        let det = matrix.determinant();
        if !det.is_finite() || det.abs() <= f64::EPSILON * matrix.norm().powi(3) {
            return Err(CalibrationError::SingularHomography.into());
        }
        Ok(Self { matrix })
    }

    /// Solve the transform mapping `src[i]` onto `dst[i]` for i in 0..4.
    pub fn from_correspondences(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Result<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y) = (s[0], s[1]);
            let (u, v) = (d[0], d[1]);
            let r = 2 * i;

            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or(CalibrationError::SingularHomography)?;
        if h.iter().any(|v| !v.is_finite()) {
            return Err(CalibrationError::SingularHomography.into());
        }

        Self::from_matrix(Matrix3::new(
            h[0], h[1], h[2], //
            h[3], h[4], h[5], //
            h[6], h[7], 1.0,
        ))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// The reverse transform, normalised so that h₃₃ = 1 where possible.
    pub fn inverse(&self) -> Result<Self> {
        let inv = self
            .matrix
            .try_inverse()
            .ok_or(CalibrationError::SingularHomography)?;
        let scale = inv[(2, 2)];
        let inv = if scale.abs() > MIN_W { inv / scale } else { inv };
        Self::from_matrix(inv)
    }

    /// Apply the transform to a single point, keeping full precision.
    pub fn apply(&self, p: PixelPoint) -> [f64; 2] {
        let q = self.matrix * Vector3::new(p.x, p.y, 1.0);
        let w = if q.z.abs() < MIN_W {
            MIN_W.copysign(q.z)
        } else {
            q.z
        };
        [q.x / w, q.y / w]
    }
}
