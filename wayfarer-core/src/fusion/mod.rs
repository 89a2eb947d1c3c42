//! Position Fusion for Indoor Tracking
//!
//! ## Overview
//!
//! This module combines the relative and absolute position evidence the
//! rest of the crate produces. Pedestrian dead reckoning gives smooth,
//! drift-prone displacement; beacon triangulation gives jumpy, drift-free
//! fixes. Neither is usable alone:
//!
//! ```text
//! Steps + heading ──┐
//!                   ├─→ PositionKalmanFilter ─→ tracked (x, y) + uncertainty
//! BLE fixes ────────┘
//! ```
//!
//! The Kalman filter is the workhorse. For the constant-velocity model used
//! here:
//!
//! ```text
//! State Prediction:    x̂ₖ = F·xₖ₋₁
//! Covariance Update:   Pₖ = F·Pₖ₋₁·Fᵀ + Q·dt
//! Innovation:          yₖ = zₖ - H·x̂ₖ
//! Kalman Gain:         Kₖ = Pₖ·Hᵀ·(H·Pₖ·Hᵀ + R)⁻¹
//! State Update:        xₖ = x̂ₖ + Kₖ·yₖ
//! ```
//!
//! ## Failure Policy
//!
//! Degenerate numerics never panic and never poison state. A singular
//! innovation covariance aborts that update and keeps the prediction; the
//! caller sees the prior best estimate. The typed errors below exist for
//! the internal seams and for logging, not for control flow at the public
//! surface.
//!
//! ## Memory Model
//!
//! All linear algebra works on fixed-size stack arrays through the
//! [`matrix`] helpers. The state is 4-dimensional and every measurement
//! space is 2-dimensional, so the closed-form 2×2 inverse replaces general
//! elimination.

pub mod confidence;
pub mod fuser;
pub mod kalman;

pub use confidence::ConfidenceScore;
pub use fuser::{FuserConfig, PositionFuser};
pub use kalman::PositionKalmanFilter;

use thiserror_no_std::Error;

/// Result type for fusion operations
pub type FusionResult<T> = Result<T, FusionError>;

/// Errors on the internal fusion seams
///
/// Public entry points translate these into policy (sentinel positions,
/// kept predictions) rather than returning them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionError {
    /// Matrix inversion failed (near-singular or NaN determinant)
    #[error("Singular matrix in fusion update")]
    SingularMatrix,

    /// A computation produced values unusable for further iteration
    #[error("Numerical instability detected")]
    NumericalInstability,

    /// Not enough usable beacons for a position solve
    #[error("Insufficient beacons: need {required}, have {available}")]
    InsufficientBeacons {
        /// Minimum usable beacons for a 2D solve
        required: usize,
        /// Usable beacons actually supplied
        available: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for FusionError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::SingularMatrix =>
                defmt::write!(fmt, "Singular matrix in fusion update"),
            Self::NumericalInstability =>
                defmt::write!(fmt, "Numerical instability detected"),
            Self::InsufficientBeacons { required, available } =>
                defmt::write!(fmt, "Insufficient beacons: need {}, have {}", required, available),
        }
    }
}

/// Matrix operations for the fusion filters
///
/// Basic linear algebra over fixed-size arrays, no heap allocation. Sized
/// for this crate's needs: 4-state filters and 2D measurement spaces.
pub mod matrix {
    /// Matrix type using const generics
    pub type Matrix<const R: usize, const C: usize> = [[f32; C]; R];

    /// Square matrix type
    pub type SquareMatrix<const N: usize> = Matrix<N, N>;

    /// Vector type
    pub type Vector<const N: usize> = [f32; N];

    /// Determinants below this abort an inversion as singular
    ///
    /// Shared by the innovation covariance and the triangulation normal
    /// equations; collinear beacon geometry lands here.
    pub const MIN_DETERMINANT: f32 = 1e-6;

    /// Matrix multiplication: result = A × B
    ///
    /// Dimensions: A[R×K] × B[K×C] = result[R×C]
    pub fn multiply<const R: usize, const K: usize, const C: usize>(
        a: &Matrix<R, K>,
        b: &Matrix<K, C>,
        result: &mut Matrix<R, C>,
    ) {
        for i in 0..R {
            for j in 0..C {
                result[i][j] = 0.0;
                for k in 0..K {
                    result[i][j] += a[i][k] * b[k][j];
                }
            }
        }
    }

    /// Matrix transpose: result = Aᵀ
    pub fn transpose<const R: usize, const C: usize>(
        a: &Matrix<R, C>,
        result: &mut Matrix<C, R>,
    ) {
        for i in 0..R {
            for j in 0..C {
                result[j][i] = a[i][j];
            }
        }
    }

    /// Matrix addition: result = A + B
    pub fn add<const R: usize, const C: usize>(
        a: &Matrix<R, C>,
        b: &Matrix<R, C>,
        result: &mut Matrix<R, C>,
    ) {
        for i in 0..R {
            for j in 0..C {
                result[i][j] = a[i][j] + b[i][j];
            }
        }
    }

    /// Matrix-vector multiplication: result = A × x
    pub fn matvec<const R: usize, const C: usize>(
        matrix: &Matrix<R, C>,
        vector: &Vector<C>,
        result: &mut Vector<R>,
    ) {
        for i in 0..R {
            result[i] = 0.0;
            for j in 0..C {
                result[i] += matrix[i][j] * vector[j];
            }
        }
    }

    /// Make matrix symmetric: A = (A + Aᵀ) / 2
    ///
    /// Covariance propagation accumulates asymmetry in f32; re-symmetrizing
    /// keeps the matrix positive semi-definite in practice.
    pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>) {
        for i in 0..N {
            for j in i + 1..N {
                let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
                matrix[i][j] = avg;
                matrix[j][i] = avg;
            }
        }
    }

    /// Closed-form 2×2 inversion
    ///
    /// Returns false without touching `result` when the determinant is NaN
    /// or below [`MIN_DETERMINANT`]. Callers abort their update and keep
    /// the prior estimate.
    pub fn invert_2x2(a: &SquareMatrix<2>, result: &mut SquareMatrix<2>) -> bool {
        let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];

        // Written so NaN fails the comparison too
        if !(det >= MIN_DETERMINANT) {
            return false;
        }

        let inv_det = 1.0 / det;
        result[0][0] = a[1][1] * inv_det;
        result[0][1] = -a[0][1] * inv_det;
        result[1][0] = -a[1][0] * inv_det;
        result[1][1] = a[0][0] * inv_det;
        true
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn multiply_identity() {
            let a: Matrix<2, 2> = [[1.0, 2.0], [3.0, 4.0]];
            let identity: Matrix<2, 2> = [[1.0, 0.0], [0.0, 1.0]];
            let mut result = [[0.0; 2]; 2];

            multiply(&a, &identity, &mut result);
            assert_eq!(result, a);
        }

        #[test]
        fn transpose_rectangular() {
            let a: Matrix<2, 3> = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
            let mut result = [[0.0; 2]; 3];

            transpose(&a, &mut result);
            assert_eq!(result, [[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
        }

        #[test]
        fn symmetrize_averages_off_diagonal() {
            let mut a: SquareMatrix<2> = [[1.0, 2.0], [4.0, 1.0]];
            make_symmetric(&mut a);
            assert_eq!(a, [[1.0, 3.0], [3.0, 1.0]]);
        }

        #[test]
        fn invert_2x2_round_trip() {
            let a: SquareMatrix<2> = [[4.0, 1.0], [2.0, 3.0]];
            let mut inv = [[0.0; 2]; 2];
            assert!(invert_2x2(&a, &mut inv));

            let mut product = [[0.0; 2]; 2];
            multiply(&a, &inv, &mut product);

            for i in 0..2 {
                for j in 0..2 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((product[i][j] - expected).abs() < 1e-6);
                }
            }
        }

        #[test]
        fn invert_2x2_rejects_singular() {
            // Rows are linearly dependent
            let a: SquareMatrix<2> = [[1.0, 2.0], [2.0, 4.0]];
            let mut inv = [[7.0; 2]; 2];

            assert!(!invert_2x2(&a, &mut inv));
            // Output untouched on failure
            assert_eq!(inv, [[7.0; 2]; 2]);
        }

        #[test]
        fn invert_2x2_rejects_nan() {
            let a: SquareMatrix<2> = [[f32::NAN, 0.0], [0.0, 1.0]];
            let mut inv = [[0.0; 2]; 2];
            assert!(!invert_2x2(&a, &mut inv));
        }

        #[test]
        fn matvec_applies_rows() {
            let a: Matrix<2, 3> = [[1.0, 0.0, 2.0], [0.0, 1.0, -1.0]];
            let x: Vector<3> = [3.0, 4.0, 5.0];
            let mut y = [0.0; 2];

            matvec(&a, &x, &mut y);
            assert_eq!(y, [13.0, -1.0]);
        }
    }
}
