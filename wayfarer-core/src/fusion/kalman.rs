//! Constant-Velocity Position Filter
//!
//! Four-state linear Kalman filter over [x, y, vx, vy]. Position fixes
//! arrive irregularly (beacon solves, dead-reckoned steps), so prediction
//! is driven by wall-clock deltas rather than a fixed tick. Measurement
//! noise is inflated by the fix confidence: a shaky fix is allowed to pull
//! the state far less than a clean one with the same nominal accuracy.
//!
//! The innovation covariance is only 2x2 (position is observed directly,
//! velocity never is), so the update stays cheap enough for per-step use
//! on embedded targets.

use crate::fusion::matrix::{self, SquareMatrix, Vector};
use crate::fusion::{FusionError, FusionResult};
use crate::signal;
use crate::time::{self, Timestamp};

/// Process noise variance per second, one entry per state component
const PROCESS_NOISE_DIAGONAL: [f32; 4] = [0.01, 0.01, 0.1, 0.1];

/// Initial variance on the unobserved velocity components
const INITIAL_VELOCITY_VARIANCE: f32 = 1.0;

/// Confidence floor when inflating measurement noise
///
/// Keeps a near-zero confidence from blowing the noise up to infinity.
const MIN_MEASUREMENT_CONFIDENCE: f32 = 0.1;

/// Kalman filter tracking 2D position and velocity
#[derive(Debug, Clone)]
pub struct PositionKalmanFilter {
    /// State vector [x, y, vx, vy] in meters and meters per second
    state: Vector<4>,
    /// State covariance
    covariance: SquareMatrix<4>,
    /// Time of the last prediction or initialization, in milliseconds
    last_timestamp: Timestamp,
    /// Whether the filter has been seeded with a first fix
    initialized: bool,
}

impl Default for PositionKalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionKalmanFilter {
    /// Create an uninitialized filter
    pub const fn new() -> Self {
        Self {
            state: [0.0; 4],
            covariance: [[0.0; 4]; 4],
            last_timestamp: 0,
            initialized: false,
        }
    }

    /// Seed the filter from a first position fix
    ///
    /// Velocity starts at zero with unit variance; position variance comes
    /// from the fix accuracy.
    pub fn initialize(&mut self, x: f32, y: f32, accuracy: f32, timestamp: Timestamp) {
        self.state = [x, y, 0.0, 0.0];
        self.covariance = [[0.0; 4]; 4];
        self.covariance[0][0] = accuracy * accuracy;
        self.covariance[1][1] = accuracy * accuracy;
        self.covariance[2][2] = INITIAL_VELOCITY_VARIANCE;
        self.covariance[3][3] = INITIAL_VELOCITY_VARIANCE;
        self.last_timestamp = timestamp;
        self.initialized = true;
    }

    /// Roll the state forward to `timestamp` under the constant-velocity model
    ///
    /// A no-op before initialization or when the timestamp does not advance.
    pub fn predict(&mut self, timestamp: Timestamp) {
        if !self.initialized {
            return;
        }
        let dt = match time::delta_seconds(self.last_timestamp, timestamp) {
            Some(dt) => dt,
            None => return,
        };

        let mut transition: SquareMatrix<4> = [[0.0; 4]; 4];
        for i in 0..4 {
            transition[i][i] = 1.0;
        }
        transition[0][2] = dt;
        transition[1][3] = dt;

        self.state[0] += self.state[2] * dt;
        self.state[1] += self.state[3] * dt;

        // P = F P F^T + Q dt
        let mut fp: SquareMatrix<4> = [[0.0; 4]; 4];
        matrix::multiply(&transition, &self.covariance, &mut fp);
        let mut ft: SquareMatrix<4> = [[0.0; 4]; 4];
        matrix::transpose(&transition, &mut ft);
        matrix::multiply(&fp, &ft, &mut self.covariance);
        for i in 0..4 {
            self.covariance[i][i] += PROCESS_NOISE_DIAGONAL[i] * dt;
        }
        matrix::make_symmetric(&mut self.covariance);

        self.last_timestamp = timestamp;
    }

    /// Fold a position measurement into the state
    ///
    /// Predicts forward to `timestamp` first, then corrects.
    /// `measurement_uncertainty` is the fix accuracy in meters and
    /// `confidence` its quality in [0, 1]; the effective noise is
    /// (uncertainty / confidence) squared, with confidence clamped away
    /// from zero. The first measurement seeds the filter instead of
    /// correcting it.
    ///
    /// On a singular innovation covariance the state is left at the
    /// prediction and an error is returned.
    pub fn update(
        &mut self,
        x: f32,
        y: f32,
        measurement_uncertainty: f32,
        confidence: f32,
        timestamp: Timestamp,
    ) -> FusionResult<()> {
        if !(x.is_finite() && y.is_finite() && measurement_uncertainty.is_finite()) {
            return Err(FusionError::NumericalInstability);
        }
        if !self.initialized {
            self.initialize(x, y, measurement_uncertainty, timestamp);
            return Ok(());
        }
        self.predict(timestamp);

        let clamped = signal::clamp(confidence, MIN_MEASUREMENT_CONFIDENCE, 1.0);
        let sigma = measurement_uncertainty / clamped;
        let r = sigma * sigma;

        // S = H P H^T + R, with H observing position only
        let p_block: SquareMatrix<2> = [
            [self.covariance[0][0], self.covariance[0][1]],
            [self.covariance[1][0], self.covariance[1][1]],
        ];
        let noise: SquareMatrix<2> = [[r, 0.0], [0.0, r]];
        let mut innovation_cov: SquareMatrix<2> = [[0.0; 2]; 2];
        matrix::add(&p_block, &noise, &mut innovation_cov);

        let mut s_inv: SquareMatrix<2> = [[0.0; 2]; 2];
        if !matrix::invert_2x2(&innovation_cov, &mut s_inv) {
            return Err(FusionError::SingularMatrix);
        }

        // K = P H^T S^-1; P H^T is the left 4x2 block of P
        let mut pht: matrix::Matrix<4, 2> = [[0.0; 2]; 4];
        for i in 0..4 {
            pht[i][0] = self.covariance[i][0];
            pht[i][1] = self.covariance[i][1];
        }
        let mut gain: matrix::Matrix<4, 2> = [[0.0; 2]; 4];
        matrix::multiply(&pht, &s_inv, &mut gain);

        let innovation = [x - self.state[0], y - self.state[1]];
        let mut correction: Vector<4> = [0.0; 4];
        matrix::matvec(&gain, &innovation, &mut correction);
        for i in 0..4 {
            self.state[i] += correction[i];
        }

        // P = (I - K H) P
        let mut i_minus_kh: SquareMatrix<4> = [[0.0; 4]; 4];
        for i in 0..4 {
            i_minus_kh[i][i] = 1.0;
            i_minus_kh[i][0] -= gain[i][0];
            i_minus_kh[i][1] -= gain[i][1];
        }
        let mut updated: SquareMatrix<4> = [[0.0; 4]; 4];
        matrix::multiply(&i_minus_kh, &self.covariance, &mut updated);
        self.covariance = updated;
        matrix::make_symmetric(&mut self.covariance);

        Ok(())
    }

    /// Current position estimate (x, y) in meters
    pub fn position(&self) -> (f32, f32) {
        (self.state[0], self.state[1])
    }

    /// Current velocity estimate (vx, vy) in meters per second
    pub fn velocity(&self) -> (f32, f32) {
        (self.state[2], self.state[3])
    }

    /// Speed over ground in meters per second
    pub fn speed(&self) -> f32 {
        libm::sqrtf(self.state[2] * self.state[2] + self.state[3] * self.state[3])
    }

    /// RMS position uncertainty in meters
    pub fn position_uncertainty(&self) -> f32 {
        libm::sqrtf((self.covariance[0][0] + self.covariance[1][1]) * 0.5)
    }

    /// Whether the filter has been seeded
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drop the seed so the next measurement re-initializes
    ///
    /// State and covariance are left in place; they are overwritten
    /// wholesale on the next [`initialize`](Self::initialize).
    pub fn reset(&mut self) {
        self.initialized = false;
    }
}
