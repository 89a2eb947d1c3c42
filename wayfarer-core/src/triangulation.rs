//! Gauss-Newton Beacon Triangulation
//!
//! Converts a point-in-time list of ranged beacons into a 2D fix by
//! minimizing the squared range residuals. Each iteration linearizes the
//! distances around the current estimate, solves the 2x2 normal equations
//! and steps toward the least-squares position:
//!
//! ```text
//!   residual_i = |estimate - beacon_i| - measured_distance_i
//!   J_i        = (dx_i / dist_i, dy_i / dist_i)
//!   delta      = (J^T J)^-1 J^T r        estimate -= delta
//! ```
//!
//! The solve is seeded at the beacon centroid and stops after at most
//! ten iterations or once the step falls under the convergence
//! threshold. Degenerate geometry (collinear beacons, an estimate
//! sitting on a beacon) makes the normal equations singular; iteration
//! stops there and the current estimate is scored as-is, so the caller
//! still gets a fix with an honestly bad confidence.
//!
//! Fewer than three fresh beacons cannot fix a 2D position at all and
//! yield the invalid sentinel.

use crate::fusion::matrix::{self, SquareMatrix, Vector};
use crate::fusion::{ConfidenceScore, FusionError, FusionResult};
use crate::position::{PositionSource, UserPosition};
use crate::ranging::Beacon;
use crate::time::Timestamp;

/// Minimum fresh beacons for a 2D fix
pub const MIN_BEACONS: usize = 3;

/// Beacon count at which the count term of confidence saturates
const FULL_CONFIDENCE_BEACONS: f32 = 6.0;

/// RMSE at which the error term of confidence reaches zero, meters
const WORST_ACCEPTED_RMSE: f32 = 10.0;

/// Estimates closer than this to a beacon contribute no Jacobian row
const MIN_JACOBIAN_DISTANCE: f32 = 0.1;

/// Tunables for the Gauss-Newton solve
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangulationConfig {
    /// Iteration ceiling
    pub max_iterations: usize,
    /// Step size below which the solve is converged, meters
    pub convergence_threshold_m: f32,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            convergence_threshold_m: 0.1,
        }
    }
}

/// Least-squares position solver over ranged beacons
///
/// Holds configuration only; every call is independent, so one instance
/// can serve any number of beacon snapshots.
#[derive(Debug, Clone, Default)]
pub struct BeaconTriangulator {
    config: TriangulationConfig,
}

impl BeaconTriangulator {
    /// Create a solver with the given tuning
    pub const fn new(config: TriangulationConfig) -> Self {
        Self { config }
    }

    /// Solve the beacon snapshot into a position estimate
    ///
    /// Stale beacons are skipped. Fewer than three fresh beacons, or a
    /// snapshot whose geometry defeats the seed entirely, yields
    /// [`UserPosition::invalid`].
    pub fn triangulate(&self, beacons: &[Beacon], timestamp: Timestamp) -> UserPosition {
        match self.solve(beacons, timestamp) {
            Ok(position) => position,
            Err(_) => {
                log_warn!("triangulation needs at least {} fresh beacons", MIN_BEACONS);
                UserPosition::invalid(timestamp)
            }
        }
    }

    /// Typed variant of [`triangulate`](Self::triangulate)
    fn solve(&self, beacons: &[Beacon], timestamp: Timestamp) -> FusionResult<UserPosition> {
        let fresh = || beacons.iter().filter(|b| !b.stale);
        let count = fresh().count();
        if count < MIN_BEACONS {
            return Err(FusionError::InsufficientBeacons {
                required: MIN_BEACONS,
                available: count,
            });
        }

        // Seed at the centroid
        let mut x = 0.0f32;
        let mut y = 0.0f32;
        for beacon in fresh() {
            x += beacon.x;
            y += beacon.y;
        }
        x /= count as f32;
        y /= count as f32;

        for _ in 0..self.config.max_iterations {
            match gauss_newton_step(fresh(), x, y) {
                Ok(delta) => {
                    x -= delta[0];
                    y -= delta[1];
                    let step = libm::sqrtf(delta[0] * delta[0] + delta[1] * delta[1]);
                    if step <= self.config.convergence_threshold_m {
                        break;
                    }
                }
                Err(_) => {
                    // Collinear beacons or an estimate on top of one;
                    // score whatever we have
                    log_warn!("triangulation stopped on degenerate geometry");
                    break;
                }
            }
        }

        let rmse = residual_rmse(fresh(), x, y, count);
        let count_term = if count as f32 / FULL_CONFIDENCE_BEACONS < 1.0 {
            count as f32 / FULL_CONFIDENCE_BEACONS
        } else {
            1.0
        };
        let error_ratio = if rmse / WORST_ACCEPTED_RMSE < 1.0 {
            rmse / WORST_ACCEPTED_RMSE
        } else {
            1.0
        };
        let error_term = if 1.0 - error_ratio > 0.0 {
            1.0 - error_ratio
        } else {
            0.0
        };

        Ok(UserPosition::new(
            x,
            y,
            rmse,
            timestamp,
            PositionSource::Ble,
            ConfidenceScore::from_float(count_term * error_term),
        ))
    }
}

/// One linearized least-squares step; Err on singular normal equations
fn gauss_newton_step<'a>(
    beacons: impl Iterator<Item = &'a Beacon>,
    x: f32,
    y: f32,
) -> FusionResult<Vector<2>> {
    let mut jtj: SquareMatrix<2> = [[0.0; 2]; 2];
    let mut jtr: Vector<2> = [0.0; 2];

    for beacon in beacons {
        let dx = x - beacon.x;
        let dy = y - beacon.y;
        let dist = libm::sqrtf(dx * dx + dy * dy);
        if dist <= MIN_JACOBIAN_DISTANCE {
            // The unit vector is undefined this close; skip the row
            continue;
        }
        let residual = dist - beacon.estimated_distance;
        let jx = dx / dist;
        let jy = dy / dist;

        jtj[0][0] += jx * jx;
        jtj[0][1] += jx * jy;
        jtj[1][0] += jy * jx;
        jtj[1][1] += jy * jy;
        jtr[0] += jx * residual;
        jtr[1] += jy * residual;
    }

    let mut inverse: SquareMatrix<2> = [[0.0; 2]; 2];
    if !matrix::invert_2x2(&jtj, &mut inverse) {
        return Err(FusionError::SingularMatrix);
    }

    let mut delta: Vector<2> = [0.0; 2];
    matrix::matvec(&inverse, &jtr, &mut delta);
    Ok(delta)
}

/// Root-mean-square range residual at (x, y)
fn residual_rmse<'a>(beacons: impl Iterator<Item = &'a Beacon>, x: f32, y: f32, count: usize) -> f32 {
    let mut sum_squared = 0.0f32;
    for beacon in beacons {
        let dx = x - beacon.x;
        let dy = y - beacon.y;
        let residual = libm::sqrtf(dx * dx + dy * dy) - beacon.estimated_distance;
        sum_squared += residual * residual;
    }
    libm::sqrtf(sum_squared / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::BeaconAddress;

    fn beacon(id: u8, x: f32, y: f32, distance: f32) -> Beacon {
        let address: BeaconAddress = [0xB0, 0, 0, 0, 0, id];
        Beacon::from_ranging(address, x, y, distance, ConfidenceScore::MODERATE, 0)
    }

    #[test]
    fn three_clean_ranges_pin_the_position() {
        let solver = BeaconTriangulator::default();
        // True position (3, 4)
        let beacons = [
            beacon(1, 0.0, 0.0, 5.0),
            beacon(2, 10.0, 0.0, 8.0623),
            beacon(3, 0.0, 10.0, 6.7082),
        ];

        let fix = solver.triangulate(&beacons, 1234);

        assert!(fix.is_valid());
        assert!((fix.x - 3.0).abs() < 0.1, "x = {}", fix.x);
        assert!((fix.y - 4.0).abs() < 0.1, "y = {}", fix.y);
        assert!(fix.accuracy < 0.1, "rmse = {}", fix.accuracy);
        assert_eq!(fix.source, PositionSource::Ble);
        assert_eq!(fix.timestamp, 1234);
        // Three of six beacons, near-zero residual
        let confidence = fix.confidence.as_float();
        assert!((0.4..=0.55).contains(&confidence), "confidence = {}", confidence);
    }

    #[test]
    fn two_beacons_cannot_fix() {
        let solver = BeaconTriangulator::default();
        let beacons = [beacon(1, 0.0, 0.0, 5.0), beacon(2, 10.0, 0.0, 7.28)];

        let fix = solver.triangulate(&beacons, 99);

        assert!(!fix.is_valid());
        assert!(fix.x.is_nan() && fix.y.is_nan());
        assert_eq!(fix.accuracy, f32::MAX);
        assert_eq!(fix.confidence, ConfidenceScore::ZERO);
        assert_eq!(fix.source, PositionSource::Unknown);
        assert_eq!(fix.timestamp, 99);
    }

    #[test]
    fn stale_beacons_are_not_counted() {
        let solver = BeaconTriangulator::default();
        let mut third = beacon(3, 0.0, 10.0, 6.7082);
        third.stale = true;
        let beacons = [
            beacon(1, 0.0, 0.0, 5.0),
            beacon(2, 10.0, 0.0, 8.0623),
            third,
        ];

        assert!(!solver.triangulate(&beacons, 0).is_valid());
    }

    #[test]
    fn insufficient_count_is_typed_internally() {
        let solver = BeaconTriangulator::default();
        let beacons = [beacon(1, 0.0, 0.0, 5.0)];

        let result = solver.solve(&beacons, 0);

        assert_eq!(
            result,
            Err(FusionError::InsufficientBeacons {
                required: 3,
                available: 1,
            })
        );
    }

    #[test]
    fn collinear_geometry_keeps_a_low_confidence_fix() {
        let solver = BeaconTriangulator::default();
        // All on the x axis; ranged from a point 3 m off the line
        let beacons = [
            beacon(1, 0.0, 0.0, 5.831),
            beacon(2, 5.0, 0.0, 3.0),
            beacon(3, 10.0, 0.0, 5.831),
        ];

        let fix = solver.triangulate(&beacons, 0);

        // The singular solve leaves the centroid-seeded estimate standing
        assert!(fix.is_valid());
        assert!(fix.accuracy > 1.0, "rmse = {}", fix.accuracy);
        assert!(
            fix.confidence.as_float() < 0.45,
            "confidence = {}",
            fix.confidence.as_float()
        );
    }

    #[test]
    fn more_beacons_raise_confidence() {
        let solver = BeaconTriangulator::default();
        // True position (2, 2)
        let beacons = [
            beacon(1, 0.0, 0.0, 2.828427),
            beacon(2, 10.0, 0.0, 8.246211),
            beacon(3, 0.0, 10.0, 8.246211),
            beacon(4, 10.0, 10.0, 11.313708),
            beacon(5, 5.0, 0.0, 3.605551),
            beacon(6, 0.0, 5.0, 3.605551),
        ];

        let fix = solver.triangulate(&beacons, 0);

        assert!((fix.x - 2.0).abs() < 0.1);
        assert!((fix.y - 2.0).abs() < 0.1);
        assert!(fix.confidence.as_float() > 0.9, "confidence = {}", fix.confidence.as_float());
    }
}
