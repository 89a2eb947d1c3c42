//! Heading Estimation
//!
//! Fuses gyroscope integration with absolute heading references into a
//! drift-corrected compass heading in degrees, 0 = north, clockwise
//! positive, always normalized to [0, 360).
//!
//! Two estimators share the same inputs and output type:
//!
//! - [`HeadingEstimator`] blends the integrated gyro heading with the
//!   best available absolute reference through a complementary filter.
//! - [`kalman::KalmanHeadingEstimator`] replaces the fixed blend with a
//!   scalar Kalman filter whose noise model adapts to motion intensity
//!   and magnetic disturbance.
//!
//! Absolute references in falling precedence: rotation-vector quaternion,
//! then the tilt-compensated accelerometer/magnetometer compass, then
//! nothing (pure gyro dead reckoning, which drifts).
//!
//! The device-frame z axis points out of the screen, so a positive gyro
//! z rate is a counter-clockwise turn while heading grows clockwise; the
//! integration flips the sign to compensate.

pub mod kalman;

use crate::sample::{RotationSample, TriAxisSample};
use crate::time::{self, Timestamp};

/// Degrees per radian
const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Minimum horizontal-reference norm for a usable compass solution
///
/// Below this the device is in free fall or sitting on a magnetic pole.
const MIN_HORIZONTAL_NORM: f32 = 0.1;

/// Which reference produced a heading estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeadingSource {
    /// Fused quaternion from the platform rotation-vector sensor
    RotationVector,
    /// Tilt-compensated magnetometer compass
    Magnetometer,
    /// Gyro integration only, no absolute correction this call
    Gyroscope,
}

impl HeadingSource {
    /// Get human-readable source name
    pub const fn name(&self) -> &'static str {
        match self {
            HeadingSource::RotationVector => "rotation-vector",
            HeadingSource::Magnetometer => "magnetometer",
            HeadingSource::Gyroscope => "gyroscope",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HeadingSource {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name())
    }
}

/// Coarse quality bucket for a heading estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeadingAccuracy {
    /// Drifting or just seeded
    Low,
    /// Compass-corrected
    Medium,
    /// Rotation-vector-corrected or converged filter
    High,
}

impl HeadingAccuracy {
    /// Get human-readable accuracy name
    pub const fn name(&self) -> &'static str {
        match self {
            HeadingAccuracy::Low => "low",
            HeadingAccuracy::Medium => "medium",
            HeadingAccuracy::High => "high",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HeadingAccuracy {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name())
    }
}

/// One heading estimate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeadingEstimate {
    /// Heading in degrees, [0, 360), 0 = north, clockwise positive
    pub heading_deg: f32,
    /// Reference that corrected this estimate
    pub source: HeadingSource,
    /// Quality bucket
    pub accuracy: HeadingAccuracy,
    /// Sample time in milliseconds
    pub timestamp: Timestamp,
}

/// Tunables for the complementary-filter estimator
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeadingConfig {
    /// Scale on integrated gyro rotation
    pub gyro_weight: f32,
    /// Complementary blend: the absolute reference contributes
    /// `1 - filter_alpha` of its disagreement per call
    pub filter_alpha: f32,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            gyro_weight: 1.0,

            // 2% correction per call tracks a 50 Hz stream within a
            // second without letting compass noise through
            filter_alpha: 0.98,
        }
    }
}

/// Wrap a heading into [0, 360)
pub fn normalize_heading(degrees: f32) -> f32 {
    let mut wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    // Rounding in the add above can land exactly on 360
    if wrapped >= 360.0 {
        wrapped = 0.0;
    }
    wrapped
}

/// Signed shortest rotation from `from` to `to`, in [-180, 180]
///
/// `from + shortest_angle_diff(from, to)` is congruent to `to` mod 360,
/// so corrections always take the shorter way around the circle.
pub fn shortest_angle_diff(from: f32, to: f32) -> f32 {
    let mut diff = (to - from) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    diff
}

/// Tilt-compensated compass azimuth in degrees, [0, 360)
///
/// Builds the horizontal east axis H = mag x accel and the horizontal
/// north axis M = accel x H, then reads the azimuth out of the implied
/// rotation matrix. Returns None when the horizontal reference collapses
/// (free fall, or the field is vertical).
fn compass_azimuth(accel: &TriAxisSample, mag: &TriAxisSample) -> Option<f32> {
    let hx = mag.y * accel.z - mag.z * accel.y;
    let hy = mag.z * accel.x - mag.x * accel.z;
    let hz = mag.x * accel.y - mag.y * accel.x;

    let norm_h = libm::sqrtf(hx * hx + hy * hy + hz * hz);
    if norm_h < MIN_HORIZONTAL_NORM {
        return None;
    }
    let inv_h = 1.0 / norm_h;
    let hy = hy * inv_h;
    let hx = hx * inv_h;
    let hz = hz * inv_h;

    let inv_a = 1.0 / accel.magnitude();
    let ax = accel.x * inv_a;
    let az = accel.z * inv_a;

    // Only the y components of H and M appear in the azimuth
    let my = az * hx - ax * hz;

    Some(normalize_heading(libm::atan2f(hy, my) * RAD_TO_DEG))
}

/// Azimuth of a rotation-vector quaternion in degrees, [0, 360)
fn quaternion_azimuth(rotation: &RotationSample) -> f32 {
    let azimuth = libm::atan2f(
        2.0 * (rotation.x * rotation.y - rotation.w * rotation.z),
        1.0 - 2.0 * (rotation.x * rotation.x + rotation.z * rotation.z),
    );
    normalize_heading(azimuth * RAD_TO_DEG)
}

/// Best absolute heading reference available, rotation-vector first
fn absolute_reference(
    rotation: Option<&RotationSample>,
    accel: Option<&TriAxisSample>,
    mag: Option<&TriAxisSample>,
) -> Option<(f32, HeadingSource)> {
    if let Some(rotation) = rotation {
        return Some((quaternion_azimuth(rotation), HeadingSource::RotationVector));
    }
    match (accel, mag) {
        (Some(accel), Some(mag)) => {
            compass_azimuth(accel, mag).map(|h| (h, HeadingSource::Magnetometer))
        }
        _ => None,
    }
}

/// Complementary-filter heading estimator
///
/// One instance per sensor stream; calls must arrive in timestamp order.
/// The latest accelerometer and magnetometer samples are cached so the
/// compass keeps working when the two streams tick on different cadences.
#[derive(Debug, Clone)]
pub struct HeadingEstimator {
    config: HeadingConfig,
    heading_deg: f32,
    last_timestamp: Option<Timestamp>,
    last_accel: Option<TriAxisSample>,
    last_mag: Option<TriAxisSample>,
}

impl Default for HeadingEstimator {
    fn default() -> Self {
        Self::new(HeadingConfig::default())
    }
}

impl HeadingEstimator {
    /// Create an estimator with the given tuning
    pub const fn new(config: HeadingConfig) -> Self {
        Self {
            config,
            heading_deg: 0.0,
            last_timestamp: None,
            last_accel: None,
            last_mag: None,
        }
    }

    /// Feed one gyroscope sample plus whatever references arrived with it
    ///
    /// The gyroscope sample carries the clock. The first call seeds the
    /// heading from the best absolute reference (or 0 when none exists)
    /// and reports low accuracy; later calls integrate rotation and blend
    /// in the reference.
    pub fn update(
        &mut self,
        gyro: &TriAxisSample,
        accel: Option<&TriAxisSample>,
        mag: Option<&TriAxisSample>,
        rotation: Option<&RotationSample>,
    ) -> HeadingEstimate {
        if let Some(accel) = accel {
            self.last_accel = Some(*accel);
        }
        if let Some(mag) = mag {
            self.last_mag = Some(*mag);
        }
        let timestamp = gyro.timestamp_ms();
        let absolute = self.absolute_heading(rotation);

        let previous = match self.last_timestamp {
            Some(previous) => previous,
            None => {
                let (seed, source) = absolute.unwrap_or((0.0, HeadingSource::Gyroscope));
                self.heading_deg = normalize_heading(seed);
                self.last_timestamp = Some(timestamp);
                return HeadingEstimate {
                    heading_deg: self.heading_deg,
                    source,
                    accuracy: HeadingAccuracy::Low,
                    timestamp,
                };
            }
        };

        let dt = match time::delta_seconds(previous, timestamp) {
            Some(dt) => dt,
            // Stale clock: echo the current heading untouched
            None => {
                return HeadingEstimate {
                    heading_deg: self.heading_deg,
                    source: HeadingSource::Gyroscope,
                    accuracy: HeadingAccuracy::Low,
                    timestamp,
                }
            }
        };
        self.last_timestamp = Some(timestamp);

        // Positive z rate is counter-clockwise, heading grows clockwise
        self.heading_deg = normalize_heading(
            self.heading_deg + -gyro.z * dt * RAD_TO_DEG * self.config.gyro_weight,
        );

        let (source, accuracy) = match absolute {
            Some((reference, source)) => {
                let correction = shortest_angle_diff(self.heading_deg, reference)
                    * (1.0 - self.config.filter_alpha);
                self.heading_deg = normalize_heading(self.heading_deg + correction);
                let accuracy = match source {
                    HeadingSource::RotationVector => HeadingAccuracy::High,
                    HeadingSource::Magnetometer => HeadingAccuracy::Medium,
                    HeadingSource::Gyroscope => HeadingAccuracy::Low,
                };
                (source, accuracy)
            }
            None => (HeadingSource::Gyroscope, HeadingAccuracy::Low),
        };

        HeadingEstimate {
            heading_deg: self.heading_deg,
            source,
            accuracy,
            timestamp,
        }
    }

    /// Current heading in degrees, [0, 360)
    pub const fn heading_deg(&self) -> f32 {
        self.heading_deg
    }

    /// Clear heading and cached samples
    pub fn reset(&mut self) {
        self.heading_deg = 0.0;
        self.last_timestamp = None;
        self.last_accel = None;
        self.last_mag = None;
    }

    /// Best absolute reference available right now
    fn absolute_heading(&self, rotation: Option<&RotationSample>) -> Option<(f32, HeadingSource)> {
        absolute_reference(rotation, self.last_accel.as_ref(), self.last_mag.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gyro_z(rate: f32, ms: u64) -> TriAxisSample {
        TriAxisSample::new(0.0, 0.0, rate, ms * 1_000_000)
    }

    /// Device flat on a table, top edge pointing north
    fn flat_north() -> (TriAxisSample, TriAxisSample) {
        let accel = TriAxisSample::new(0.0, 0.0, 9.8, 0);
        let mag = TriAxisSample::new(0.0, 20.0, -40.0, 0);
        (accel, mag)
    }

    #[test]
    fn first_call_seeds_from_rotation_vector() {
        let mut estimator = HeadingEstimator::default();
        let identity = RotationSample::new(0.0, 0.0, 0.0, 1.0, 0);

        let estimate = estimator.update(&gyro_z(0.0, 0), None, None, Some(&identity));

        assert_eq!(estimate.heading_deg, 0.0);
        assert_eq!(estimate.source, HeadingSource::RotationVector);
        assert_eq!(estimate.accuracy, HeadingAccuracy::Low);
    }

    #[test]
    fn gyro_integration_is_clockwise_positive() {
        let mut estimator = HeadingEstimator::default();
        estimator.update(&gyro_z(0.0, 0), None, None, None);

        // -pi/2 rad/s about z for one second is a 90 degree clockwise turn
        let estimate = estimator.update(
            &gyro_z(-core::f32::consts::FRAC_PI_2, 1000),
            None,
            None,
            None,
        );

        assert!((estimate.heading_deg - 90.0).abs() < 0.1);
        assert_eq!(estimate.source, HeadingSource::Gyroscope);
        assert_eq!(estimate.accuracy, HeadingAccuracy::Low);
    }

    #[test]
    fn compass_blend_corrects_drift() {
        let mut estimator = HeadingEstimator::default();
        let (accel, mag) = flat_north();

        estimator.update(&gyro_z(0.0, 0), None, None, None);
        // Drift the integrated heading to ~90 with no reference
        estimator.update(&gyro_z(-core::f32::consts::FRAC_PI_2, 1000), None, None, None);

        // Compass says north; each call should claw part of the error back
        let mut last = 90.0;
        for i in 0..50u64 {
            let estimate = estimator.update(
                &gyro_z(0.0, 1100 + i * 100),
                Some(&accel),
                Some(&mag),
                None,
            );
            assert_eq!(estimate.source, HeadingSource::Magnetometer);
            assert_eq!(estimate.accuracy, HeadingAccuracy::Medium);
            assert!(estimate.heading_deg < last + 1e-3);
            last = estimate.heading_deg;
        }
        assert!(last < 40.0, "heading still {} after 50 corrections", last);
    }

    #[test]
    fn rotation_vector_outranks_compass() {
        let mut estimator = HeadingEstimator::default();
        let (accel, mag) = flat_north();
        let identity = RotationSample::new(0.0, 0.0, 0.0, 1.0, 0);

        estimator.update(&gyro_z(0.0, 0), None, None, None);
        let estimate = estimator.update(
            &gyro_z(0.0, 100),
            Some(&accel),
            Some(&mag),
            Some(&identity),
        );

        assert_eq!(estimate.source, HeadingSource::RotationVector);
        assert_eq!(estimate.accuracy, HeadingAccuracy::High);
    }

    #[test]
    fn free_fall_disables_the_compass() {
        let mut estimator = HeadingEstimator::default();
        let falling = TriAxisSample::new(0.0, 0.0, 0.0, 0);
        let mag = TriAxisSample::new(0.0, 20.0, -40.0, 0);

        let estimate = estimator.update(&gyro_z(0.0, 0), Some(&falling), Some(&mag), None);

        assert_eq!(estimate.source, HeadingSource::Gyroscope);
        assert_eq!(estimate.heading_deg, 0.0);
    }

    #[test]
    fn stale_timestamp_echoes_heading() {
        let mut estimator = HeadingEstimator::default();
        estimator.update(&gyro_z(0.0, 0), None, None, None);
        estimator.update(&gyro_z(-1.0, 1000), None, None, None);
        let before = estimator.heading_deg();

        let estimate = estimator.update(&gyro_z(5.0, 1000), None, None, None);

        assert_eq!(estimate.heading_deg, before);
        assert_eq!(estimator.heading_deg(), before);
    }

    #[test]
    fn flat_device_compass_reads_north() {
        let (accel, mag) = flat_north();
        let azimuth = compass_azimuth(&accel, &mag).unwrap();
        assert!(azimuth < 0.5 || azimuth > 359.5, "azimuth = {}", azimuth);
    }

    #[test]
    fn shortest_diff_takes_the_short_way() {
        assert_eq!(shortest_angle_diff(350.0, 10.0), 20.0);
        assert_eq!(shortest_angle_diff(10.0, 350.0), -20.0);
        assert_eq!(shortest_angle_diff(0.0, 0.0), 0.0);
        assert_eq!(shortest_angle_diff(90.0, 90.0), 0.0);

        let diff = shortest_angle_diff(0.0, 180.0);
        assert!(diff.abs() <= 180.0);
        assert_eq!(normalize_heading(0.0 + diff), 180.0);
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(725.0), 5.0);
        let tiny_negative = normalize_heading(-1e-6);
        assert!((0.0..360.0).contains(&tiny_negative));
    }
}
