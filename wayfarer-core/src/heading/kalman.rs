//! Adaptive Scalar Kalman Heading Filter
//!
//! Same inputs and output as the complementary estimator, but the blend
//! weight is a Kalman gain computed from a tracked heading variance, and
//! the noise model retunes itself every call:
//!
//! - total rotation rate picks the per-call gyro noise and the process
//!   noise (fast motion means worse gyro integration),
//! - a smoothed frame-to-frame magnetometer delta tracks magnetic
//!   disturbance and scales the measurement noise (steel shelving and
//!   elevators make the compass lie).
//!
//! Large innovations get their gain halved instead of being rejected
//! outright, so a genuinely wrong heading still recovers, just slowly.
//! Heading is kept in radians internally and reported in degrees.

use crate::sample::{RotationSample, TriAxisSample};
use crate::time::{self, Timestamp};

use super::{
    absolute_reference, normalize_heading, HeadingAccuracy, HeadingEstimate, HeadingSource,
    RAD_TO_DEG,
};

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
const PI: f32 = core::f32::consts::PI;
const TAU: f32 = 2.0 * core::f32::consts::PI;

/// Disturbance EMA retention and blend weights
const DISTURBANCE_RETAIN: f32 = 0.9;
const DISTURBANCE_BLEND: f32 = 0.1;

/// Variance ceilings for the accuracy buckets, rad²
const HIGH_ACCURACY_VARIANCE: f32 = 0.01;
const MEDIUM_ACCURACY_VARIANCE: f32 = 0.1;

/// Per-call gyro integration noise from rotation intensity, rad²
fn gyro_noise(gyro_magnitude: f32) -> f32 {
    if gyro_magnitude < 0.5 {
        0.01
    } else if gyro_magnitude < 1.0 {
        0.015
    } else {
        0.03
    }
}

/// Measurement noise from the smoothed magnetic disturbance, rad²
fn measurement_noise(disturbance: f32) -> f32 {
    if disturbance < 2.0 {
        0.05
    } else if disturbance < 5.0 {
        0.1
    } else {
        0.2
    }
}

/// Process noise from rotation intensity, rad²/s²
fn process_noise(gyro_magnitude: f32) -> f32 {
    if gyro_magnitude < 0.1 {
        0.0005
    } else if gyro_magnitude < 0.3 {
        0.001
    } else if gyro_magnitude < 0.7 {
        0.002
    } else {
        0.005
    }
}

/// Wrap an angle into [-pi, pi]
fn wrap_pi(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Wrap an angle into [0, 2*pi)
fn wrap_tau(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped < 0.0 {
        wrapped += TAU;
    }
    if wrapped >= TAU {
        wrapped = 0.0;
    }
    wrapped
}

/// Tunables for the Kalman heading filter
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KalmanHeadingConfig {
    /// Heading variance before any correction, rad²
    pub initial_variance: f32,
    /// Prediction time-step ceiling in seconds
    pub max_dt_s: f32,
    /// Innovations beyond this get their gain halved, rad
    pub outlier_innovation_rad: f32,
}

impl Default for KalmanHeadingConfig {
    fn default() -> Self {
        Self {
            initial_variance: 1.0,

            // A dropped sensor batch must not integrate as one huge step
            max_dt_s: 0.1,

            // ~29 degrees of disagreement smells like disturbance
            outlier_innovation_rad: 0.5,
        }
    }
}

/// Kalman-filtered heading estimator with adaptive noise
///
/// One instance per sensor stream; calls must arrive in timestamp order.
#[derive(Debug, Clone)]
pub struct KalmanHeadingEstimator {
    config: KalmanHeadingConfig,
    /// Heading state in radians, [0, 2*pi)
    heading_rad: f32,
    /// Last seen rotation rate about z, rad/s
    rate_rad: f32,
    /// Heading variance, rad²
    variance: f32,
    /// Rate variance, carried but never corrected (rate is read straight
    /// off the gyro rather than estimated)
    rate_variance: f32,
    /// Smoothed frame-to-frame magnetometer delta, µT
    disturbance: f32,
    last_timestamp: Option<Timestamp>,
    last_accel: Option<TriAxisSample>,
    last_mag: Option<TriAxisSample>,
}

impl Default for KalmanHeadingEstimator {
    fn default() -> Self {
        Self::new(KalmanHeadingConfig::default())
    }
}

impl KalmanHeadingEstimator {
    /// Create an estimator with the given tuning
    pub fn new(config: KalmanHeadingConfig) -> Self {
        let variance = config.initial_variance;
        Self {
            config,
            heading_rad: 0.0,
            rate_rad: 0.0,
            variance,
            rate_variance: variance,
            disturbance: 0.0,
            last_timestamp: None,
            last_accel: None,
            last_mag: None,
        }
    }

    /// Feed one gyroscope sample plus whatever references arrived with it
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
            if let Some(previous) = self.last_mag {
                let dx = mag.x - previous.x;
                let dy = mag.y - previous.y;
                let dz = mag.z - previous.z;
                let delta = libm::sqrtf(dx * dx + dy * dy + dz * dz);
                self.disturbance =
                    DISTURBANCE_RETAIN * self.disturbance + DISTURBANCE_BLEND * delta;
            }
            self.last_mag = Some(*mag);
        }

        let timestamp = gyro.timestamp_ms();
        let absolute = absolute_reference(rotation, self.last_accel.as_ref(), self.last_mag.as_ref());

        let previous = match self.last_timestamp {
            Some(previous) => previous,
            None => {
                if let Some((reference, _)) = absolute {
                    self.heading_rad = wrap_tau(reference * DEG_TO_RAD);
                }
                self.rate_rad = gyro.z;
                self.last_timestamp = Some(timestamp);
                let source = match absolute {
                    Some((_, source)) => source,
                    None => HeadingSource::Gyroscope,
                };
                return self.estimate(source, timestamp);
            }
        };

        let dt = match time::delta_seconds(previous, timestamp) {
            Some(dt) => dt,
            // Stale clock: echo the current state untouched
            None => return self.estimate(HeadingSource::Gyroscope, timestamp),
        };
        self.last_timestamp = Some(timestamp);
        let dt = if dt > self.config.max_dt_s {
            self.config.max_dt_s
        } else {
            dt
        };

        let gyro_magnitude = gyro.magnitude();

        // Predict
        self.heading_rad = wrap_tau(self.heading_rad + (self.rate_rad + gyro.z) * dt);
        self.rate_rad = gyro.z;
        self.variance += dt * dt * process_noise(gyro_magnitude) + gyro_noise(gyro_magnitude);

        // Correct against the absolute reference when one exists
        let source = match absolute {
            Some((reference, source)) => {
                let innovation = wrap_pi(reference * DEG_TO_RAD - self.heading_rad);
                let noise = measurement_noise(self.disturbance);
                let mut gain = self.variance / (self.variance + noise);
                if libm::fabsf(innovation) > self.config.outlier_innovation_rad {
                    // Disturbance or reference glitch: trust it half as much
                    gain *= 0.5;
                }
                self.heading_rad = wrap_tau(self.heading_rad + gain * innovation);
                self.variance *= 1.0 - gain;
                source
            }
            None => HeadingSource::Gyroscope,
        };

        self.estimate(source, timestamp)
    }

    /// Current heading in degrees, [0, 360)
    pub fn heading_deg(&self) -> f32 {
        normalize_heading(self.heading_rad * RAD_TO_DEG)
    }

    /// Current heading variance in rad²
    pub const fn variance(&self) -> f32 {
        self.variance
    }

    /// Restore the just-constructed state
    pub fn reset(&mut self) {
        self.heading_rad = 0.0;
        self.rate_rad = 0.0;
        self.variance = self.config.initial_variance;
        self.rate_variance = self.config.initial_variance;
        self.disturbance = 0.0;
        self.last_timestamp = None;
        self.last_accel = None;
        self.last_mag = None;
    }

    fn estimate(&self, source: HeadingSource, timestamp: Timestamp) -> HeadingEstimate {
        HeadingEstimate {
            heading_deg: self.heading_deg(),
            source,
            accuracy: self.accuracy(),
            timestamp,
        }
    }

    fn accuracy(&self) -> HeadingAccuracy {
        if self.variance < HIGH_ACCURACY_VARIANCE {
            HeadingAccuracy::High
        } else if self.variance < MEDIUM_ACCURACY_VARIANCE {
            HeadingAccuracy::Medium
        } else {
            HeadingAccuracy::Low
        }
    }
}
