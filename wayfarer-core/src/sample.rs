//! Sensor sample types delivered by the host platform
//!
//! One sample is created per hardware callback and consumed by exactly one
//! detector or estimator call. Samples are plain value types: the platform
//! glue that registers listeners and schedules delivery lives outside this
//! crate, so nothing here knows about sensor managers or wakeups.
//!
//! Timestamps arrive in nanoseconds (the resolution hardware event APIs
//! report) and are converted to milliseconds at this boundary via
//! [`TriAxisSample::timestamp_ms`]. Axis values are expected to be
//! unit-consistent already: m/s² for accelerometer, rad/s for gyroscope,
//! µT for magnetometer, unit-quaternion components for rotation vector.

use crate::time::{millis_from_nanos, Timestamp};

/// A single 3-axis sensor reading with its raw hardware timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriAxisSample {
    /// X axis value in sensor units
    pub x: f32,
    /// Y axis value in sensor units
    pub y: f32,
    /// Z axis value in sensor units
    pub z: f32,
    /// Event timestamp in nanoseconds, monotonic per stream
    pub timestamp_ns: u64,
}

impl TriAxisSample {
    /// Create a sample from axis values and a nanosecond timestamp
    pub const fn new(x: f32, y: f32, z: f32, timestamp_ns: u64) -> Self {
        Self { x, y, z, timestamp_ns }
    }

    /// 3-axis Euclidean magnitude `sqrt(x² + y² + z²)`
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    /// Event timestamp converted to milliseconds
    pub const fn timestamp_ms(&self) -> Timestamp {
        millis_from_nanos(self.timestamp_ns)
    }
}

/// Rotation-vector reading: the device orientation as a unit quaternion
///
/// Components follow the hardware rotation-vector convention: (x, y, z) is
/// the rotation axis scaled by sin(θ/2), w is cos(θ/2).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotationSample {
    /// Quaternion x component
    pub x: f32,
    /// Quaternion y component
    pub y: f32,
    /// Quaternion z component
    pub z: f32,
    /// Quaternion w (scalar) component
    pub w: f32,
    /// Event timestamp in nanoseconds, monotonic per stream
    pub timestamp_ns: u64,
}

impl RotationSample {
    /// Create a rotation sample from quaternion components and a timestamp
    pub const fn new(x: f32, y: f32, z: f32, w: f32, timestamp_ns: u64) -> Self {
        Self { x, y, z, w, timestamp_ns }
    }

    /// Event timestamp converted to milliseconds
    pub const fn timestamp_ms(&self) -> Timestamp {
        millis_from_nanos(self.timestamp_ns)
    }
}

/// One sensor event as delivered by the platform
///
/// The enum is the hand-off type at the host boundary; the detectors
/// themselves take the payload structs so optional inputs are ordinary
/// `Option<&TriAxisSample>` parameters at each call site.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorSample {
    /// Accelerometer reading in m/s², gravity included
    Accelerometer(TriAxisSample),
    /// Gyroscope reading in rad/s, device frame
    Gyroscope(TriAxisSample),
    /// Magnetometer reading in µT, device frame
    Magnetometer(TriAxisSample),
    /// Rotation-vector reading (unit quaternion)
    RotationVector(RotationSample),
}

impl SensorSample {
    /// Get human-readable sensor name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorSample::Accelerometer(_) => "accelerometer",
            SensorSample::Gyroscope(_) => "gyroscope",
            SensorSample::Magnetometer(_) => "magnetometer",
            SensorSample::RotationVector(_) => "rotation_vector",
        }
    }

    /// Get expected unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            SensorSample::Accelerometer(_) => "m/s²",
            SensorSample::Gyroscope(_) => "rad/s",
            SensorSample::Magnetometer(_) => "µT",
            SensorSample::RotationVector(_) => "",
        }
    }

    /// Raw event timestamp in nanoseconds
    pub const fn timestamp_ns(&self) -> u64 {
        match self {
            SensorSample::Accelerometer(s)
            | SensorSample::Gyroscope(s)
            | SensorSample::Magnetometer(s) => s.timestamp_ns,
            SensorSample::RotationVector(r) => r.timestamp_ns,
        }
    }

    /// Event timestamp converted to milliseconds
    pub const fn timestamp_ms(&self) -> Timestamp {
        millis_from_nanos(self.timestamp_ns())
    }

    /// Borrow the 3-axis payload, if this is a tri-axis sensor
    pub const fn tri_axis(&self) -> Option<&TriAxisSample> {
        match self {
            SensorSample::Accelerometer(s)
            | SensorSample::Gyroscope(s)
            | SensorSample::Magnetometer(s) => Some(s),
            SensorSample::RotationVector(_) => None,
        }
    }

    /// Borrow the rotation-vector payload, if present
    pub const fn rotation(&self) -> Option<&RotationSample> {
        match self {
            SensorSample::RotationVector(r) => Some(r),
            _ => None,
        }
    }
}
