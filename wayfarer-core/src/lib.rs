//! Core positioning engine for Wayfarer
//!
//! Fuses step detection, heading estimation and BLE beacon ranging into
//! a tracked indoor position. Designed to run on the device that carries
//! the sensors.
//!
//! Key constraints:
//! - No allocation: fixed-capacity buffers and tables throughout
//! - One synchronous call per sensor sample, no internal threading
//! - Degenerate numerics degrade to sentinels instead of panicking
//!
//! ```no_run
//! use wayfarer_core::{HeadingEstimator, PositionFuser, StepDetector, TriAxisSample};
//!
//! let mut steps = StepDetector::default();
//! let mut heading = HeadingEstimator::default();
//! let mut fuser = PositionFuser::default();
//!
//! // One sensor batch: accelerometer plus gyroscope
//! let accel = TriAxisSample::new(0.1, 0.2, 9.9, 20_000_000);
//! let gyro = TriAxisSample::new(0.0, 0.0, 0.1, 20_000_000);
//!
//! let estimate = heading.update(&gyro, Some(&accel), None, None);
//! let output = steps.process(&accel, Some(&gyro));
//! if output.step_detected {
//!     fuser.apply_step(estimate.heading_deg, output.timestamp);
//! }
//! let position = fuser.estimate(output.timestamp);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macro for optional logging
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod buffer;
pub mod errors;
pub mod fusion;
pub mod heading;
pub mod position;
pub mod ranging;
pub mod sample;
pub mod signal;
pub mod step;
pub mod time;
pub mod triangulation;

// Public API
pub use errors::{RangingError, RangingResult};
pub use fusion::{
    ConfidenceScore, FusionError, FusionResult, FuserConfig, PositionFuser, PositionKalmanFilter,
};
pub use heading::kalman::{KalmanHeadingConfig, KalmanHeadingEstimator};
pub use heading::{
    HeadingAccuracy, HeadingConfig, HeadingEstimate, HeadingEstimator, HeadingSource,
};
pub use position::{PositionSource, UserPosition};
pub use ranging::{Beacon, BeaconAddress, BeaconRegistry, RangingConfig};
pub use sample::{RotationSample, SensorSample, TriAxisSample};
pub use step::{StepConfig, StepDetector, StepOutput, StepPhase};
pub use triangulation::{BeaconTriangulator, TriangulationConfig};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
