//! Position Fuser
//!
//! The composition point of the engine: steps from the detector (scaled
//! by stride length and projected along the current heading) and absolute
//! beacon fixes both land here and feed one constant-velocity Kalman
//! filter, which carries the single tracked position.
//!
//! Until the first absolute fix arrives the fuser dead-reckons from the
//! origin without touching the filter; the first fix then anchors the
//! filter and the blind offset is discarded. From there every step is
//! fed as a displaced position observation whose confidence decays with
//! the number of steps walked since the last anchor, so a long unanchored
//! stretch pulls the filter less and less.

use crate::fusion::confidence::ConfidenceScore;
use crate::fusion::kalman::PositionKalmanFilter;
use crate::position::{PositionSource, UserPosition};
use crate::time::Timestamp;

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Tunables for PDR/BLE fusion
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuserConfig {
    /// Displacement per detected step, meters
    pub stride_length_m: f32,
    /// Observation uncertainty of one step, meters
    pub pdr_uncertainty_m: f32,
    /// Steps per halving of PDR confidence while unanchored
    pub pdr_decay_half_life_steps: u32,
}

impl Default for FuserConfig {
    fn default() -> Self {
        Self {
            // Average adult indoor stride
            stride_length_m: 0.7,

            // Stride variance plus heading error over one step
            pdr_uncertainty_m: 1.5,

            pdr_decay_half_life_steps: 8,
        }
    }
}

/// Fuses step displacement and absolute fixes into one tracked position
///
/// One instance per tracked entity; calls must arrive in timestamp order.
#[derive(Debug, Clone)]
pub struct PositionFuser {
    config: FuserConfig,
    filter: PositionKalmanFilter,
    /// Origin-anchored dead-reckoning position used before the first fix
    pdr_x: f32,
    pdr_y: f32,
    /// Steps walked since the last absolute fix
    steps_since_fix: u32,
    /// Whether any step has ever contributed
    stepped: bool,
    /// Whether any absolute fix has ever contributed
    fixed: bool,
    last_step_confidence: Option<ConfidenceScore>,
    last_fix_confidence: Option<ConfidenceScore>,
}

impl Default for PositionFuser {
    fn default() -> Self {
        Self::new(FuserConfig::default())
    }
}

impl PositionFuser {
    /// Create a fuser with the given tuning
    pub fn new(config: FuserConfig) -> Self {
        Self {
            config,
            filter: PositionKalmanFilter::new(),
            pdr_x: 0.0,
            pdr_y: 0.0,
            steps_since_fix: 0,
            stepped: false,
            fixed: false,
            last_step_confidence: None,
            last_fix_confidence: None,
        }
    }

    /// Fold one detected step, walked at `heading_deg`, into the estimate
    pub fn apply_step(&mut self, heading_deg: f32, timestamp: Timestamp) {
        let theta = heading_deg * DEG_TO_RAD;
        let dx = self.config.stride_length_m * libm::sinf(theta);
        let dy = self.config.stride_length_m * libm::cosf(theta);

        self.steps_since_fix = self.steps_since_fix.saturating_add(1);
        self.stepped = true;
        let confidence = ConfidenceScore::MODERATE.decay(
            self.steps_since_fix,
            self.config.pdr_decay_half_life_steps,
        );
        self.last_step_confidence = Some(confidence);

        if !self.filter.is_initialized() {
            // Blind dead reckoning until something anchors us
            self.pdr_x += dx;
            self.pdr_y += dy;
            return;
        }

        self.filter.predict(timestamp);
        let (x, y) = self.filter.position();
        if self
            .filter
            .update(
                x + dx,
                y + dy,
                self.config.pdr_uncertainty_m,
                confidence.as_float(),
                timestamp,
            )
            .is_err()
        {
            log_warn!("step observation rejected: singular innovation covariance");
        }
    }

    /// Fold an absolute position fix into the estimate
    ///
    /// The first valid fix anchors the filter and discards any blind
    /// dead-reckoning offset. Invalid sentinels are ignored.
    pub fn apply_fix(&mut self, position: &UserPosition, timestamp: Timestamp) {
        if !position.is_valid() {
            return;
        }

        if self.filter.is_initialized() {
            self.filter.predict(timestamp);
            if self
                .filter
                .update(
                    position.x,
                    position.y,
                    position.accuracy,
                    position.confidence.as_float(),
                    timestamp,
                )
                .is_err()
            {
                log_warn!("fix rejected: singular innovation covariance");
            }
        } else {
            self.filter
                .initialize(position.x, position.y, position.accuracy, timestamp);
        }

        self.fixed = true;
        self.steps_since_fix = 0;
        self.last_fix_confidence = Some(position.confidence);
    }

    /// Current fused position, predicted ahead to `timestamp`
    pub fn estimate(&mut self, timestamp: Timestamp) -> UserPosition {
        if !self.filter.is_initialized() {
            if !self.stepped {
                return UserPosition::invalid(timestamp);
            }
            return UserPosition::new(
                self.pdr_x,
                self.pdr_y,
                self.config.pdr_uncertainty_m,
                timestamp,
                PositionSource::Pdr,
                self.combined_confidence(),
            );
        }

        self.filter.predict(timestamp);
        let (x, y) = self.filter.position();
        let source = if self.stepped && self.fixed {
            PositionSource::Fusion
        } else if self.fixed {
            PositionSource::Ble
        } else {
            PositionSource::Pdr
        };

        UserPosition::new(
            x,
            y,
            self.filter.position_uncertainty(),
            timestamp,
            source,
            self.combined_confidence(),
        )
    }

    /// Speed over ground of the tracked entity, meters per second
    pub fn speed(&self) -> f32 {
        self.filter.speed()
    }

    /// Clear the filter anchor and all accumulators
    pub fn reset(&mut self) {
        self.filter.reset();
        self.pdr_x = 0.0;
        self.pdr_y = 0.0;
        self.steps_since_fix = 0;
        self.stepped = false;
        self.fixed = false;
        self.last_step_confidence = None;
        self.last_fix_confidence = None;
    }

    /// Combine the most recent step and fix confidences
    fn combined_confidence(&self) -> ConfidenceScore {
        let mut scores = [ConfidenceScore::ZERO; 2];
        let mut count = 0;
        if let Some(step) = self.last_step_confidence {
            scores[count] = step;
            count += 1;
        }
        if let Some(fix) = self.last_fix_confidence {
            scores[count] = fix;
            count += 1;
        }
        ConfidenceScore::combine(&scores[..count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(x: f32, y: f32, accuracy: f32, timestamp: Timestamp) -> UserPosition {
        UserPosition::new(
            x,
            y,
            accuracy,
            timestamp,
            PositionSource::Ble,
            ConfidenceScore::from_float(0.9),
        )
    }

    #[test]
    fn no_input_means_no_position() {
        let mut fuser = PositionFuser::default();
        assert!(!fuser.estimate(0).is_valid());
    }

    #[test]
    fn blind_steps_walk_from_the_origin() {
        let mut fuser = PositionFuser::default();

        // Two steps due north
        fuser.apply_step(0.0, 500);
        fuser.apply_step(0.0, 1000);
        let estimate = fuser.estimate(1000);

        assert!(estimate.is_valid());
        assert_eq!(estimate.source, PositionSource::Pdr);
        assert!(estimate.x.abs() < 1e-4);
        assert!((estimate.y - 1.4).abs() < 1e-4);
    }

    #[test]
    fn first_fix_anchors_and_discards_blind_offset() {
        let mut fuser = PositionFuser::default();
        fuser.apply_step(0.0, 500);
        fuser.apply_step(0.0, 1000);

        fuser.apply_fix(&fix(10.0, 10.0, 1.0, 1500), 1500);
        let estimate = fuser.estimate(1500);

        assert!((estimate.x - 10.0).abs() < 1e-4);
        assert!((estimate.y - 10.0).abs() < 1e-4);
        assert_eq!(estimate.source, PositionSource::Fusion);
    }

    #[test]
    fn anchored_steps_pull_eastward() {
        let mut fuser = PositionFuser::default();
        fuser.apply_fix(&fix(0.0, 0.0, 1.0, 0), 0);

        for i in 1..=10u64 {
            fuser.apply_step(90.0, i * 500);
        }
        let estimate = fuser.estimate(5000);

        assert!(estimate.x > 0.5, "x = {}", estimate.x);
        assert!(estimate.y.abs() < 0.2, "y = {}", estimate.y);
        assert_eq!(estimate.source, PositionSource::Fusion);
    }

    #[test]
    fn fix_restores_step_trust() {
        let mut fuser = PositionFuser::default();
        fuser.apply_fix(&fix(0.0, 0.0, 1.0, 0), 0);

        // Far past the half life: step confidence is well decayed
        for i in 1..=20u64 {
            fuser.apply_step(0.0, i * 500);
        }
        assert_eq!(fuser.steps_since_fix, 20);
        let decayed = fuser.last_step_confidence.unwrap();
        assert!(decayed < ConfidenceScore::MODERATE);

        fuser.apply_fix(&fix(0.0, 14.0, 1.0, 11_000), 11_000);
        assert_eq!(fuser.steps_since_fix, 0);

        fuser.apply_step(0.0, 11_500);
        assert!(fuser.last_step_confidence.unwrap() > decayed);
    }

    #[test]
    fn invalid_fix_is_ignored() {
        let mut fuser = PositionFuser::default();
        fuser.apply_fix(&UserPosition::invalid(100), 100);

        assert!(!fuser.estimate(100).is_valid());
        assert!(!fuser.fixed);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut fuser = PositionFuser::default();
        fuser.apply_fix(&fix(3.0, 4.0, 1.0, 0), 0);
        fuser.apply_step(45.0, 500);

        fuser.reset();
        assert!(!fuser.estimate(1000).is_valid());
        let after_once = fuser.clone();

        fuser.reset();
        assert_eq!(fuser.pdr_x, after_once.pdr_x);
        assert_eq!(fuser.steps_since_fix, after_once.steps_since_fix);
        assert_eq!(fuser.stepped, after_once.stepped);
        assert_eq!(fuser.fixed, after_once.fixed);
        assert!(!fuser.estimate(2000).is_valid());
    }
}
