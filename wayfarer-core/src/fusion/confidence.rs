//! Confidence Scoring for Position Estimates
//!
//! ## Overview
//!
//! Every position this crate produces carries a confidence in [0, 1] so
//! consumers can weight, discard, or flag estimates without re-deriving
//! quality themselves. Confidence is derived from different evidence per
//! source:
//!
//! - **Triangulation**: beacon count and residual RMSE (more beacons, lower
//!   error, higher confidence).
//! - **Ranging**: RSSI stability per beacon (a jumpy signal ranges badly).
//! - **Dead reckoning**: decays with every step taken since the last
//!   absolute fix, because PDR error is cumulative.
//!
//! ## Representation
//!
//! Scores are fixed-point u16 (0..=65535 maps to 0.0..=1.0). Construction
//! saturates, so the [0, 1] clamp invariant holds by type: there is no way
//! to hold an out-of-range confidence. Fixed point also keeps comparisons
//! and decay exact and cheap on targets without an FPU.

/// Confidence score in range [0, 1]
///
/// Internally stored as fixed-point for efficiency and determinism.
/// 0.0 = no confidence, 1.0 = full confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceScore {
    /// Fixed-point representation (0-65535 maps to 0.0-1.0)
    value: u16,
}

impl ConfidenceScore {
    /// Minimum meaningful confidence (1%)
    pub const MIN_CONFIDENCE: Self = Self { value: 655 };

    /// Maximum confidence (100%)
    pub const MAX_CONFIDENCE: Self = Self { value: 65535 };

    /// No confidence (0%)
    pub const ZERO: Self = Self { value: 0 };

    /// Moderate confidence (50%)
    pub const MODERATE: Self = Self { value: 32768 };

    /// High confidence threshold (90%)
    pub const HIGH_THRESHOLD: Self = Self { value: 58982 };

    /// Create from floating point value, saturating into [0, 1]
    ///
    /// NaN maps to zero confidence.
    pub fn from_float(confidence: f32) -> Self {
        let clamped = if confidence.is_nan() {
            0.0
        } else {
            confidence.max(0.0).min(1.0)
        };
        Self {
            value: (clamped * 65535.0) as u16,
        }
    }

    /// Convert to floating point [0, 1]
    pub fn as_float(&self) -> f32 {
        self.value as f32 / 65535.0
    }

    /// Get raw fixed-point value
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Check if confidence is above the high threshold
    pub fn is_high(&self) -> bool {
        *self >= Self::HIGH_THRESHOLD
    }

    /// Check if confidence is critically low
    pub fn is_critical(&self) -> bool {
        *self < Self::MIN_CONFIDENCE
    }

    /// Combine multiple confidence scores
    ///
    /// Arithmetic mean with a conservative 61/64 adjustment, approximating
    /// the geometric mean without an nth root. Good to a few percent when
    /// the inputs do not vary wildly, and it always under-reports rather
    /// than over-reports.
    pub fn combine(scores: &[Self]) -> Self {
        if scores.is_empty() {
            return Self::ZERO;
        }

        let sum: u32 = scores.iter().map(|s| s.value as u32).sum();
        let mean_value = (sum / scores.len() as u32) as u16;

        let adjusted = ((mean_value as u32 * 61) / 64) as u16;

        Self { value: adjusted }
    }

    /// Halve the score for every `half_life` units elapsed
    ///
    /// The unit is whatever the caller counts in: the fuser decays PDR
    /// confidence in steps since the last absolute fix. Implemented as a
    /// bit shift, so decay is exact in fixed point.
    pub fn decay(&self, elapsed: u32, half_life: u32) -> Self {
        if elapsed == 0 || half_life == 0 {
            return *self;
        }

        let decay_shifts = (elapsed / half_life).min(16);
        let decayed_value = self.value >> decay_shifts;

        Self { value: decayed_value }
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self::MODERATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trip_saturates() {
        assert_eq!(ConfidenceScore::from_float(0.0), ConfidenceScore::ZERO);
        assert_eq!(ConfidenceScore::from_float(1.0), ConfidenceScore::MAX_CONFIDENCE);
        assert_eq!(ConfidenceScore::from_float(-0.5), ConfidenceScore::ZERO);
        assert_eq!(ConfidenceScore::from_float(3.0), ConfidenceScore::MAX_CONFIDENCE);
        assert_eq!(ConfidenceScore::from_float(f32::NAN), ConfidenceScore::ZERO);

        let half = ConfidenceScore::from_float(0.5);
        assert!((half.as_float() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn ordering_matches_magnitude() {
        let low = ConfidenceScore::from_float(0.2);
        let high = ConfidenceScore::from_float(0.9);

        assert!(low < high);
        assert!(high.is_high());
        assert!(!low.is_high());
        assert!(ConfidenceScore::ZERO.is_critical());
    }

    #[test]
    fn combine_penalizes_slightly() {
        let scores = [
            ConfidenceScore::from_float(0.8),
            ConfidenceScore::from_float(0.8),
        ];
        let combined = ConfidenceScore::combine(&scores);

        // Mean 0.8 scaled by 61/64
        let expected = 0.8 * 61.0 / 64.0;
        assert!((combined.as_float() - expected).abs() < 1e-2);

        assert_eq!(ConfidenceScore::combine(&[]), ConfidenceScore::ZERO);
    }

    #[test]
    fn decay_halves_per_half_life() {
        let full = ConfidenceScore::MAX_CONFIDENCE;

        let one_half_life = full.decay(8, 8);
        assert!((one_half_life.as_float() - 0.5).abs() < 1e-2);

        let two_half_lives = full.decay(16, 8);
        assert!((two_half_lives.as_float() - 0.25).abs() < 1e-2);

        // Below one half life, unchanged
        assert_eq!(full.decay(7, 8), full);
        assert_eq!(full.decay(0, 8), full);
    }
}
