//! Position Estimate Value Types
//!
//! The output currency of the engine. Every producer (triangulator, dead
//! reckoning, the fused filter) returns a fresh [`UserPosition`]; nothing
//! downstream mutates one in place. Coordinates are meters in the venue
//! frame: x grows east, y grows north, matching the heading convention
//! (0° = north, clockwise positive).
//!
//! There is no error type for "could not produce a position". Degenerate
//! inputs yield the [`UserPosition::invalid`] sentinel (NaN coordinates,
//! zero confidence, worst accuracy) so the record stays self-describing
//! even when it carries no fix.

use crate::fusion::ConfidenceScore;
use crate::time::Timestamp;

/// Origin of a position estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PositionSource {
    /// Beacon triangulation fix
    Ble = 0,
    /// Pedestrian dead reckoning
    Pdr = 1,
    /// Kalman-fused estimate drawing on both
    Fusion = 2,
    /// No usable source (sentinel positions)
    Unknown = 3,
}

impl PositionSource {
    /// Get human-readable source name
    pub const fn name(&self) -> &'static str {
        match self {
            PositionSource::Ble => "ble",
            PositionSource::Pdr => "pdr",
            PositionSource::Fusion => "fusion",
            PositionSource::Unknown => "unknown",
        }
    }
}

/// A 2D position estimate with quality metadata
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserPosition {
    /// East coordinate in meters
    pub x: f32,
    /// North coordinate in meters
    pub y: f32,
    /// Estimated error radius in meters, lower is better
    pub accuracy: f32,
    /// When the estimate was produced, in milliseconds
    pub timestamp: Timestamp,
    /// Which subsystem produced the estimate
    pub source: PositionSource,
    /// Estimate quality in [0, 1]
    pub confidence: ConfidenceScore,
}

impl UserPosition {
    /// Create a position estimate
    pub const fn new(
        x: f32,
        y: f32,
        accuracy: f32,
        timestamp: Timestamp,
        source: PositionSource,
        confidence: ConfidenceScore,
    ) -> Self {
        Self {
            x,
            y,
            accuracy,
            timestamp,
            source,
            confidence,
        }
    }

    /// The no-fix sentinel: NaN coordinates, zero confidence, worst accuracy
    pub const fn invalid(timestamp: Timestamp) -> Self {
        Self {
            x: f32::NAN,
            y: f32::NAN,
            accuracy: f32::MAX,
            timestamp,
            source: PositionSource::Unknown,
            confidence: ConfidenceScore::ZERO,
        }
    }

    /// A position is valid when both coordinates are finite
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another position, in meters
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        libm::sqrtf(dx * dx + dy * dy)
    }

    /// Confidence-weighted average of several estimates
    ///
    /// Invalid entries are skipped so one sentinel cannot NaN-poison the
    /// blend. Coordinates and accuracy are weighted by confidence; the
    /// result confidence combines the contributors; the timestamp is the
    /// newest contributor's. Empty input or zero total weight yields the
    /// invalid sentinel.
    pub fn weighted_mean(positions: &[Self]) -> Self {
        let mut weight_sum = 0.0f32;
        let mut x_sum = 0.0f32;
        let mut y_sum = 0.0f32;
        let mut accuracy_sum = 0.0f32;
        let mut latest: Timestamp = 0;
        let mut scores = [ConfidenceScore::ZERO; 8];
        let mut score_count = 0usize;

        for position in positions.iter().filter(|p| p.is_valid()) {
            let weight = position.confidence.as_float();
            weight_sum += weight;
            x_sum += position.x * weight;
            y_sum += position.y * weight;
            accuracy_sum += position.accuracy * weight;
            if position.timestamp > latest {
                latest = position.timestamp;
            }
            if score_count < scores.len() {
                scores[score_count] = position.confidence;
                score_count += 1;
            }
        }

        if weight_sum <= 0.0 {
            return Self::invalid(latest);
        }

        Self {
            x: x_sum / weight_sum,
            y: y_sum / weight_sum,
            accuracy: accuracy_sum / weight_sum,
            timestamp: latest,
            source: PositionSource::Fusion,
            confidence: ConfidenceScore::combine(&scores[..score_count]),
        }
    }
}
