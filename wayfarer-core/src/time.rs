//! Timestamp handling for sensor and beacon streams
//!
//! The engine works in milliseconds throughout. Hardware sensor callbacks
//! deliver nanosecond timestamps; those are converted once at the sample
//! boundary and everything downstream stays in ms.
//!
//! All components share one ordering policy: a delta that is zero or
//! negative never advances state. `delta_seconds` encodes that policy so
//! each integrator treats out-of-order input identically.

/// Timestamp in milliseconds since an arbitrary monotonic origin (device boot)
pub type Timestamp = u64;

/// Nanoseconds per millisecond, for converting raw sensor event timestamps
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Convert a raw nanosecond sensor timestamp to milliseconds
pub const fn millis_from_nanos(nanos: u64) -> Timestamp {
    nanos / NANOS_PER_MILLI
}

/// Elapsed time between two timestamps, in seconds
///
/// Returns `None` unless `later` is strictly after `earlier`. Callers treat
/// `None` as "do not integrate": duplicate or backwards timestamps leave
/// filter state untouched instead of producing zero or negative dt.
pub fn delta_seconds(earlier: Timestamp, later: Timestamp) -> Option<f32> {
    if later <= earlier {
        return None;
    }
    Some((later - earlier) as f32 / 1000.0)
}

/// Saturating millisecond delta between two timestamps
pub fn delta_millis(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
