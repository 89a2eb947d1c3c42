//! Error Types for the Ranging Boundary
//!
//! The estimation core itself signals nothing: degenerate numerics are
//! handled by policy (sentinel positions, aborted updates) because there is
//! no caller action that could help mid-filter. The beacon registry is the
//! exception. Its failures are caller-reactable, so they surface as typed
//! errors:
//!
//! - `TableFull`: the fixed-capacity table cannot take another beacon;
//!   the deployment registered more beacons than the registry was sized
//!   for. React by sizing the registry up or trimming the survey.
//! - `UnknownBeacon`: an advertisement from an address that was never
//!   registered. Scanners overhear foreign devices constantly; most hosts
//!   ignore this variant, but it stays an error so the decision is theirs.
//!
//! Errors are small and `Copy`, with inline context only. No heap, no
//! `String`, deterministic size on embedded targets.

use thiserror_no_std::Error;

/// Result type for beacon registry operations
pub type RangingResult<T> = Result<T, RangingError>;

/// Beacon registry errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingError {
    /// Registry is at its fixed capacity
    #[error("Beacon table full: capacity {capacity}")]
    TableFull {
        /// Compile-time capacity of the registry
        capacity: usize,
    },

    /// Observation for an address that was never registered
    #[error("Unknown beacon address")]
    UnknownBeacon,
}

#[cfg(feature = "defmt")]
impl defmt::Format for RangingError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::TableFull { capacity } =>
                defmt::write!(fmt, "Beacon table full: capacity {}", capacity),
            Self::UnknownBeacon =>
                defmt::write!(fmt, "Unknown beacon address"),
        }
    }
}
