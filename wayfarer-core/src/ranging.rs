//! Beacon Registry and RSSI Ranging
//!
//! Owns the surveyed beacon table and turns raw per-advertisement RSSI
//! into the smoothed distance estimates the triangulator consumes:
//!
//! 1. Low-pass the RSSI (advertisement power is extremely noisy indoors).
//! 2. Convert to meters through the log-distance path-loss model
//!    `d = 10^((txPower - rssi) / (10 * n))`, txPower being the calibrated
//!    RSSI at one meter and n the environment's path-loss exponent.
//! 3. Score the estimate: the smoothed deviation between raw and filtered
//!    RSSI divides confidence as `1 / (1 + deviation / 10)`.
//!
//! Beacons age out: anything unseen for the stale timeout is flagged on
//! [`BeaconRegistry::sweep`] and skipped by [`BeaconRegistry::usable`].
//! A freshly registered beacon starts stale until its first observation.
//!
//! The table is a fixed-capacity `FnvIndexMap` keyed by the 6-byte MAC
//! address; capacity must be a power of two.

use heapless::FnvIndexMap;

use crate::errors::{RangingError, RangingResult};
use crate::fusion::ConfidenceScore;
use crate::signal;
use crate::time::Timestamp;

/// 6-byte MAC address identifying a beacon
pub type BeaconAddress = [u8; 6];

/// A surveyed beacon with its live ranging state
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beacon {
    /// MAC address
    pub address: BeaconAddress,
    /// Optional human-readable label; dropped when longer than 16 bytes
    pub name: Option<heapless::String<16>>,
    /// Surveyed east coordinate, meters
    pub x: f32,
    /// Surveyed north coordinate, meters
    pub y: f32,
    /// Calibrated RSSI at one meter, dBm
    pub tx_power: f32,
    /// Low-pass-filtered RSSI, dBm; meaningless until first observation
    pub filtered_rssi: f32,
    /// Path-loss distance estimate, meters
    pub estimated_distance: f32,
    /// Quality of the distance estimate
    pub distance_confidence: ConfidenceScore,
    /// When the beacon was last observed, ms
    pub last_seen: Timestamp,
    /// Whether the beacon has aged out of triangulation
    pub stale: bool,
    /// Smoothed |raw - filtered| RSSI deviation, dB
    rssi_deviation: f32,
    /// Whether any observation has seeded the filter
    observed: bool,
}

impl Beacon {
    /// Build a beacon record from externally computed ranging data
    ///
    /// For callers that estimate distance themselves and only need the
    /// triangulator. The record is immediately usable (not stale).
    pub fn from_ranging(
        address: BeaconAddress,
        x: f32,
        y: f32,
        estimated_distance: f32,
        distance_confidence: ConfidenceScore,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            address,
            name: None,
            x,
            y,
            tx_power: 0.0,
            filtered_rssi: 0.0,
            estimated_distance,
            distance_confidence,
            last_seen: timestamp,
            stale: false,
            rssi_deviation: 0.0,
            observed: true,
        }
    }

    fn surveyed(address: BeaconAddress, name: Option<&str>, x: f32, y: f32, tx_power: f32) -> Self {
        Self {
            address,
            name: name.and_then(|n| heapless::String::try_from(n).ok()),
            x,
            y,
            tx_power,
            filtered_rssi: 0.0,
            estimated_distance: 0.0,
            distance_confidence: ConfidenceScore::ZERO,
            last_seen: 0,
            stale: true,
            rssi_deviation: 0.0,
            observed: false,
        }
    }
}

/// Tunables for RSSI ranging
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangingConfig {
    /// Low-pass coefficient for RSSI, in (0, 1)
    pub rssi_alpha: f32,
    /// Path-loss exponent n; 2.0 is free space, indoor spans ~1.6-3.3
    pub path_loss_exponent: f32,
    /// Beacons unseen for this long are swept stale, ms
    pub stale_timeout_ms: u64,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            // Advertisements swing +/-10 dB; heavy smoothing wins
            rssi_alpha: 0.3,

            path_loss_exponent: 2.0,

            // A beacon advertising at 1 Hz gets five missed slots
            stale_timeout_ms: 5000,
        }
    }
}

/// Fixed-capacity beacon table with per-observation ranging
///
/// `N` is the table capacity and must be a power of two; 16 covers a
/// typical floor of a deployment.
#[derive(Debug, Clone)]
pub struct BeaconRegistry<const N: usize> {
    config: RangingConfig,
    beacons: FnvIndexMap<BeaconAddress, Beacon, N>,
}

impl<const N: usize> Default for BeaconRegistry<N> {
    fn default() -> Self {
        Self::new(RangingConfig::default())
    }
}

impl<const N: usize> BeaconRegistry<N> {
    /// Create an empty registry with the given tuning
    pub fn new(config: RangingConfig) -> Self {
        Self {
            config,
            beacons: FnvIndexMap::new(),
        }
    }

    /// Declare a surveyed beacon
    ///
    /// Re-registering an address replaces the survey data and resets the
    /// beacon's ranging state.
    pub fn register(
        &mut self,
        address: BeaconAddress,
        name: Option<&str>,
        x: f32,
        y: f32,
        tx_power: f32,
    ) -> RangingResult<()> {
        let beacon = Beacon::surveyed(address, name, x, y, tx_power);
        match self.beacons.insert(address, beacon) {
            Ok(_) => Ok(()),
            Err(_) => Err(RangingError::TableFull { capacity: N }),
        }
    }

    /// Fold one advertisement into a beacon's ranging state
    ///
    /// Returns the beacon's updated distance estimate in meters.
    pub fn observe(
        &mut self,
        address: &BeaconAddress,
        rssi: f32,
        now: Timestamp,
    ) -> RangingResult<f32> {
        let beacon = self
            .beacons
            .get_mut(address)
            .ok_or(RangingError::UnknownBeacon)?;

        if beacon.observed {
            // Deviation is measured against the filter before it moves
            let deviation = libm::fabsf(rssi - beacon.filtered_rssi);
            beacon.filtered_rssi =
                signal::low_pass_filter(rssi, beacon.filtered_rssi, self.config.rssi_alpha);
            beacon.rssi_deviation =
                signal::low_pass_filter(deviation, beacon.rssi_deviation, self.config.rssi_alpha);
        } else {
            beacon.filtered_rssi = rssi;
            beacon.rssi_deviation = 0.0;
            beacon.observed = true;
        }

        beacon.estimated_distance = libm::powf(
            10.0,
            (beacon.tx_power - beacon.filtered_rssi) / (10.0 * self.config.path_loss_exponent),
        );
        beacon.distance_confidence =
            ConfidenceScore::from_float(1.0 / (1.0 + beacon.rssi_deviation / 10.0));
        beacon.last_seen = now;
        beacon.stale = false;

        Ok(beacon.estimated_distance)
    }

    /// Flag beacons unseen within the stale timeout
    pub fn sweep(&mut self, now: Timestamp) {
        for beacon in self.beacons.values_mut() {
            if !beacon.observed
                || now.saturating_sub(beacon.last_seen) > self.config.stale_timeout_ms
            {
                beacon.stale = true;
            }
        }
    }

    /// Beacons currently eligible for triangulation
    pub fn usable(&self) -> impl Iterator<Item = &Beacon> {
        self.beacons.values().filter(|b| !b.stale)
    }

    /// Look up a beacon by address
    pub fn get(&self, address: &BeaconAddress) -> Option<&Beacon> {
        self.beacons.get(address)
    }

    /// Number of registered beacons
    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    /// Whether no beacons are registered
    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}
