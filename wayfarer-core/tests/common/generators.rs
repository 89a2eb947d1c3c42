//! Synthetic sensor streams for integration testing
//!
//! The accelerometer traces here are spiky on purpose: the adaptive
//! thresholds sit at median + (IQR, stddev) blend, and a pure sinusoid
//! never escapes that band. Real strides do, and so do these.

use wayfarer_core::{BeaconAddress, BeaconRegistry, TriAxisSample};

use super::TestRng;

/// Sample period used by every synthetic stream, 20 Hz
pub const SAMPLE_MS: u64 = 50;

/// One walking stride: heel-strike spike, rebound dip, quiet mid-stance
pub const STRIDE_WAVE: [f32; 11] = [
    0.0, 0.1, 2.2, 4.4, 2.2, 0.0, -1.5, -3.3, -1.5, -0.1, 0.0,
];

/// Milliseconds per synthetic stride
pub const STRIDE_MS: u64 = STRIDE_WAVE.len() as u64 * SAMPLE_MS;

/// Four-beacon survey of a 10 x 10 m hall, one beacon per corner
pub const HALL_SURVEY: [(BeaconAddress, f32, f32); 4] = [
    ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x01], 0.0, 0.0),
    ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x02], 10.0, 0.0),
    ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x03], 0.0, 10.0),
    ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x04], 10.0, 10.0),
];

/// Calibrated RSSI at one meter used throughout the tests, dBm
pub const TX_POWER: f32 = -59.0;

/// Accelerometer sample for the `index`-th tick of a walk
pub fn stride_accel(index: usize, rng: &mut TestRng) -> TriAxisSample {
    let magnitude =
        9.81 + STRIDE_WAVE[index % STRIDE_WAVE.len()] + rng.gen_range(-0.1, 0.1);
    TriAxisSample::new(0.0, 0.0, magnitude, index as u64 * SAMPLE_MS * 1_000_000)
}

/// Accelerometer sample of a phone lying still
pub fn quiet_accel(index: usize, rng: &mut TestRng) -> TriAxisSample {
    let magnitude = 9.81 + rng.gen_range(-0.05, 0.05);
    TriAxisSample::new(0.0, 0.0, magnitude, index as u64 * SAMPLE_MS * 1_000_000)
}

/// Arm-swing gyroscope sample, comfortably above the activity floor
pub fn swing_gyro(index: usize) -> TriAxisSample {
    let t = index as f32 * SAMPLE_MS as f32 / 1000.0;
    let swing = 2.0 * core::f32::consts::PI * 0.9 * t;
    TriAxisSample::new(
        0.5 * swing.sin(),
        0.4 * swing.cos(),
        0.02,
        index as u64 * SAMPLE_MS * 1_000_000,
    )
}

/// Residual rotation of a phone resting on something that vibrates
pub fn idle_gyro(index: usize) -> TriAxisSample {
    TriAxisSample::new(0.01, 0.02, 0.01, index as u64 * SAMPLE_MS * 1_000_000)
}

/// Flat-phone accelerometer, just gravity
pub fn flat_accel(timestamp_ns: u64) -> TriAxisSample {
    TriAxisSample::new(0.0, 0.0, 9.81, timestamp_ns)
}

/// Magnetometer reading a flat device at this heading would observe,
/// given a 20 µT horizontal field and a 40 µT downward component
pub fn mag_for_heading(heading_deg: f32, timestamp_ns: u64) -> TriAxisSample {
    let radians = heading_deg.to_radians();
    TriAxisSample::new(
        -20.0 * radians.sin(),
        20.0 * radians.cos(),
        -40.0,
        timestamp_ns,
    )
}

/// RSSI a receiver at `distance` meters would report, with noise
pub fn noisy_rssi(distance: f32, noise_db: f32, rng: &mut TestRng) -> f32 {
    TX_POWER - 20.0 * distance.log10() + rng.gen_range(-noise_db, noise_db)
}

/// Register the hall survey into a fresh registry
pub fn register_hall<const N: usize>(registry: &mut BeaconRegistry<N>) {
    for (address, x, y) in &HALL_SURVEY {
        registry
            .register(*address, None, *x, *y, TX_POWER)
            .expect("survey fits the registry");
    }
}

/// Feed one round of advertisements from a receiver at `(x, y)`
pub fn observe_from<const N: usize>(
    registry: &mut BeaconRegistry<N>,
    x: f32,
    y: f32,
    noise_db: f32,
    now: u64,
    rng: &mut TestRng,
) {
    for (address, bx, by) in &HALL_SURVEY {
        let dx = x - bx;
        let dy = y - by;
        let rssi = noisy_rssi((dx * dx + dy * dy).sqrt(), noise_db, rng);
        registry
            .observe(address, rssi, now)
            .expect("surveyed beacon");
    }
}
