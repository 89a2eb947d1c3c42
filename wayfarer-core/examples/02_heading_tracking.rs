//! Heading Tracking Example
//!
//! This example demonstrates how Wayfarer turns gyroscope, magnetometer
//! and rotation-vector data into a stable compass heading.
//!
//! ## What You'll Learn
//!
//! - Why raw gyro integration drifts and how references fix it
//! - Running the complementary estimator and the Kalman estimator
//!   side by side on the same sensor stream
//! - How the rotation vector outranks the magnetometer
//! - Reading the accuracy bucket on each estimate
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_heading_tracking
//! ```

use wayfarer_core::{
    HeadingEstimator, KalmanHeadingEstimator, RotationSample, TriAxisSample,
};

/// Sample period, 20 Hz
const SAMPLE_MS: u64 = 50;

/// Uncompensated gyro bias in rad/s, a realistic consumer-grade value
const GYRO_BIAS: f32 = 0.02;

fn main() {
    println!("Wayfarer Heading Tracking Example");
    println!("=================================\n");

    println!("Scenario: stand facing north, turn right to east, stand still.");
    println!("The gyroscope carries a {} rad/s bias (~1.1°/s drift).\n", GYRO_BIAS);

    // Three estimators on the same stream:
    // - gyro_only never sees an absolute reference
    // - complementary blends the compass in at each sample
    // - kalman weights the compass by its modeled noise
    let mut gyro_only = HeadingEstimator::default();
    let mut complementary = HeadingEstimator::default();
    let mut kalman = KalmanHeadingEstimator::default();

    println!(" Time |  True | Gyro only | Complementary | Kalman (accuracy)");
    println!("------|-------|-----------|---------------|------------------");

    for i in 0..160 {
        let t_ms = i * SAMPLE_MS;
        let true_heading = true_heading_deg(t_ms);
        let turn_rate = turn_rate_rad(t_ms);

        let ts_ns = t_ms * 1_000_000;
        // Heading increases clockwise, so a right turn is a negative
        // rotation about the device z axis
        let gyro = TriAxisSample::new(0.0, 0.0, -turn_rate + GYRO_BIAS, ts_ns);
        let accel = TriAxisSample::new(0.0, 0.0, 9.81, ts_ns);
        let mag = mag_for_heading(true_heading, ts_ns);

        let raw = gyro_only.update(&gyro, None, None, None);
        let blended = complementary.update(&gyro, Some(&accel), Some(&mag), None);
        let filtered = kalman.update(&gyro, Some(&accel), Some(&mag), None);

        if t_ms % 500 == 0 {
            println!(
                "{:5} | {:5.1} | {:9.1} | {:13.1} | {:6.1} ({})",
                t_ms,
                true_heading,
                raw.heading_deg,
                blended.heading_deg,
                filtered.heading_deg,
                filtered.accuracy.name()
            );
        }
    }

    let drift = gyro_only.heading_deg() - 90.0;
    println!("\nAfter 8 seconds the raw integration is off by {:.1}°;", drift);
    println!("both corrected estimators hold near 90°.\n");

    // When the platform fuses its own rotation vector, that quaternion
    // is the best reference available and wins over the compass.
    println!("{}", "=".repeat(60));
    println!("Rotation vector takes precedence:\n");

    let ts_ns = 8_000 * 1_000_000;
    let gyro = TriAxisSample::new(0.0, 0.0, GYRO_BIAS, ts_ns);
    let accel = TriAxisSample::new(0.0, 0.0, 9.81, ts_ns);
    let mag = mag_for_heading(90.0, ts_ns);
    // Quaternion for a 90° clockwise rotation about z
    let rotation = RotationSample::new(
        0.0,
        0.0,
        -core::f32::consts::FRAC_1_SQRT_2,
        core::f32::consts::FRAC_1_SQRT_2,
        ts_ns,
    );

    let with_mag = complementary.update(&gyro, Some(&accel), Some(&mag), None);
    println!(
        "  compass only:     {:6.1}°  source={} accuracy={}",
        with_mag.heading_deg,
        with_mag.source.name(),
        with_mag.accuracy.name()
    );

    let ts_ns = 8_050 * 1_000_000;
    let gyro = TriAxisSample::new(0.0, 0.0, GYRO_BIAS, ts_ns);
    let with_rotation = complementary.update(&gyro, Some(&accel), Some(&mag), Some(&rotation));
    println!(
        "  rotation vector:  {:6.1}°  source={} accuracy={}",
        with_rotation.heading_deg,
        with_rotation.source.name(),
        with_rotation.accuracy.name()
    );

    println!("\n{}", "=".repeat(60));
    println!("Key Insights:");
    println!("- Gyro integration alone drifts without bound");
    println!("- The complementary filter trades a little lag for stability");
    println!("- The Kalman estimator reports its own accuracy bucket");
    println!("- Rotation vector > magnetometer > gyro, in that order");
}

/// Scripted true heading: north, a 2 s right turn, then east
fn true_heading_deg(t_ms: u64) -> f32 {
    match t_ms {
        0..=999 => 0.0,
        1000..=2999 => (t_ms - 1000) as f32 * 0.045,
        _ => 90.0,
    }
}

/// True turn rate in rad/s for the scripted motion
fn turn_rate_rad(t_ms: u64) -> f32 {
    if (1000..3000).contains(&t_ms) {
        45.0f32.to_radians()
    } else {
        0.0
    }
}

/// Magnetometer reading a device at this heading would observe, given a
/// 20 µT horizontal field pointing north and a 40 µT vertical component
fn mag_for_heading(heading_deg: f32, timestamp_ns: u64) -> TriAxisSample {
    let radians = heading_deg.to_radians();
    TriAxisSample::new(
        -20.0 * radians.sin(),
        20.0 * radians.cos(),
        -40.0,
        timestamp_ns,
    )
}
