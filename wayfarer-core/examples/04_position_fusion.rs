//! Position Fusion Example
//!
//! This example runs the whole Wayfarer pipeline on a simulated indoor
//! walk: accelerometer to steps, magnetometer to heading, BLE RSSI to
//! beacon fixes, and everything into the position fuser.
//!
//! ## What You'll Learn
//!
//! - Wiring detector, heading estimator, registry and fuser together
//! - Dead reckoning between beacon fixes
//! - How the first fix anchors the dead-reckoned track
//! - Watching uncertainty fall when a fix arrives
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 04_position_fusion
//! ```

use wayfarer_core::{
    Beacon, BeaconAddress, BeaconRegistry, BeaconTriangulator, HeadingEstimator, PositionFuser,
    RangingConfig, StepDetector, TriAxisSample,
};

/// Sample period, 20 Hz
const SAMPLE_MS: u64 = 50;

/// Calibrated RSSI at one meter, dBm
const TX_POWER: f32 = -59.0;

/// Walking starts and stops, milliseconds into the scenario
const WALK_START_MS: u64 = 2_000;
const WALK_END_MS: u64 = 9_000;

/// One walking stride sampled at 20 Hz
const STRIDE_WAVE: [f32; 11] = [
    0.0, 0.1, 2.2, 4.4, 2.2, 0.0, -1.5, -3.3, -1.5, -0.1, 0.0,
];

fn main() {
    println!("Wayfarer Position Fusion Example");
    println!("================================\n");

    println!("Scenario: stand at (1.0, 4.0) facing east, walk ~8 m east,");
    println!("stand again. Four beacons fix the position every 2 seconds.\n");

    // Beacon survey: a 10 x 10 m hall with a beacon in each corner
    let survey: [(BeaconAddress, f32, f32); 4] = [
        ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x01], 0.0, 0.0),
        ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x02], 10.0, 0.0),
        ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x03], 0.0, 10.0),
        ([0xC8, 0x2B, 0x96, 0x00, 0x00, 0x04], 10.0, 10.0),
    ];

    let mut registry: BeaconRegistry<8> = BeaconRegistry::new(RangingConfig::default());
    for (address, x, y) in &survey {
        registry.register(*address, None, *x, *y, TX_POWER).unwrap();
    }

    let triangulator = BeaconTriangulator::default();
    let mut detector = StepDetector::default();
    let mut heading = HeadingEstimator::default();
    let mut fuser = PositionFuser::default();

    // Ground truth advances 0.7 m east on every detected step
    let mut true_x = 1.0f32;
    let true_y = 4.0f32;

    println!(" Time | Steps | Heading |  True pos  |  Fused pos  | Unc  | Source");
    println!("------|-------|---------|------------|-------------|------|-------");

    for i in 0..240u64 {
        let t_ms = i * SAMPLE_MS;
        let ts_ns = t_ms * 1_000_000;

        // Inertial samples for this tick
        let accel = accel_at(t_ms);
        let gyro = gyro_at(t_ms);
        let mag = TriAxisSample::new(-20.0, 0.0, -40.0, ts_ns); // facing east

        let estimate = heading.update(&gyro, Some(&accel), Some(&mag), None);
        let output = detector.process(&accel, Some(&gyro));

        if output.step_detected {
            fuser.apply_step(estimate.heading_deg, t_ms);
            true_x += 0.7;
        }

        // BLE advertisements arrive five times a second
        if t_ms % 200 == 0 {
            for (slot, (address, x, y)) in survey.iter().enumerate() {
                let dx = true_x - x;
                let dy = true_y - y;
                let rssi = noisy_rssi((dx * dx + dy * dy).sqrt(), i as i32 * 4 + slot as i32);
                registry.observe(address, rssi, t_ms).unwrap();
            }
        }

        // Solve and fold in a beacon fix every two seconds
        if t_ms > 0 && t_ms % 2_000 == 0 {
            registry.sweep(t_ms);
            let beacons: Vec<Beacon> = registry.usable().cloned().collect();
            let fix = triangulator.triangulate(&beacons, t_ms);
            fuser.apply_fix(&fix, t_ms);
        }

        if t_ms % 1_000 == 0 {
            let fused = fuser.estimate(t_ms);
            if fused.is_valid() {
                println!(
                    "{:5} | {:5} | {:6.1}° | ({:3.1}, {:3.1}) | ({:4.1}, {:4.1}) | {:4.2} | {}",
                    t_ms,
                    output.step_count,
                    estimate.heading_deg,
                    true_x,
                    true_y,
                    fused.x,
                    fused.y,
                    fused.accuracy,
                    fused.source.name()
                );
            } else {
                println!(
                    "{:5} | {:5} | {:6.1}° | ({:3.1}, {:3.1}) |  (no fix)   |  -   | -",
                    t_ms, output.step_count, estimate.heading_deg, true_x, true_y
                );
            }
        }
    }

    let t_end = 240 * SAMPLE_MS;
    let fused = fuser.estimate(t_end);
    println!("\nFinal state:");
    println!("  True position:  ({:.2}, {:.2})", true_x, true_y);
    println!("  Fused position: ({:.2}, {:.2})", fused.x, fused.y);
    println!(
        "  Error:          {:.2} m, uncertainty {:.2} m",
        {
            let dx = fused.x - true_x;
            let dy = fused.y - true_y;
            (dx * dx + dy * dy).sqrt()
        },
        fused.accuracy
    );
    println!("  Speed estimate: {:.2} m/s", fuser.speed());
    println!("  Confidence:     {:.2}", fused.confidence.as_float());

    println!("\n{}", "=".repeat(60));
    println!("Key Insights:");
    println!("- Steps move the estimate immediately, fixes anchor it");
    println!("- Before the first fix the track is relative, not absolute");
    println!("- Uncertainty grows while dead reckoning, shrinks on a fix");
    println!("- The source column tells you what the estimate rests on");
}

/// Accelerometer magnitude: quiet while standing, strides while walking
fn accel_at(t_ms: u64) -> TriAxisSample {
    let ts_ns = t_ms * 1_000_000;
    if !(WALK_START_MS..WALK_END_MS).contains(&t_ms) {
        return TriAxisSample::new(0.0, 0.0, 9.81 + jitter(t_ms as i32) * 0.3, ts_ns);
    }
    let i = ((t_ms - WALK_START_MS) / SAMPLE_MS) as usize;
    let magnitude = 9.81 + STRIDE_WAVE[i % STRIDE_WAVE.len()] + jitter(i as i32) * 0.2;
    TriAxisSample::new(0.0, 0.0, magnitude, ts_ns)
}

/// Gyroscope: arm swing while walking, near silence while standing
fn gyro_at(t_ms: u64) -> TriAxisSample {
    let ts_ns = t_ms * 1_000_000;
    if !(WALK_START_MS..WALK_END_MS).contains(&t_ms) {
        return TriAxisSample::new(0.01, 0.01, 0.02, ts_ns);
    }
    let t = t_ms as f32 / 1000.0;
    let swing = 2.0 * core::f32::consts::PI * 0.9 * t;
    TriAxisSample::new(0.5 * swing.sin(), 0.4 * swing.cos(), 0.02, ts_ns)
}

/// RSSI a receiver would hear at this distance, plus ±2 dB of noise
fn noisy_rssi(distance: f32, seed: i32) -> f32 {
    let ideal = TX_POWER - 20.0 * distance.log10();
    let noise = (((seed * 12345 + 6789) % 1000) as f32 / 1000.0 - 0.5) * 4.0;
    ideal + noise
}

/// Deterministic jitter in [-0.5, 0.5]
fn jitter(seed: i32) -> f32 {
    ((seed * 12345 + 6789) % 1000) as f32 / 1000.0 - 0.5
}
