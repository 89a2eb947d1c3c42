//! Step Counting Example
//!
//! This example demonstrates the simplest use case of Wayfarer:
//! counting steps from raw accelerometer samples using the five-phase
//! peak/valley state machine.
//!
//! ## What You'll Learn
//!
//! - Creating a step detector with the default walking profile
//! - Feeding accelerometer and gyroscope samples
//! - Watching the phase machine walk through a stride
//! - How the gyroscope gate rejects non-walking vibration
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_step_counting
//! ```

use wayfarer_core::{StepConfig, StepDetector, TriAxisSample};

/// Sample period for a typical phone accelerometer, 20 Hz
const SAMPLE_MS: u64 = 50;

fn main() {
    println!("Wayfarer Step Counting Example");
    println!("==============================\n");

    // Default profile: phone held in hand, normal walking pace
    let config = StepConfig::default();
    println!("Walking profile:");
    println!("  Peak threshold: {} m/s²", config.peak_threshold);
    println!("  Valley threshold: {} m/s²", config.valley_threshold);
    println!("  Min peak-valley height: {} m/s²", config.min_peak_valley_height);
    println!(
        "  Step interval: {}..{} ms",
        config.min_step_interval_ms, config.max_step_interval_ms
    );
    println!("  Gyro activity floor: {} rad/s\n", config.gyro_threshold);

    let mut detector = StepDetector::new(config);

    // Simulate 6 seconds of walking at 1.8 steps per second. Each stride
    // swings the vertical acceleration around gravity while arm motion
    // keeps the gyroscope busy.
    println!("Walking for 6 seconds at ~1.8 steps/s:\n");
    println!(" Time | Magnitude | Filtered | Phase   | Steps");
    println!("------|-----------|----------|---------|------");

    let mut steps_at_last_row = 0;
    for i in 0..120 {
        let t_ms = i * SAMPLE_MS;
        let accel = walking_accel(t_ms);
        let gyro = walking_gyro(t_ms);

        let output = detector.process(&accel, Some(&gyro));

        if output.step_detected {
            println!(
                "{:5} | {:9.2} | {:8.2} | {:7} | {:4}  <- step!",
                t_ms,
                accel.magnitude(),
                output.filtered_magnitude,
                output.phase.name(),
                output.step_count
            );
            steps_at_last_row = output.step_count;
        } else if i % 5 == 0 {
            println!(
                "{:5} | {:9.2} | {:8.2} | {:7} | {:4}",
                t_ms,
                accel.magnitude(),
                output.filtered_magnitude,
                output.phase.name(),
                output.step_count
            );
            steps_at_last_row = output.step_count;
        }
    }

    println!("\nSteps counted: {}", steps_at_last_row);

    // Now feed the same detector shape with machine vibration: the
    // acceleration oscillates convincingly but nothing rotates, so the
    // gyroscope gate vetoes every candidate.
    println!("\n{}", "=".repeat(60));
    println!("Vibration rejection:");
    println!("----------------------");
    println!("A phone resting on a washing machine sees step-like");
    println!("acceleration but almost no rotation.\n");

    let mut accel_only = StepDetector::default();
    let mut gated = StepDetector::default();

    for i in 0..120 {
        let t_ms = i * SAMPLE_MS;
        let accel = vibration_accel(t_ms);
        // Residual rotation well under the 0.3 rad/s activity floor
        let idle_gyro = TriAxisSample::new(0.01, 0.02, 0.01, t_ms * 1_000_000);

        accel_only.process(&accel, None);
        gated.process(&accel, Some(&idle_gyro));
    }

    println!("Without gyroscope: {} false steps", accel_only.step_count());
    println!("With gyroscope:    {} false steps", gated.step_count());

    // Other carrying positions ship as named presets
    println!("\n{}", "=".repeat(60));
    println!("Presets:");
    let pocket = StepConfig::pocket();
    let running = StepConfig::running();
    println!(
        "  pocket():  peak {} m/s², height {} m/s², gyro floor {} rad/s",
        pocket.peak_threshold, pocket.min_peak_valley_height, pocket.gyro_threshold
    );
    println!(
        "  running(): peak {} m/s², height {} m/s², interval {}..{} ms",
        running.peak_threshold,
        running.min_peak_valley_height,
        running.min_step_interval_ms,
        running.max_step_interval_ms
    );

    println!("\n{}", "=".repeat(60));
    println!("Key Insights:");
    println!("- One stride is a full peak/valley cycle, not just a peak");
    println!("- Adaptive thresholds recenter on the wearer after ~25 samples");
    println!("- The gyroscope gate separates walking from vibration");
    println!("- Presets tune the same machine for pocket carry and running");
}

/// One walking stride sampled at 20 Hz: heel-strike spike, rebound dip,
/// quiet mid-stance. Spiky on purpose; real strides are not sinusoids.
const STRIDE_WAVE: [f32; 11] = [
    0.0, 0.1, 2.2, 4.4, 2.2, 0.0, -1.5, -3.3, -1.5, -0.1, 0.0,
];

/// Washing-machine knock cycle, step-like in amplitude and cadence
const VIBRATION_WAVE: [f32; 9] = [0.0, 1.8, 3.8, 1.8, 0.0, -1.6, -3.4, -1.6, 0.0];

/// Vertical acceleration of a walking stride, one cycle every 550 ms
fn walking_accel(t_ms: u64) -> TriAxisSample {
    let i = (t_ms / SAMPLE_MS) as usize;
    let magnitude = 9.81 + STRIDE_WAVE[i % STRIDE_WAVE.len()] + jitter(i as i32);
    TriAxisSample::new(0.0, 0.0, magnitude, t_ms * 1_000_000)
}

/// Arm-swing rotation while walking, comfortably above the activity floor
fn walking_gyro(t_ms: u64) -> TriAxisSample {
    let t = t_ms as f32 / 1000.0;
    let swing = 2.0 * core::f32::consts::PI * 0.9 * t;
    TriAxisSample::new(0.5 * swing.sin(), 0.4 * swing.cos(), 0.05, t_ms * 1_000_000)
}

/// Step-like knocking with no rotation to back it up
fn vibration_accel(t_ms: u64) -> TriAxisSample {
    let i = (t_ms / SAMPLE_MS) as usize;
    let magnitude = 9.81 + VIBRATION_WAVE[i % VIBRATION_WAVE.len()];
    TriAxisSample::new(0.0, 0.0, magnitude, t_ms * 1_000_000)
}

/// Simple pseudo-random jitter so the trace is not perfectly periodic
fn jitter(seed: i32) -> f32 {
    (((seed * 12345 + 6789) % 1000) as f32 / 1000.0 - 0.5) * 0.2
}
