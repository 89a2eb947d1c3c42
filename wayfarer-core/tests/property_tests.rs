//! Property tests for the numeric invariants the pipeline leans on
//!
//! These cover the claims the rest of the system assumes without
//! checking: headings stay normalized, counters never run backwards,
//! resets really reset, and confidence arithmetic stays in range.

use proptest::prelude::*;

use wayfarer_core::heading::{normalize_heading, shortest_angle_diff};
use wayfarer_core::{
    ConfidenceScore, HeadingEstimator, PositionSource, StepDetector, TriAxisSample,
    UserPosition,
};

proptest! {
    #[test]
    fn normalized_heading_lands_in_range(degrees in -100_000.0f32..100_000.0) {
        let normalized = normalize_heading(degrees);
        prop_assert!(
            (0.0..360.0).contains(&normalized),
            "{} normalized to {}",
            degrees,
            normalized
        );
    }

    #[test]
    fn shortest_diff_is_short_and_consistent(
        from in -720.0f32..720.0,
        to in -720.0f32..720.0,
    ) {
        let diff = shortest_angle_diff(from, to);
        prop_assert!(diff.abs() <= 180.001, "diff {} too wide", diff);

        // Applying the diff must land on the target, modulo wrap
        let landed = normalize_heading(from + diff);
        let target = normalize_heading(to);
        let residual = shortest_angle_diff(landed, target).abs();
        prop_assert!(residual < 0.01, "residual {} after applying diff", residual);
    }

    #[test]
    fn estimator_heading_is_always_normalized(
        samples in prop::collection::vec(
            (-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0,
             -60.0f32..60.0, -60.0f32..60.0, -60.0f32..60.0),
            1..60,
        )
    ) {
        let mut estimator = HeadingEstimator::default();
        for (i, (gx, gy, gz, mx, my, mz)) in samples.iter().enumerate() {
            let ts_ns = i as u64 * 50_000_000;
            let gyro = TriAxisSample::new(*gx, *gy, *gz, ts_ns);
            let accel = TriAxisSample::new(0.0, 0.0, 9.81, ts_ns);
            let mag = TriAxisSample::new(*mx, *my, *mz, ts_ns);

            let estimate = estimator.update(&gyro, Some(&accel), Some(&mag), None);
            prop_assert!(estimate.heading_deg.is_finite());
            prop_assert!(
                (0.0..360.0).contains(&estimate.heading_deg),
                "heading {} left [0, 360)",
                estimate.heading_deg
            );
        }
    }

    #[test]
    fn step_count_never_runs_backwards(
        magnitudes in prop::collection::vec(0.0f32..25.0, 1..120)
    ) {
        let mut detector = StepDetector::default();
        let mut previous = 0;
        for (i, magnitude) in magnitudes.iter().enumerate() {
            let accel = TriAxisSample::new(0.0, 0.0, *magnitude, i as u64 * 50_000_000);
            let output = detector.process(&accel, None);
            prop_assert!(output.step_count >= previous);
            prop_assert!(output.step_count - previous <= 1);
            previous = output.step_count;
        }

        detector.reset();
        prop_assert_eq!(detector.step_count(), 0);
    }

    #[test]
    fn reset_detector_matches_a_fresh_one(
        warmup in prop::collection::vec(5.0f32..20.0, 1..60),
        replay in prop::collection::vec(5.0f32..20.0, 1..60),
    ) {
        let mut recycled = StepDetector::default();
        for (i, magnitude) in warmup.iter().enumerate() {
            let accel = TriAxisSample::new(0.0, 0.0, *magnitude, i as u64 * 50_000_000);
            recycled.process(&accel, None);
        }
        recycled.reset();

        let mut fresh = StepDetector::default();
        for (i, magnitude) in replay.iter().enumerate() {
            let accel = TriAxisSample::new(0.0, 0.0, *magnitude, i as u64 * 50_000_000);
            let a = recycled.process(&accel, None);
            let b = fresh.process(&accel, None);
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn confidence_stays_in_unit_range(raw in prop::num::f32::ANY) {
        let score = ConfidenceScore::from_float(raw);
        let back = score.as_float();
        prop_assert!((0.0..=1.0).contains(&back), "{} mapped to {}", raw, back);
    }

    #[test]
    fn weighted_mean_of_valid_fixes_is_valid(
        fixes in prop::collection::vec(
            (-100.0f32..100.0, -100.0f32..100.0, 0.1f32..30.0, 0.05f32..1.0),
            1..8,
        )
    ) {
        let positions: Vec<UserPosition> = fixes
            .iter()
            .enumerate()
            .map(|(i, (x, y, accuracy, confidence))| {
                UserPosition::new(
                    *x,
                    *y,
                    *accuracy,
                    i as u64 * 100,
                    PositionSource::Ble,
                    ConfidenceScore::from_float(*confidence),
                )
            })
            .collect();

        let blended = UserPosition::weighted_mean(&positions);
        prop_assert!(blended.is_valid());

        // The blend must stay inside the bounding box of its inputs
        let min_x = fixes.iter().map(|f| f.0).fold(f32::INFINITY, f32::min);
        let max_x = fixes.iter().map(|f| f.0).fold(f32::NEG_INFINITY, f32::max);
        prop_assert!(blended.x >= min_x - 0.001 && blended.x <= max_x + 0.001);
    }
}
