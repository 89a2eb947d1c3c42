//! Signal Conditioning Utilities
//!
//! ## Overview
//!
//! Pure helpers shared by the detectors: a first-order low-pass filter and
//! the order statistics behind adaptive step thresholds. Everything here is
//! a function of its arguments, performs no allocation, and is safe to call
//! from any context.
//!
//! ## Sorted-Input Contract
//!
//! `median` and `quartiles` expect their input already sorted ascending.
//! Sorting in place would need a mutable copy this crate cannot allocate,
//! so ordering is the caller's job; [`crate::buffer::SampleWindow::sorted_into`]
//! produces a suitable slice from the detector's window scratch array.
//!
//! ## Quartile Method
//!
//! Quartiles use the median-of-halves rule: split the sorted data at the
//! midpoint, excluding the middle element when the length is odd, then take
//! the median of each half. The choice matters less than consistency; the
//! adaptive thresholds only need the interquartile range to track signal
//! spread monotonically.

/// First-order low-pass filter step
///
/// `alpha` is the weight of the current reading, in (0, 1): closer to 1
/// follows the signal, closer to 0 smooths harder. Not clamped; callers own
/// their coefficients.
pub fn low_pass_filter(current: f32, previous: f32, alpha: f32) -> f32 {
    alpha * current + (1.0 - alpha) * previous
}

/// Arithmetic mean, `None` on empty input
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let sum: f32 = values.iter().sum();
    Some(sum / values.len() as f32)
}

/// Median of an ascending-sorted slice, `None` on empty input
///
/// Even lengths average the two central elements.
pub fn median(sorted: &[f32]) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// First and third quartiles of an ascending-sorted slice
///
/// Median-of-halves rule, middle element excluded at odd lengths (see the
/// module docs). `None` when either half would be empty, i.e. fewer than
/// two values.
pub fn quartiles(sorted: &[f32]) -> Option<(f32, f32)> {
    let mid = sorted.len() / 2;
    let upper_start = mid + sorted.len() % 2;

    let q1 = median(&sorted[..mid])?;
    let q3 = median(&sorted[upper_start..])?;
    Some((q1, q3))
}

/// Population standard deviation, `None` on empty input
pub fn std_dev(values: &[f32]) -> Option<f32> {
    let mean = mean(values)?;

    let variance: f32 = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f32>()
        / values.len() as f32;

    Some(libm::sqrtf(variance))
}

/// Clamp `value` into the closed interval between the two bounds
///
/// Accepts the bounds in either order so degenerate configuration (for
/// example a zero base threshold producing an inverted band) collapses the
/// band instead of panicking.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };

    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}
