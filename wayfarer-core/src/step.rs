//! Step Detection State Machine
//!
//! Turns a stream of accelerometer samples into discrete step events by
//! walking a five-phase cycle over the low-pass-filtered magnitude:
//!
//! ```text
//!         magnitude > peak threshold
//!  IDLE ─────────────────────────────▶ RISING
//!    ▲                                    │ drops 5% off the running peak
//!    │ candidate evaluated                ▼
//!  VALLEY ◀──────────── FALLING ◀────── PEAK
//!         rises 5% off         magnitude < valley threshold
//!         the running valley   (timeout in PEAK aborts to IDLE)
//! ```
//!
//! Thresholds adapt to the wearer once the sliding window is half full:
//! `median ± (IQR*1.2 + stddev*0.8)/2`, each clamped to within 60-140% of
//! the configured base value. Until then the base thresholds apply as-is.
//!
//! A candidate step must clear four gates before it counts: enough
//! peak-to-valley height, plausible spacing since the previous accepted
//! step, plausible peak-to-valley duration, and (when a gyroscope is
//! present) enough rotation to look like a stride rather than a bump.
//! Rejected candidates still return the machine to IDLE.

use crate::buffer::SampleWindow;
use crate::sample::TriAxisSample;
use crate::signal;
use crate::time::Timestamp;

/// Sliding window capacity for adaptive thresholding
pub const WINDOW_CAPACITY: usize = 50;

/// Minimum buffered samples before thresholds adapt
const ADAPTIVE_MIN_SAMPLES: usize = 25;

/// A peak is confirmed once magnitude drops to this fraction of it
const PEAK_DROP_RATIO: f32 = 0.95;

/// A valley is confirmed once magnitude rises to this multiple of it
const VALLEY_RISE_RATIO: f32 = 1.05;

/// IQR weight in the adaptive band
const IQR_WEIGHT: f32 = 1.2;

/// Standard-deviation weight in the adaptive band
const STDDEV_WEIGHT: f32 = 0.8;

/// Adaptive thresholds stay within this range of the base value
const ADAPTIVE_CLAMP_LOW: f32 = 0.6;
const ADAPTIVE_CLAMP_HIGH: f32 = 1.4;

/// Phase of the detection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepPhase {
    /// Waiting for magnitude to exceed the peak threshold
    Idle,
    /// Magnitude climbing, tracking the running peak
    Rising,
    /// Peak confirmed, waiting for the drop below the valley threshold
    Peak,
    /// Magnitude falling, tracking the running valley
    Falling,
    /// Valley confirmed, candidate step under evaluation
    Valley,
}

impl StepPhase {
    /// Get human-readable phase name
    pub const fn name(&self) -> &'static str {
        match self {
            StepPhase::Idle => "idle",
            StepPhase::Rising => "rising",
            StepPhase::Peak => "peak",
            StepPhase::Falling => "falling",
            StepPhase::Valley => "valley",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StepPhase {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name())
    }
}

/// Tunable parameters for step detection
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepConfig {
    /// Low-pass coefficient for accelerometer magnitude, in (0, 1)
    pub accel_alpha: f32,
    /// Low-pass coefficient for gyroscope magnitude, in (0, 1)
    pub gyro_alpha: f32,
    /// Base peak threshold in m/s² before adaptation
    pub peak_threshold: f32,
    /// Base valley threshold in m/s² before adaptation
    pub valley_threshold: f32,
    /// Minimum peak-to-valley height for a real step, m/s²
    pub min_peak_valley_height: f32,
    /// Minimum spacing between accepted steps, ms
    pub min_step_interval_ms: u64,
    /// Maximum spacing between accepted steps, ms
    pub max_step_interval_ms: u64,
    /// Minimum peak-to-valley duration, ms
    pub min_peak_duration_ms: u64,
    /// Maximum peak-to-valley duration, ms; also the PEAK-phase timeout
    pub max_peak_duration_ms: u64,
    /// Minimum gyroscope magnitude during a real stride, rad/s
    pub gyro_threshold: f32,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            // Light smoothing; walking energy sits well above sensor noise
            accel_alpha: 0.8,
            gyro_alpha: 0.8,

            // Gravity plus ~1 m/s² of heel-strike impact
            peak_threshold: 10.8,

            // Gravity minus the mid-swing dip
            valley_threshold: 9.2,

            min_peak_valley_height: 2.0,

            // Cadence bounds: 0.5 Hz shuffle up to 5 Hz sprint
            min_step_interval_ms: 200,
            max_step_interval_ms: 2000,

            min_peak_duration_ms: 40,
            max_peak_duration_ms: 700,

            // Handset rotates at least this much during a stride
            gyro_threshold: 0.3,
        }
    }
}

impl StepConfig {
    /// Tuned for a handset riding in a trouser pocket
    ///
    /// Pocket carry amplifies both impact and rotation, so the gates
    /// tighten to reject fabric rustle and sitting-down artifacts.
    pub fn pocket() -> Self {
        Self {
            peak_threshold: 11.5,
            valley_threshold: 8.5,
            min_peak_valley_height: 3.0,
            gyro_threshold: 0.8,
            ..Self::default()
        }
    }

    /// Tuned for jogging cadence
    pub fn running() -> Self {
        Self {
            peak_threshold: 12.5,
            valley_threshold: 8.0,
            min_peak_valley_height: 4.0,
            min_step_interval_ms: 150,
            max_step_interval_ms: 700,
            max_peak_duration_ms: 400,
            ..Self::default()
        }
    }
}

/// Result of one detector invocation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutput {
    /// Whether this call completed an accepted step
    pub step_detected: bool,
    /// Cumulative accepted steps since construction or reset
    pub step_count: u32,
    /// Low-pass-filtered accelerometer magnitude, m/s²
    pub filtered_magnitude: f32,
    /// Low-pass-filtered gyroscope magnitude, rad/s; zero when absent
    pub filtered_gyro_magnitude: f32,
    /// Phase the machine evaluated in during this call
    pub phase: StepPhase,
    /// Sample time in milliseconds
    pub timestamp: Timestamp,
}

/// Peak/valley pair waiting on the acceptance gates
#[derive(Debug, Clone, Copy)]
struct StepCandidate {
    /// Peak-to-valley height, m/s²
    height: f32,
    /// When the running peak was observed, ms
    peak_time: Timestamp,
    /// When the running valley was observed, ms
    valley_time: Timestamp,
    /// When the valley exit fired, ms
    timestamp: Timestamp,
}

/// Phase plus the peak/valley accumulators it carries
#[derive(Debug, Clone, Copy)]
struct PhaseState {
    phase: StepPhase,
    peak_value: f32,
    peak_time: Timestamp,
    valley_value: f32,
    valley_time: Timestamp,
}

impl PhaseState {
    const fn idle() -> Self {
        Self {
            phase: StepPhase::Idle,
            peak_value: 0.0,
            peak_time: 0,
            valley_value: 0.0,
            valley_time: 0,
        }
    }
}

/// One transition of the five-phase cycle
///
/// Pure in its inputs so the cycle can be exercised without a detector.
/// Emits a candidate exactly when FALLING exits into VALLEY; the caller
/// owns acceptance and the snap back to IDLE.
fn advance(
    state: PhaseState,
    magnitude: f32,
    timestamp: Timestamp,
    peak_threshold: f32,
    valley_threshold: f32,
    max_peak_duration_ms: u64,
) -> (PhaseState, Option<StepCandidate>) {
    let mut next = state;
    match state.phase {
        StepPhase::Idle => {
            if magnitude > peak_threshold {
                next = PhaseState {
                    phase: StepPhase::Rising,
                    peak_value: magnitude,
                    peak_time: timestamp,
                    valley_value: 0.0,
                    valley_time: 0,
                };
            }
        }
        StepPhase::Rising => {
            if magnitude > next.peak_value {
                next.peak_value = magnitude;
                next.peak_time = timestamp;
            }
            if magnitude < next.peak_value * PEAK_DROP_RATIO {
                next.phase = StepPhase::Peak;
            }
        }
        StepPhase::Peak => {
            if timestamp.saturating_sub(next.peak_time) > max_peak_duration_ms {
                // Stuck on a plateau, not a step
                next = PhaseState::idle();
            } else if magnitude < valley_threshold {
                next.phase = StepPhase::Falling;
                next.valley_value = magnitude;
                next.valley_time = timestamp;
            }
        }
        StepPhase::Falling => {
            if magnitude < next.valley_value {
                next.valley_value = magnitude;
                next.valley_time = timestamp;
            }
            if magnitude > next.valley_value * VALLEY_RISE_RATIO {
                next.phase = StepPhase::Valley;
                let candidate = StepCandidate {
                    height: next.peak_value - next.valley_value,
                    peak_time: next.peak_time,
                    valley_time: next.valley_time,
                    timestamp,
                };
                return (next, Some(candidate));
            }
        }
        StepPhase::Valley => {
            next = PhaseState::idle();
        }
    }
    (next, None)
}

/// Step detector over filtered accelerometer magnitude
///
/// One instance per sensor stream; calls must arrive in timestamp order.
#[derive(Debug, Clone)]
pub struct StepDetector {
    config: StepConfig,
    phase_state: PhaseState,
    window: SampleWindow<WINDOW_CAPACITY>,
    filtered_accel: f32,
    filtered_gyro: f32,
    step_count: u32,
    last_step_time: Option<Timestamp>,
}

impl Default for StepDetector {
    fn default() -> Self {
        Self::new(StepConfig::default())
    }
}

impl StepDetector {
    /// Create a detector with the given tuning
    pub fn new(config: StepConfig) -> Self {
        Self {
            config,
            phase_state: PhaseState::idle(),
            window: SampleWindow::new(),
            filtered_accel: 0.0,
            filtered_gyro: 0.0,
            step_count: 0,
            last_step_time: None,
        }
    }

    /// Feed one accelerometer sample, with an optional paired gyroscope sample
    pub fn process(&mut self, accel: &TriAxisSample, gyro: Option<&TriAxisSample>) -> StepOutput {
        let timestamp = accel.timestamp_ms();

        self.filtered_accel = signal::low_pass_filter(
            accel.magnitude(),
            self.filtered_accel,
            self.config.accel_alpha,
        );
        if let Some(gyro) = gyro {
            self.filtered_gyro =
                signal::low_pass_filter(gyro.magnitude(), self.filtered_gyro, self.config.gyro_alpha);
        }
        self.window.push(self.filtered_accel);

        let mut scratch = [0.0f32; WINDOW_CAPACITY];
        let (peak_threshold, valley_threshold) = self.thresholds(&mut scratch);

        let (mut next, candidate) = advance(
            self.phase_state,
            self.filtered_accel,
            timestamp,
            peak_threshold,
            valley_threshold,
            self.config.max_peak_duration_ms,
        );

        let mut step_detected = false;
        let mut phase = next.phase;
        if let Some(candidate) = candidate {
            if self.accept(&candidate) {
                self.step_count += 1;
                self.last_step_time = Some(candidate.timestamp);
                step_detected = true;
            }
            phase = StepPhase::Valley;
            next = PhaseState::idle();
        }
        self.phase_state = next;

        StepOutput {
            step_detected,
            step_count: self.step_count,
            filtered_magnitude: self.filtered_accel,
            filtered_gyro_magnitude: self.filtered_gyro,
            phase,
            timestamp,
        }
    }

    /// Peak/valley thresholds for this call
    ///
    /// Base values until the window holds enough history, then the
    /// median-centered adaptive band.
    fn thresholds(&self, scratch: &mut [f32; WINDOW_CAPACITY]) -> (f32, f32) {
        let base = (self.config.peak_threshold, self.config.valley_threshold);
        if self.window.len() < ADAPTIVE_MIN_SAMPLES {
            return base;
        }

        let sorted = self.window.sorted_into(scratch);
        let stats = (
            signal::median(sorted),
            signal::quartiles(sorted),
            signal::std_dev(sorted),
        );
        let (median, (q1, q3), std_dev) = match stats {
            (Some(median), Some(quartiles), Some(std_dev)) => (median, quartiles, std_dev),
            _ => return base,
        };

        let band = ((q3 - q1) * IQR_WEIGHT + std_dev * STDDEV_WEIGHT) * 0.5;
        let peak = signal::clamp(
            median + band,
            base.0 * ADAPTIVE_CLAMP_LOW,
            base.0 * ADAPTIVE_CLAMP_HIGH,
        );
        let valley = signal::clamp(
            median - band,
            base.1 * ADAPTIVE_CLAMP_LOW,
            base.1 * ADAPTIVE_CLAMP_HIGH,
        );
        (peak, valley)
    }

    /// All four acceptance gates, in rejection-rate order
    fn accept(&self, candidate: &StepCandidate) -> bool {
        if candidate.height < self.config.min_peak_valley_height {
            return false;
        }

        if let Some(previous) = self.last_step_time {
            let interval = candidate.timestamp.saturating_sub(previous);
            if interval < self.config.min_step_interval_ms
                || interval > self.config.max_step_interval_ms
            {
                return false;
            }
        }

        let duration = candidate.valley_time.saturating_sub(candidate.peak_time);
        if duration < self.config.min_peak_duration_ms
            || duration > self.config.max_peak_duration_ms
        {
            return false;
        }

        // A filtered gyro magnitude of exactly zero means no gyroscope
        // has been supplied, which waives the rotation gate
        if self.filtered_gyro > 0.0 && self.filtered_gyro < self.config.gyro_threshold {
            return false;
        }

        true
    }

    /// Cumulative accepted steps
    pub const fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Current phase of the cycle
    pub const fn phase(&self) -> StepPhase {
        self.phase_state.phase
    }

    /// Clear all accumulated state back to IDLE and zero
    pub fn reset(&mut self) {
        self.phase_state = PhaseState::idle();
        self.window.clear();
        self.filtered_accel = 0.0;
        self.filtered_gyro = 0.0;
        self.step_count = 0;
        self.last_step_time = None;
    }
}
