//! Common test utilities for the positioning integration tests
//!
//! Provides a deterministic RNG, synthetic sensor streams that look
//! like a walking phone, and beacon-field helpers shared by the
//! integration suites.

#![allow(dead_code)]

pub mod generators;

/// Deterministic random number generator for tests
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16777216.0
    }

    pub fn gen_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Assert two floats agree to within an absolute tolerance
#[macro_export]
macro_rules! assert_close {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let actual = $actual;
        let expected = $expected;
        let diff = (actual - expected).abs();
        if diff > $tolerance {
            panic!(
                "{} differs from {} by {} (allowed {})",
                actual, expected, diff, $tolerance
            );
        }
    };
}
