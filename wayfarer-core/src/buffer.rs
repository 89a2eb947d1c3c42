//! Fixed-Size Sliding Window over Filtered Sensor Magnitudes
//!
//! ## Overview
//!
//! Adaptive step thresholds need the recent history of filtered
//! accelerometer magnitudes: median, quartiles and spread over the last N
//! readings. This module provides that window as a ring buffer with a fixed
//! compile-time capacity, so the hot path performs no allocation and push
//! cost does not depend on how long the detector has been running.
//!
//! ## Design Notes
//!
//! - O(1) insertion: when full, the oldest value is overwritten. Recent
//!   samples matter more than old ones for thresholding, so silently
//!   discarding history is the desired behavior, not an error.
//! - Storage is bare `f32`: the statistics the window feeds are
//!   order-insensitive, so per-entry timestamps would be dead weight.
//!   Chronological iteration is still available for inspection and tests.
//! - The statistics pass works on a sorted copy. [`SampleWindow::sorted_into`]
//!   fills a caller-provided scratch array, keeping the sort out of the
//!   buffer's own storage and avoiding any hidden temporary.
//!
//! ```text
//! SampleWindow<5> after 7 pushes (a..g):
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  f  │  g  │  c  │  d  │  e  │   ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!               ↑ write_pos = 2, logical order c,d,e,f,g
//! ```

/// Ring buffer of the most recent `N` scalar readings
///
/// Maintains these invariants:
/// - `write_pos < N` (next write position is always valid)
/// - `len <= N` (never claims more items than capacity)
/// - iteration yields values oldest to newest
///
/// Not thread-safe; each detector owns its window exclusively.
#[derive(Debug, Clone)]
pub struct SampleWindow<const N: usize> {
    /// Physical storage; slots beyond `len` hold stale values, never read
    data: [f32; N],
    /// Index where the next write will occur, wraps at N
    write_pos: usize,
    /// Current number of valid readings
    len: usize,
}

impl<const N: usize> SampleWindow<N> {
    /// Creates an empty window
    ///
    /// Const so a window can live in a static on embedded targets.
    pub const fn new() -> Self {
        Self {
            data: [0.0; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Push a reading, evicting the oldest once the window is full
    pub fn push(&mut self, value: f32) {
        self.data[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored readings
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the window holds no readings
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the window is at capacity
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Most recent reading
    pub fn last(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        // Most recent is one before the write position
        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };

        Some(self.data[idx])
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> SampleWindowIter<'_, N> {
        SampleWindowIter {
            window: self,
            index: 0,
        }
    }

    /// Discard all readings
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Copy the current contents into `scratch`, sorted ascending
    ///
    /// Returns the filled, sorted prefix. NaN ordering follows
    /// `f32::total_cmp`, although upstream filtering never produces NaN
    /// magnitudes from finite samples.
    pub fn sorted_into<'a>(&self, scratch: &'a mut [f32; N]) -> &'a [f32] {
        let mut count = 0;
        for value in self.iter() {
            scratch[count] = value;
            count += 1;
        }

        let filled = &mut scratch[..count];
        filled.sort_unstable_by(f32::total_cmp);
        filled
    }

    /// Reading by logical index (0 = oldest)
    ///
    /// When the window is not yet full, logical and physical indices match.
    /// Once full, the oldest element sits at `write_pos` and the lookup
    /// offsets from there, modulo N.
    fn get(&self, index: usize) -> Option<f32> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        Some(self.data[actual_index])
    }
}

impl<const N: usize> Default for SampleWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over window contents, oldest to newest
pub struct SampleWindowIter<'a, const N: usize> {
    window: &'a SampleWindow<N>,
    index: usize,
}

impl<'a, const N: usize> Iterator for SampleWindowIter<'a, N> {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.window.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}
