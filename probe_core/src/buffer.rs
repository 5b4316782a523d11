//! Bounded FIFO of raw ADC readings with a trailing moving average.
//!
//! Backed by a fixed-capacity `heapless::Deque`, so pushes never allocate and
//! eviction is a cursor move rather than a shift. Only entries written since
//! the last `reset` are ever visible.

use heapless::Deque;

/// Hard cap on buffered samples per probe.
pub const BUFFER_CAPACITY: usize = 200;

/// Clamp a requested window size into `1..=capacity`.
#[inline]
pub fn clamp_window(requested: u32, capacity: usize) -> usize {
    usize::try_from(requested)
        .unwrap_or(usize::MAX)
        .clamp(1, capacity.max(1))
}

#[derive(Debug, Clone)]
pub struct SampleBuffer<const N: usize = BUFFER_CAPACITY> {
    ring: Deque<u16, N>,
    average_window: usize,
    current: Option<f32>,
}

impl<const N: usize> SampleBuffer<N> {
    pub fn new(average_window: u32) -> Self {
        Self {
            ring: Deque::new(),
            average_window: clamp_window(average_window, N),
            current: None,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn average_window(&self) -> usize {
        self.average_window
    }

    /// Change the averaging window (clamped) and recompute the average.
    pub fn set_average_window(&mut self, requested: u32) {
        self.average_window = clamp_window(requested, N);
        self.current = self.mean_of_last(self.average_window);
    }

    /// Append a reading, evicting the oldest one when full.
    pub fn push(&mut self, raw: u16) {
        if self.ring.is_full() {
            self.ring.pop_front();
        }
        // A slot is free at this point.
        let _ = self.ring.push_back(raw);
        self.current = self.mean_of_last(self.average_window);
    }

    /// Forget every reading without touching the storage.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.current = None;
    }

    /// Readings held since the last reset (saturates at capacity).
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Trailing average over `average_window`; `None` until that many
    /// readings exist since the last reset.
    #[inline]
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    /// True once the trailing average is defined.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    pub fn last(&self) -> Option<u16> {
        self.ring.back().copied()
    }

    /// Oldest-to-newest iteration over every held reading.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ring.iter().copied()
    }

    /// The newest `n` readings in insertion order, or `None` when fewer than
    /// `n` (or zero) are held.
    pub fn latest(&self, n: usize) -> Option<impl Iterator<Item = u16> + '_> {
        let len = self.ring.len();
        (n > 0 && n <= len).then(|| self.ring.iter().skip(len - n).copied())
    }

    /// Exact mean of the newest `n` readings. The sum is integer, so the only
    /// rounding is the final division.
    pub fn mean_of_last(&self, n: usize) -> Option<f32> {
        let sum: u64 = self.latest(n)?.map(u64::from).sum();
        Some(sum as f32 / n as f32)
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new(1)
    }
}
