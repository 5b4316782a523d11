//! Tare baseline and adaptive threshold.
//!
//! Statistics are accumulated in `f64` over the integer readings and narrowed
//! to `f32` once, so repeated tares over the same data give identical
//! results.

use crate::buffer::SampleBuffer;

/// Mean and population standard deviation over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub tare: f32,
    pub stddev: f32,
    pub samples: usize,
}

/// Statistics over exactly the newest `window` readings, or `None` when the
/// buffer does not hold that many since its last reset.
pub fn baseline<const N: usize>(buf: &SampleBuffer<N>, window: usize) -> Option<Baseline> {
    let sum: u64 = buf.latest(window)?.map(u64::from).sum();
    let n = window as f64;
    let mean = sum as f64 / n;
    let sq: f64 = buf
        .latest(window)?
        .map(|x| {
            let d = f64::from(x) - mean;
            d * d
        })
        .sum();
    Some(Baseline {
        tare: mean as f32,
        stddev: (sq / n).sqrt() as f32,
        samples: window,
    })
}

/// `std_multiplier * stddev / tare`. `None` when the tare is zero or the
/// result would not be finite; callers keep their previous threshold.
pub fn adaptive_threshold(b: &Baseline, std_multiplier: f32) -> Option<f32> {
    if b.tare == 0.0 {
        return None;
    }
    let t = std_multiplier * b.stddev / b.tare;
    t.is_finite().then_some(t)
}

/// What a tare request did to the probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TareOutcome {
    /// Fewer than `need` readings since the last reset; nothing changed.
    Insufficient { have: usize, need: usize },
    /// Tare replaced; `threshold` is the adapted value when auto mode is on.
    Updated { tare: f32, threshold: Option<f32> },
    /// The window averaged to zero; tare stored as zero, threshold kept.
    ZeroTare,
}

impl TareOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, TareOutcome::Updated { .. })
    }
}
