use std::time::{Duration, Instant};

/// Free-running 32-bit tick counter, the time base shared by the scheduler,
/// the probe wake times and the host.
///
/// - now(): current tick count, wrapping at `u32::MAX`
/// - freq_hz(): ticks per second
/// - ticks_from(): helper to convert a duration into ticks at `freq_hz`
pub trait TickClock {
    fn now(&self) -> u32;
    fn freq_hz(&self) -> u32;

    /// Number of ticks covering `d`, rounded up and saturating at `u32::MAX`.
    fn ticks_from(&self, d: Duration) -> u32 {
        let hz = u128::from(self.freq_hz().max(1));
        let ticks = (d.as_nanos() * hz).div_ceil(1_000_000_000);
        ticks.min(u128::from(u32::MAX)) as u32
    }
}

/// True when tick `a` lies strictly before tick `b`, taking 32-bit wraparound
/// into account. Both values must be within 2^31 ticks of each other.
#[inline]
pub fn is_before(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// Tick clock derived from `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTicks {
    origin: Instant,
    freq_hz: u32,
}

impl MonotonicTicks {
    #[inline]
    pub fn new(freq_hz: u32) -> Self {
        Self {
            origin: Instant::now(),
            freq_hz: freq_hz.max(1),
        }
    }
}

impl TickClock for MonotonicTicks {
    fn now(&self) -> u32 {
        let elapsed = self.origin.elapsed();
        let ticks = elapsed.as_nanos() * u128::from(self.freq_hz) / 1_000_000_000;
        // Truncation is the wraparound of the hardware counter.
        ticks as u32
    }

    #[inline]
    fn freq_hz(&self) -> u32 {
        self.freq_hz
    }
}
