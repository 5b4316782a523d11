//! Scripted ADC channels.
//!
//! Each channel is fed from an `AdcFeed` the test (or the CLI trace replay)
//! keeps a handle to. A queued sample may carry a busy delay: the first
//! `begin_sample` on it reports `Busy(delay)`, the next one reports `Ready`.
//! Once the queue runs dry the channel keeps returning the last value read.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use probe_traits::{AdcChannel, AdcSetup, SampleStatus};

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSample {
    pub raw: u16,
    pub busy_ticks: u32,
}

impl SimSample {
    pub fn ready(raw: u16) -> Self {
        Self { raw, busy_ticks: 0 }
    }
}

#[derive(Debug, Default)]
struct FeedState {
    queue: VecDeque<SimSample>,
    hold: u16,
    in_flight: bool,
    reads: usize,
    cancels: usize,
}

/// Shared handle to the sample queue behind a simulated channel.
#[derive(Debug, Clone, Default)]
pub struct AdcFeed(Arc<Mutex<FeedState>>);

impl AdcFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, raw: u16) {
        self.state().queue.push_back(SimSample::ready(raw));
    }

    pub fn push_busy(&self, raw: u16, busy_ticks: u32) {
        self.state().queue.push_back(SimSample { raw, busy_ticks });
    }

    pub fn extend<I: IntoIterator<Item = u16>>(&self, raws: I) {
        self.state()
            .queue
            .extend(raws.into_iter().map(SimSample::ready));
    }

    pub fn extend_samples<I: IntoIterator<Item = SimSample>>(&self, samples: I) {
        self.state().queue.extend(samples);
    }

    pub fn is_empty(&self) -> bool {
        self.state().queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.state().queue.len()
    }

    /// Completed conversions handed to the driver.
    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    /// Calls to `cancel`, in flight or not.
    pub fn cancel_count(&self) -> usize {
        self.state().cancels
    }

    pub fn in_flight(&self) -> bool {
        self.state().in_flight
    }
}

pub struct SimulatedAdc {
    pin: u8,
    feed: AdcFeed,
}

impl SimulatedAdc {
    pub fn new(pin: u8, feed: AdcFeed) -> Self {
        Self { pin, feed }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl AdcChannel for SimulatedAdc {
    fn begin_sample(&mut self) -> SampleStatus {
        let mut st = self.feed.state();
        st.in_flight = true;
        match st.queue.front_mut() {
            Some(s) if s.busy_ticks > 0 => {
                let delay = s.busy_ticks;
                s.busy_ticks = 0;
                SampleStatus::Busy(delay)
            }
            _ => SampleStatus::Ready,
        }
    }

    fn read(&mut self) -> u16 {
        let mut st = self.feed.state();
        st.in_flight = false;
        st.reads += 1;
        if let Some(s) = st.queue.pop_front() {
            st.hold = s.raw;
        }
        tracing::trace!(pin = self.pin, raw = st.hold, "sim adc read");
        st.hold
    }

    fn cancel(&mut self) {
        let mut st = self.feed.state();
        st.in_flight = false;
        st.cancels += 1;
    }
}

/// Set of simulated pins; implements the peripheral setup call.
#[derive(Debug, Default)]
pub struct SimulatedAdcBank {
    feeds: HashMap<u8, AdcFeed>,
    bound: HashSet<u8>,
}

impl SimulatedAdcBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `pin` available and return the feed driving it.
    pub fn add_pin(&mut self, pin: u8) -> AdcFeed {
        self.feeds.entry(pin).or_default().clone()
    }

    fn bind(&mut self, pin: u8) -> crate::error::Result<SimulatedAdc> {
        let feed = self.feeds.get(&pin).cloned().ok_or(HwError::UnknownPin(pin))?;
        if !self.bound.insert(pin) {
            return Err(HwError::PinInUse(pin));
        }
        Ok(SimulatedAdc::new(pin, feed))
    }
}

impl AdcSetup for SimulatedAdcBank {
    fn setup(
        &mut self,
        pin: u8,
    ) -> Result<Box<dyn AdcChannel>, Box<dyn std::error::Error + Send + Sync>> {
        match self.bind(pin) {
            Ok(adc) => Ok(Box::new(adc)),
            Err(e) => {
                tracing::warn!(pin, error = %e, "adc setup failed");
                Err(Box::new(e))
            }
        }
    }
}
