//! Capabilities the probe driver consumes from its environment.
//!
//! The driver never touches a peripheral, a timer queue or a host link
//! directly; everything goes through the traits below so the same core runs
//! against real hardware or the deterministic simulation in `probe_hardware`.
pub mod clock;

pub use clock::{MonotonicTicks, TickClock, is_before};

/// Result of asking an ADC channel to start (or finish) a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    /// A conversion result is available through `AdcChannel::read`.
    Ready,
    /// Conversion in progress; ask again in this many ticks.
    Busy(u32),
}

pub trait AdcChannel: Send {
    fn begin_sample(&mut self) -> SampleStatus;
    fn read(&mut self) -> u16;
    /// Abort any conversion in flight. Safe to call when idle.
    fn cancel(&mut self);
}

/// Binds a pin number to an ADC channel (the peripheral driver's setup call).
pub trait AdcSetup {
    fn setup(
        &mut self,
        pin: u8,
    ) -> Result<Box<dyn AdcChannel>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fan-out point for a trigger event (e.g. the group that halts motion).
///
/// Called from the timer path after the probe's state has been released, so
/// an implementation may issue commands back to the driver.
pub trait TriggerSink: Send + Sync {
    fn notify(&self, reason: u8);
}

/// Opaque context registered with a timer; handed back on every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u8);

/// What a timer callback wants the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Run the callback again at this absolute tick.
    Reschedule(u32),
    /// Drop the timer.
    Done,
}

pub trait Scheduler: Send + Sync {
    /// Arm (or re-arm) `timer` to fire at absolute tick `waketime`.
    fn schedule(&self, timer: TimerId, waketime: u32);
    /// Remove `timer` if pending. Safe to call when not pending.
    fn cancel(&self, timer: TimerId);
}

/// Receiver of timer callbacks, invoked by the scheduler's dispatch loop.
pub trait TimerHandler {
    fn on_timer(&self, timer: TimerId, waketime: u32) -> TimerAction;
}
