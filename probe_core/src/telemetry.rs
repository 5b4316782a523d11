//! Periodic state reporting layered on the sampling timer.

use probe_traits::is_before;

use crate::wire::ProbeActive;

/// Why a logging session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Host-requested stream, bounded by an optional deadline.
    Stream,
    /// Buffer pre-fill; ends once the tare window has been filled.
    Prefill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSession {
    pub mode: LogMode,
    /// Absolute tick at or after which the stream ends.
    pub deadline: Option<u32>,
}

impl LogSession {
    /// A stream starting with the wake at `first_wake`. A zero duration never
    /// expires.
    pub fn stream(first_wake: u32, duration_ticks: u32) -> Self {
        Self {
            mode: LogMode::Stream,
            deadline: (duration_ticks != 0).then(|| first_wake.wrapping_add(duration_ticks)),
        }
    }

    pub fn prefill() -> Self {
        Self {
            mode: LogMode::Prefill,
            deadline: None,
        }
    }

    /// Whether the record emitted at `waketime` is the last one.
    pub fn ends_at(&self, waketime: u32, buffered: usize, tare_window: usize) -> bool {
        match self.mode {
            LogMode::Prefill => buffered >= tare_window,
            LogMode::Stream => self.deadline.is_some_and(|d| !is_before(waketime, d)),
        }
    }
}

/// Whether the probe timer and the log stream are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub timer: bool,
    pub logging: bool,
}

/// The `probe_active` notification owed for a state transition, if any.
///
/// One is emitted whenever the timer starts or stops, and whenever a log
/// session starts or ends. The flag carries whether the timer runs afterwards,
/// so a session ending while homing continues reports `active`.
pub fn activity_change(oid: u8, before: Activity, after: Activity) -> Option<ProbeActive> {
    let timer_flipped = before.timer != after.timer;
    let log_flipped = before.logging != after.logging;
    (timer_flipped || log_flipped).then_some(ProbeActive {
        oid,
        active: after.timer,
    })
}
