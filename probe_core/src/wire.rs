//! Command vocabulary and reply records exchanged with the host.
//!
//! Every message is a message id plus an ordered list of `u32` arguments; the
//! order below is the wire contract. Fractional values are pre-scaled (see
//! `fixed_point`). Framing, checksums and retransmission belong to the
//! transport and are not handled here.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown message id {0}")]
    UnknownId(u8),
    #[error("{name}: expected {expected} arguments, got {got}")]
    ArgCount {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{name}: {field}={value} out of range")]
    OutOfRange {
        name: &'static str,
        field: &'static str,
        value: u32,
    },
}

fn expect_len(name: &'static str, args: &[u32], expected: usize) -> Result<(), WireError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(WireError::ArgCount {
            name,
            expected,
            got: args.len(),
        })
    }
}

fn narrow<T: TryFrom<u32>>(name: &'static str, field: &'static str, value: u32) -> Result<T, WireError> {
    T::try_from(value).map_err(|_| WireError::OutOfRange { name, field, value })
}

#[inline]
fn flag(v: u32) -> bool {
    v != 0
}

// ── Inbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Configure {
        oid: u8,
        pin: u8,
        trigger_above: bool,
        trigger_below: bool,
        threshold_raw: u32,
        auto_threshold: bool,
        std_multiplier_raw: u32,
        tare_window: u32,
        average_window: u32,
    },
    ArmForHoming {
        oid: u8,
        start_clock: u32,
        sample_ticks: u32,
        debounce_count: u8,
        rest_ticks: u32,
        target: bool,
        sink_oid: u8,
        trigger_reason: u8,
    },
    QueryState {
        oid: u8,
    },
    DoTare {
        oid: u8,
    },
    SetThreshold {
        oid: u8,
        threshold_raw: u32,
        auto_threshold: bool,
        std_multiplier_raw: u32,
    },
    Report {
        oid: u8,
    },
    /// `duration_ticks == 0` logs until `StopLogging`.
    StartLogging {
        oid: u8,
        duration_ticks: u32,
    },
    StopLogging {
        oid: u8,
    },
    UpdateBuffer {
        oid: u8,
        tare_window: u32,
        average_window: u32,
    },
    Prefill {
        oid: u8,
    },
}

impl Command {
    pub const CONFIGURE: u8 = 0;
    pub const ARM_FOR_HOMING: u8 = 1;
    pub const QUERY_STATE: u8 = 2;
    pub const DO_TARE: u8 = 3;
    pub const SET_THRESHOLD: u8 = 4;
    pub const REPORT: u8 = 5;
    pub const START_LOGGING: u8 = 6;
    pub const STOP_LOGGING: u8 = 7;
    pub const UPDATE_BUFFER: u8 = 8;
    pub const PREFILL: u8 = 9;

    pub fn oid(&self) -> u8 {
        match self {
            Command::Configure { oid, .. }
            | Command::ArmForHoming { oid, .. }
            | Command::QueryState { oid }
            | Command::DoTare { oid }
            | Command::SetThreshold { oid, .. }
            | Command::Report { oid }
            | Command::StartLogging { oid, .. }
            | Command::StopLogging { oid }
            | Command::UpdateBuffer { oid, .. }
            | Command::Prefill { oid } => *oid,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Command::Configure { .. } => Self::CONFIGURE,
            Command::ArmForHoming { .. } => Self::ARM_FOR_HOMING,
            Command::QueryState { .. } => Self::QUERY_STATE,
            Command::DoTare { .. } => Self::DO_TARE,
            Command::SetThreshold { .. } => Self::SET_THRESHOLD,
            Command::Report { .. } => Self::REPORT,
            Command::StartLogging { .. } => Self::START_LOGGING,
            Command::StopLogging { .. } => Self::STOP_LOGGING,
            Command::UpdateBuffer { .. } => Self::UPDATE_BUFFER,
            Command::Prefill { .. } => Self::PREFILL,
        }
    }

    pub fn name(&self) -> &'static str {
        command_name(self.id()).unwrap_or("unknown")
    }

    pub fn args(&self) -> Vec<u32> {
        match *self {
            Command::Configure {
                oid,
                pin,
                trigger_above,
                trigger_below,
                threshold_raw,
                auto_threshold,
                std_multiplier_raw,
                tare_window,
                average_window,
            } => vec![
                oid.into(),
                pin.into(),
                trigger_above.into(),
                trigger_below.into(),
                threshold_raw,
                auto_threshold.into(),
                std_multiplier_raw,
                tare_window,
                average_window,
            ],
            Command::ArmForHoming {
                oid,
                start_clock,
                sample_ticks,
                debounce_count,
                rest_ticks,
                target,
                sink_oid,
                trigger_reason,
            } => vec![
                oid.into(),
                start_clock,
                sample_ticks,
                debounce_count.into(),
                rest_ticks,
                target.into(),
                sink_oid.into(),
                trigger_reason.into(),
            ],
            Command::QueryState { oid }
            | Command::DoTare { oid }
            | Command::Report { oid }
            | Command::StopLogging { oid }
            | Command::Prefill { oid } => vec![oid.into()],
            Command::SetThreshold {
                oid,
                threshold_raw,
                auto_threshold,
                std_multiplier_raw,
            } => vec![
                oid.into(),
                threshold_raw,
                auto_threshold.into(),
                std_multiplier_raw,
            ],
            Command::StartLogging {
                oid,
                duration_ticks,
            } => vec![oid.into(), duration_ticks],
            Command::UpdateBuffer {
                oid,
                tare_window,
                average_window,
            } => vec![oid.into(), tare_window, average_window],
        }
    }

    pub fn decode(id: u8, args: &[u32]) -> Result<Self, WireError> {
        let name = command_name(id).ok_or(WireError::UnknownId(id))?;
        let cmd = match id {
            Self::CONFIGURE => {
                expect_len(name, args, 9)?;
                Command::Configure {
                    oid: narrow(name, "oid", args[0])?,
                    pin: narrow(name, "pin", args[1])?,
                    trigger_above: flag(args[2]),
                    trigger_below: flag(args[3]),
                    threshold_raw: args[4],
                    auto_threshold: flag(args[5]),
                    std_multiplier_raw: args[6],
                    tare_window: args[7],
                    average_window: args[8],
                }
            }
            Self::ARM_FOR_HOMING => {
                expect_len(name, args, 8)?;
                Command::ArmForHoming {
                    oid: narrow(name, "oid", args[0])?,
                    start_clock: args[1],
                    sample_ticks: args[2],
                    debounce_count: narrow(name, "debounce_count", args[3])?,
                    rest_ticks: args[4],
                    target: flag(args[5]),
                    sink_oid: narrow(name, "sink_oid", args[6])?,
                    trigger_reason: narrow(name, "trigger_reason", args[7])?,
                }
            }
            Self::SET_THRESHOLD => {
                expect_len(name, args, 4)?;
                Command::SetThreshold {
                    oid: narrow(name, "oid", args[0])?,
                    threshold_raw: args[1],
                    auto_threshold: flag(args[2]),
                    std_multiplier_raw: args[3],
                }
            }
            Self::START_LOGGING => {
                expect_len(name, args, 2)?;
                Command::StartLogging {
                    oid: narrow(name, "oid", args[0])?,
                    duration_ticks: args[1],
                }
            }
            Self::UPDATE_BUFFER => {
                expect_len(name, args, 3)?;
                Command::UpdateBuffer {
                    oid: narrow(name, "oid", args[0])?,
                    tare_window: args[1],
                    average_window: args[2],
                }
            }
            _ => {
                expect_len(name, args, 1)?;
                let oid = narrow(name, "oid", args[0])?;
                match id {
                    Self::QUERY_STATE => Command::QueryState { oid },
                    Self::DO_TARE => Command::DoTare { oid },
                    Self::REPORT => Command::Report { oid },
                    Self::STOP_LOGGING => Command::StopLogging { oid },
                    _ => Command::Prefill { oid },
                }
            }
        };
        Ok(cmd)
    }
}

fn command_name(id: u8) -> Option<&'static str> {
    Some(match id {
        Command::CONFIGURE => "config_analog_probe",
        Command::ARM_FOR_HOMING => "analog_probe_home",
        Command::QUERY_STATE => "analog_probe_query_state",
        Command::DO_TARE => "analog_probe_do_tare",
        Command::SET_THRESHOLD => "analog_probe_set_thresh",
        Command::REPORT => "analog_probe_report",
        Command::START_LOGGING => "analog_probe_start_logging",
        Command::STOP_LOGGING => "analog_probe_stop_logging",
        Command::UPDATE_BUFFER => "analog_probe_update_buffer",
        Command::PREFILL => "analog_probe_prefill",
        _ => return None,
    })
}

// ── Outbound ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndstopState {
    pub oid: u8,
    pub homing_active: bool,
    pub next_wake_clock: u32,
    pub trigger_predicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TareResult {
    pub oid: u8,
    pub tare_scaled: u32,
    pub threshold_scaled: u32,
    pub auto_threshold: bool,
    pub std_multiplier_scaled: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportResult {
    pub oid: u8,
    pub raw: u16,
    pub current_scaled: u32,
    pub tare_scaled: u32,
    pub threshold_scaled: u32,
    pub auto_threshold: bool,
    pub std_multiplier_scaled: u32,
    pub tare_window: u32,
    pub average_window: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeActive {
    pub oid: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    pub oid: u8,
    pub timestamp: u32,
    pub raw: u16,
    pub current_scaled: u32,
    pub tare_scaled: u32,
    pub threshold_scaled: u32,
    pub auto_threshold: bool,
    pub std_multiplier_scaled: u32,
    pub tare_window: u32,
    pub average_window: u32,
    pub trigger_predicate: bool,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    EndstopState(EndstopState),
    TareResult(TareResult),
    ReportResult(ReportResult),
    ProbeActive(ProbeActive),
    LogRecord(LogRecord),
}

impl Record {
    pub const ENDSTOP_STATE: u8 = 0x80;
    pub const TARE_RESULT: u8 = 0x81;
    pub const REPORT_RESULT: u8 = 0x82;
    pub const PROBE_ACTIVE: u8 = 0x83;
    pub const LOG_RECORD: u8 = 0x84;

    pub fn oid(&self) -> u8 {
        match self {
            Record::EndstopState(r) => r.oid,
            Record::TareResult(r) => r.oid,
            Record::ReportResult(r) => r.oid,
            Record::ProbeActive(r) => r.oid,
            Record::LogRecord(r) => r.oid,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Record::EndstopState(_) => Self::ENDSTOP_STATE,
            Record::TareResult(_) => Self::TARE_RESULT,
            Record::ReportResult(_) => Self::REPORT_RESULT,
            Record::ProbeActive(_) => Self::PROBE_ACTIVE,
            Record::LogRecord(_) => Self::LOG_RECORD,
        }
    }

    pub fn name(&self) -> &'static str {
        record_name(self.id()).unwrap_or("unknown")
    }

    pub fn args(&self) -> Vec<u32> {
        match *self {
            Record::EndstopState(r) => vec![
                r.oid.into(),
                r.homing_active.into(),
                r.next_wake_clock,
                r.trigger_predicate.into(),
            ],
            Record::TareResult(r) => vec![
                r.oid.into(),
                r.tare_scaled,
                r.threshold_scaled,
                r.auto_threshold.into(),
                r.std_multiplier_scaled,
            ],
            Record::ReportResult(r) => vec![
                r.oid.into(),
                r.raw.into(),
                r.current_scaled,
                r.tare_scaled,
                r.threshold_scaled,
                r.auto_threshold.into(),
                r.std_multiplier_scaled,
                r.tare_window,
                r.average_window,
            ],
            Record::ProbeActive(r) => vec![r.oid.into(), r.active.into()],
            Record::LogRecord(r) => vec![
                r.oid.into(),
                r.timestamp,
                r.raw.into(),
                r.current_scaled,
                r.tare_scaled,
                r.threshold_scaled,
                r.auto_threshold.into(),
                r.std_multiplier_scaled,
                r.tare_window,
                r.average_window,
                r.trigger_predicate.into(),
                r.finished.into(),
            ],
        }
    }

    pub fn decode(id: u8, args: &[u32]) -> Result<Self, WireError> {
        let name = record_name(id).ok_or(WireError::UnknownId(id))?;
        let rec = match id {
            Self::ENDSTOP_STATE => {
                expect_len(name, args, 4)?;
                Record::EndstopState(EndstopState {
                    oid: narrow(name, "oid", args[0])?,
                    homing_active: flag(args[1]),
                    next_wake_clock: args[2],
                    trigger_predicate: flag(args[3]),
                })
            }
            Self::TARE_RESULT => {
                expect_len(name, args, 5)?;
                Record::TareResult(TareResult {
                    oid: narrow(name, "oid", args[0])?,
                    tare_scaled: args[1],
                    threshold_scaled: args[2],
                    auto_threshold: flag(args[3]),
                    std_multiplier_scaled: args[4],
                })
            }
            Self::REPORT_RESULT => {
                expect_len(name, args, 9)?;
                Record::ReportResult(ReportResult {
                    oid: narrow(name, "oid", args[0])?,
                    raw: narrow(name, "raw", args[1])?,
                    current_scaled: args[2],
                    tare_scaled: args[3],
                    threshold_scaled: args[4],
                    auto_threshold: flag(args[5]),
                    std_multiplier_scaled: args[6],
                    tare_window: args[7],
                    average_window: args[8],
                })
            }
            Self::PROBE_ACTIVE => {
                expect_len(name, args, 2)?;
                Record::ProbeActive(ProbeActive {
                    oid: narrow(name, "oid", args[0])?,
                    active: flag(args[1]),
                })
            }
            _ => {
                expect_len(name, args, 12)?;
                Record::LogRecord(LogRecord {
                    oid: narrow(name, "oid", args[0])?,
                    timestamp: args[1],
                    raw: narrow(name, "raw", args[2])?,
                    current_scaled: args[3],
                    tare_scaled: args[4],
                    threshold_scaled: args[5],
                    auto_threshold: flag(args[6]),
                    std_multiplier_scaled: args[7],
                    tare_window: args[8],
                    average_window: args[9],
                    trigger_predicate: flag(args[10]),
                    finished: flag(args[11]),
                })
            }
        };
        Ok(rec)
    }
}

fn record_name(id: u8) -> Option<&'static str> {
    Some(match id {
        Record::ENDSTOP_STATE => "endstop_state",
        Record::TARE_RESULT => "analog_probe_tare",
        Record::REPORT_RESULT => "analog_probe_report_result",
        Record::PROBE_ACTIVE => "analog_probe_active",
        Record::LOG_RECORD => "analog_probe_log",
        _ => return None,
    })
}

macro_rules! impl_from_record {
    ($($ty:ident),*) => {
        $(impl From<$ty> for Record {
            fn from(r: $ty) -> Self {
                Record::$ty(r)
            }
        })*
    };
}

impl_from_record!(EndstopState, TareResult, ReportResult, ProbeActive, LogRecord);
