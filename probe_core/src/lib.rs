#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Analog load-cell probe driver (hardware-agnostic).
//!
//! The driver samples an ADC channel from a timer callback, keeps a bounded
//! window of raw readings, and compares their trailing average against a
//! tared baseline to decide when the probe has touched. All peripheral access
//! goes through the traits in `probe_traits`.
//!
//! ## Architecture
//!
//! - **Buffer**: fixed-capacity FIFO with a trailing mean (`buffer`)
//! - **Estimator**: tare and adaptive threshold (`estimator`)
//! - **Trigger**: pure band predicate (`trigger`)
//! - **State machine**: per-tick sampling, debounce, oversampling (`machine`)
//! - **Telemetry**: log sessions and `probe_active` transitions (`telemetry`)
//! - **Command surface**: the probe arena and handlers (`table`)
//! - **Wire**: command and record argument vectors (`wire`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Internals use `f32` counts and ratios. Values are scaled to integers only
//! when a record is built; see `fixed_point`.

pub mod buffer;
pub mod config;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod fixed_point;
pub mod hw_error;
pub mod machine;
pub mod probe;
pub mod shared;
pub mod table;
pub mod telemetry;
pub mod trigger;
pub mod wire;

pub use buffer::{BUFFER_CAPACITY, SampleBuffer, clamp_window};
pub use config::{DebouncePolicy, HomingCfg, ProbeCfg, SamplingPolicy, TableCfg};
pub use error::{BuildError, ProbeError, Report, Result};
pub use estimator::{Baseline, TareOutcome, adaptive_threshold, baseline};
pub use machine::{Tick, Trigger};
pub use probe::{ProbeSnapshot, ProbeState};
pub use table::{DEFAULT_FREQ_HZ, ProbeTable, ProbeTableBuilder, TareReply};
pub use telemetry::{Activity, LogMode, LogSession};
pub use trigger::is_triggered;
pub use wire::{
    Command, EndstopState, LogRecord, ProbeActive, Record, ReportResult, TareResult, WireError,
};
