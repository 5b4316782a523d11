//! Runtime configuration types for the probe driver.
//!
//! These are the structs the command surface works with. They are separate
//! from the TOML-deserialized config in `probe_config`; see `conversions`.

/// Static fields set by the `configure` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCfg {
    pub oid: u8,
    pub pin: u8,
    pub trigger_above: bool,
    pub trigger_below: bool,
    /// Fraction of tare the average must move by to count as a touch.
    pub threshold: f32,
    /// Recompute `threshold` from the noise floor on every tare.
    pub auto_threshold: bool,
    pub std_multiplier: f32,
    /// Requested sizes; clamped into `1..=BUFFER_CAPACITY` when applied.
    pub tare_window: u32,
    pub average_window: u32,
}

impl Default for ProbeCfg {
    fn default() -> Self {
        Self {
            oid: 0,
            pin: 0,
            trigger_above: true,
            trigger_below: true,
            threshold: 0.0,
            auto_threshold: true,
            std_multiplier: 5.0,
            tare_window: 100,
            average_window: 5,
        }
    }
}

/// Arguments of the `arm_for_homing` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomingCfg {
    pub oid: u8,
    /// Absolute tick of the first sample.
    pub start_clock: u32,
    /// Cadence while confirming a trigger streak.
    pub sample_ticks: u32,
    /// Consecutive matches required; 0 disarms the probe.
    pub debounce_count: u8,
    /// Cadence outside a streak.
    pub rest_ticks: u32,
    /// false: sample without ever triggering (free-running).
    pub target: bool,
    pub sink_oid: u8,
    pub trigger_reason: u8,
}

impl HomingCfg {
    /// The all-zero arm request the host sends to stop a probe.
    pub fn disarm(oid: u8) -> Self {
        Self {
            oid,
            start_clock: 0,
            sample_ticks: 0,
            debounce_count: 0,
            rest_ticks: 0,
            target: false,
            sink_oid: 0,
            trigger_reason: 0,
        }
    }
}

/// How misses inside a trigger streak are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebouncePolicy {
    /// A miss restarts the streak and drops back to the rest cadence.
    #[default]
    ResetOnMiss,
    /// Misses are ignored; every match counts toward the requirement and the
    /// sample cadence is kept once the first match has been seen.
    Accumulate,
}

/// Policy knobs layered on the sampling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    pub debounce: DebouncePolicy,
    /// Conversions averaged into each buffered reading (>= 1).
    pub oversample: u8,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            debounce: DebouncePolicy::ResetOnMiss,
            oversample: 1,
        }
    }
}

/// Table-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCfg {
    /// Cadence used when logging or pre-fill starts a probe that has no rest
    /// interval yet.
    pub idle_rest_ticks: u32,
}

impl Default for TableCfg {
    fn default() -> Self {
        Self {
            idle_rest_ticks: 1_000,
        }
    }
}
