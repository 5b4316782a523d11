#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Host-side configuration for an analog probe and the sample-trace format
//! used to replay recorded ADC data.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Trace CSV loader enforces headers and value ranges.
use serde::Deserialize;

/// Sample-trace CSV schema.
///
/// Expected headers:
/// raw,busy_ticks
///
/// Example:
/// raw,busy_ticks
/// 2048,0
/// 2051,120
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub raw: u16,
    /// Ticks the conversion reports busy before this value is ready (0 = ready).
    pub busy_ticks: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    /// Object id the host addresses this probe by.
    pub oid: u8,
    /// ADC pin number on the controller.
    pub pin: u8,
    pub trigger_above: bool,
    pub trigger_below: bool,
    /// Fixed trigger threshold as a fraction of tare (used when auto_threshold = false).
    pub threshold: f32,
    pub auto_threshold: bool,
    /// Standard deviations above the noise floor for the adaptive threshold.
    pub std_multiplier: f32,
    /// Samples averaged into the tare baseline.
    pub tare_window: u32,
    /// Samples in the trailing average compared against the threshold.
    pub average_window: u32,
}

impl Default for ProbeSection {
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HomingSection {
    /// Ticks between checks while a trigger streak is being confirmed.
    pub sample_ticks: u32,
    /// Consecutive positive checks required before triggering.
    pub debounce_count: u8,
    /// Ticks between samples outside a streak.
    pub rest_ticks: u32,
    /// Object id of the trigger sink to notify.
    pub sink_oid: u8,
    /// Reason code delivered to the sink.
    pub trigger_reason: u8,
}

impl Default for HomingSection {
    fn default() -> Self {
        Self {
            sample_ticks: 150,
            debounce_count: 4,
            rest_ticks: 1_000,
            sink_oid: 0,
            trigger_reason: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebounceMode {
    /// Any miss restarts the streak.
    #[default]
    Reset,
    /// Misses are ignored; matches keep counting down.
    Accumulate,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub debounce: DebounceMode,
    /// ADC conversions averaged into one buffered sample.
    pub oversample: u8,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            debounce: DebounceMode::Reset,
            oversample: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Controller tick rate.
    pub freq_hz: u32,
    /// Sampling cadence used when logging starts on an idle probe.
    pub idle_rest_ticks: u32,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            freq_hz: 1_000_000,
            idle_rest_ticks: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub probe: ProbeSection,
    #[serde(default)]
    pub homing: HomingSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub clock: ClockSection,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["raw", "busy_ticks"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'raw,busy_ticks', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("trace CSV {:?} has no samples", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Probe
        if !self.probe.trigger_above && !self.probe.trigger_below {
            eyre::bail!("probe: at least one of trigger_above/trigger_below must be set");
        }
        if !self.probe.threshold.is_finite() || !(0.0..1.0).contains(&self.probe.threshold) {
            eyre::bail!("probe.threshold must be in [0.0, 1.0)");
        }
        if self.probe.auto_threshold
            && (!self.probe.std_multiplier.is_finite() || self.probe.std_multiplier <= 0.0)
        {
            eyre::bail!("probe.std_multiplier must be > 0 when auto_threshold is set");
        }
        if self.probe.tare_window == 0 {
            eyre::bail!("probe.tare_window must be >= 1");
        }
        if self.probe.average_window == 0 {
            eyre::bail!("probe.average_window must be >= 1");
        }

        // Homing
        if self.homing.debounce_count == 0 {
            eyre::bail!("homing.debounce_count must be >= 1");
        }
        if self.homing.sample_ticks == 0 {
            eyre::bail!("homing.sample_ticks must be >= 1");
        }
        if self.homing.rest_ticks == 0 {
            eyre::bail!("homing.rest_ticks must be >= 1");
        }

        // Policy
        if self.policy.oversample == 0 {
            eyre::bail!("policy.oversample must be >= 1");
        }

        // Clock
        if self.clock.freq_hz == 0 {
            eyre::bail!("clock.freq_hz must be > 0");
        }
        if self.clock.idle_rest_ticks == 0 {
            eyre::bail!("clock.idle_rest_ticks must be >= 1");
        }

        Ok(())
    }
}
