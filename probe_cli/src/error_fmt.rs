//! Human-readable error descriptions and structured JSON error formatting.

use probe_core::{BuildError, ProbeError, WireError};

use crate::run::RunError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(re) = err.downcast_ref::<RunError>() {
        return match re {
            RunError::NoTrigger { samples } => format!(
                "What happened: The probe never triggered ({samples} samples replayed).\nLikely causes: The trace never leaves the threshold band, or debounce_count is higher than the contact lasts.\nHow to fix: Check probe.threshold / probe.std_multiplier and homing.debounce_count, or record a longer trace."
            ),
            RunError::TraceTooShort { buffered, need } => format!(
                "What happened: The trace ran out while filling the tare window ({buffered} of {need} readings buffered).\nLikely causes: The idle part of the trace is shorter than probe.tare_window times policy.oversample conversions.\nHow to fix: Lower probe.tare_window or policy.oversample, or prepend more idle samples to the trace."
            ),
            RunError::Tare(outcome) => format!(
                "What happened: Tare did not produce a baseline ({outcome}).\nLikely causes: The ADC read zero throughout the tare window.\nHow to fix: Check the probe wiring and the trace's raw column."
            ),
            RunError::SelfCheck(msg) => format!(
                "What happened: Self-check failed ({msg}).\nLikely causes: Inconsistent thresholds or windows in the config.\nHow to fix: Re-run with --log-level=debug and review the [probe] and [homing] sections."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<ProbeError>() {
        return match pe {
            ProbeError::UnknownOid(oid) => format!(
                "What happened: Command addressed probe oid {oid}, which is not configured.\nLikely causes: probe.oid mismatch between host and driver.\nHow to fix: Configure the probe before arming or querying it."
            ),
            ProbeError::UnknownSink(oid) => format!(
                "What happened: Trigger sink oid {oid} does not exist.\nLikely causes: homing.sink_oid points at nothing.\nHow to fix: Set homing.sink_oid to a registered trigger sink."
            ),
            ProbeError::Hardware(msg) => format!(
                "What happened: ADC setup failed ({msg}).\nLikely causes: Wrong probe.pin or the pin is already bound.\nHow to fix: Fix probe.pin in the config."
            ),
            ProbeError::Wire(WireError::UnknownId(id)) => format!(
                "What happened: Unknown command id {id}.\nLikely causes: Host and driver disagree on the command table.\nHow to fix: Rebuild both sides from the same revision."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: The probe table could not be assembled ({be}).\nHow to fix: This is a bug in the CLI wiring; please report it."
        );
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'raw,busy_ticks'.".to_string();
    }

    if lower.contains("invalid csv row") || lower.contains("has no samples") {
        return format!(
            "What happened: The trace CSV could not be used ({msg}).\nHow to fix: Each row needs an integer raw reading (0..=65535) and busy_ticks."
        );
    }

    if lower.starts_with("probe") || lower.starts_with("homing") || lower.starts_with("policy") || lower.starts_with("clock") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let cause = err
        .chain()
        .nth(1)
        .map(|src| format!(" Cause: {src}"))
        .unwrap_or_default();
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(re) = err.downcast_ref::<RunError>() {
        return match re {
            RunError::NoTrigger { .. } => 3,
            RunError::TraceTooShort { .. } => 4,
            RunError::Tare(_) => 5,
            RunError::SelfCheck(_) => 6,
        };
    }
    if let Some(pe) = err.downcast_ref::<ProbeError>() {
        return if pe.is_fatal() { 7 } else { 8 };
    }
    1
}

/// Stable name of the failure class for JSON output.
pub fn error_kind(err: &eyre::Report) -> &'static str {
    if let Some(re) = err.downcast_ref::<RunError>() {
        return match re {
            RunError::NoTrigger { .. } => "NoTrigger",
            RunError::TraceTooShort { .. } => "TraceTooShort",
            RunError::Tare(_) => "Tare",
            RunError::SelfCheck(_) => "SelfCheck",
        };
    }
    if let Some(pe) = err.downcast_ref::<ProbeError>() {
        return if pe.is_fatal() { "Fatal" } else { "Wire" };
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(RunError::NoTrigger { samples }) = err.downcast_ref::<RunError>() {
        return json!({
            "reason": error_kind(err),
            "details": { "samples": samples },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": error_kind(err), "message": humanize(err) }).to_string()
}
