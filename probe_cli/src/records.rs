//! Rendering of outbound probe records for the console.

use probe_core::Record;
use serde_json::{Value, json};

/// Named fields of a record.
pub fn record_json(record: &Record) -> Value {
    let body = match record {
        Record::EndstopState(r) => json!({
            "oid": r.oid,
            "homing": r.homing_active,
            "next_clock": r.next_wake_clock,
            "triggered": r.trigger_predicate,
        }),
        Record::TareResult(r) => json!({
            "oid": r.oid,
            "tare": r.tare_scaled,
            "threshold": r.threshold_scaled,
            "auto_threshold": r.auto_threshold,
            "std_multiplier": r.std_multiplier_scaled,
        }),
        Record::ReportResult(r) => json!({
            "oid": r.oid,
            "raw": r.raw,
            "current": r.current_scaled,
            "tare": r.tare_scaled,
            "threshold": r.threshold_scaled,
            "auto_threshold": r.auto_threshold,
            "std_multiplier": r.std_multiplier_scaled,
            "tare_window": r.tare_window,
            "average_window": r.average_window,
        }),
        Record::ProbeActive(r) => json!({
            "oid": r.oid,
            "active": r.active,
        }),
        Record::LogRecord(r) => json!({
            "oid": r.oid,
            "timestamp": r.timestamp,
            "raw": r.raw,
            "current": r.current_scaled,
            "tare": r.tare_scaled,
            "threshold": r.threshold_scaled,
            "auto_threshold": r.auto_threshold,
            "std_multiplier": r.std_multiplier_scaled,
            "tare_window": r.tare_window,
            "average_window": r.average_window,
            "triggered": r.trigger_predicate,
            "finished": r.finished,
        }),
    };
    json!({ "record": record.name(), "fields": body })
}

/// `name key=value ...` with booleans as 0/1, the way the host prints them.
pub fn record_line(record: &Record) -> String {
    let v = record_json(record);
    let mut line = record.name().to_string();
    if let Some(fields) = v.get("fields").and_then(Value::as_object) {
        for (k, val) in fields {
            let text = match val {
                Value::Bool(b) => u8::from(*b).to_string(),
                other => other.to_string(),
            };
            line.push(' ');
            line.push_str(k);
            line.push('=');
            line.push_str(&text);
        }
    }
    line
}

pub fn print_record(record: &Record, json: bool) {
    if json {
        println!("{}", record_json(record));
    } else {
        println!("{}", record_line(record));
    }
}
