use probe_core::{Command, LogRecord, ProbeActive, Record, WireError};
use rstest::rstest;

#[rstest]
fn arm_arguments_follow_wire_order() {
    let cmd = Command::decode(Command::ARM_FOR_HOMING, &[3, 5_000, 150, 4, 1_000, 1, 9, 2])
        .expect("decode");
    assert_eq!(
        cmd,
        Command::ArmForHoming {
            oid: 3,
            start_clock: 5_000,
            sample_ticks: 150,
            debounce_count: 4,
            rest_ticks: 1_000,
            target: true,
            sink_oid: 9,
            trigger_reason: 2,
        }
    );
    assert_eq!(cmd.name(), "analog_probe_home");
    assert_eq!(cmd.args(), vec![3, 5_000, 150, 4, 1_000, 1, 9, 2]);
}

#[rstest]
fn restart_disarm_frame_decodes() {
    let cmd = Command::decode(Command::ARM_FOR_HOMING, &[0; 8]).expect("decode");
    assert!(matches!(
        cmd,
        Command::ArmForHoming {
            debounce_count: 0,
            ..
        }
    ));
}

#[rstest]
fn log_record_fields_are_in_wire_order() {
    let rec = Record::from(LogRecord {
        oid: 1,
        timestamp: 2,
        raw: 3,
        current_scaled: 4,
        tare_scaled: 5,
        threshold_scaled: 6,
        auto_threshold: true,
        std_multiplier_scaled: 8,
        tare_window: 9,
        average_window: 10,
        trigger_predicate: false,
        finished: true,
    });
    assert_eq!(rec.args(), vec![1, 2, 3, 4, 5, 6, 1, 8, 9, 10, 0, 1]);
    assert_eq!(Record::decode(rec.id(), &rec.args()), Ok(rec));
}

#[rstest]
fn probe_active_encodes_flag() {
    let rec = Record::from(ProbeActive {
        oid: 4,
        active: false,
    });
    assert_eq!((rec.name(), rec.args()), ("analog_probe_active", vec![4, 0]));
}

#[rstest]
#[case::unknown_command(Command::PREFILL + 1, vec![1], WireError::UnknownId(Command::PREFILL + 1))]
#[case::short_configure(Command::CONFIGURE, vec![1, 2, 3], WireError::ArgCount {
    name: "config_analog_probe",
    expected: 9,
    got: 3,
})]
#[case::oid_too_wide(Command::REPORT, vec![256], WireError::OutOfRange {
    name: "analog_probe_report",
    field: "oid",
    value: 256,
})]
#[case::debounce_too_wide(Command::ARM_FOR_HOMING, vec![1, 0, 0, 300, 0, 0, 0, 0], WireError::OutOfRange {
    name: "analog_probe_home",
    field: "debounce_count",
    value: 300,
})]
fn malformed_commands_are_rejected(#[case] id: u8, #[case] args: Vec<u32>, #[case] err: WireError) {
    assert_eq!(Command::decode(id, &args), Err(err));
}

#[rstest]
fn record_raw_field_must_fit_u16() {
    let args = [1, 70_000, 0, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        Record::decode(Record::REPORT_RESULT, &args),
        Err(WireError::OutOfRange { field: "raw", .. })
    ));
}
