mod common;

use std::sync::{Arc, Mutex, OnceLock, Weak};

use common::*;
use probe_core::{DebouncePolicy, HomingCfg, ProbeActive, ProbeTable, SamplingPolicy};
use probe_hardware::SimulatedAdcBank;
use probe_traits::{TimerId, TriggerSink};
use rstest::rstest;

fn reset_policy() -> SamplingPolicy {
    SamplingPolicy::default()
}

#[rstest]
fn tare_100_then_115_triggers_on_third_reading() {
    let rig = rig(probe_cfg(), reset_policy());
    rig.armed_and_tared(1, 100, 4);
    assert_eq!(rig.table.snapshot(OID).unwrap().tare, 100.0);

    rig.feed.extend([115, 115, 115]);
    let expected = [(103.75, false), (107.5, false), (111.25, true)];
    for (i, (current, triggered)) in expected.into_iter().enumerate() {
        assert_eq!(rig.sink.count(), 0, "fired before reading {i}");
        rig.step().expect("tick");
        let snap = rig.table.snapshot(OID).unwrap();
        assert_eq!(snap.current, Some(current), "reading {i}");
        assert_eq!(snap.trigger_predicate, triggered, "reading {i}");
    }
    assert_eq!(rig.sink.hits(), vec![REASON]);
    assert!(rig.sched.is_idle());
    assert!(!rig.table.query_state(OID).unwrap().homing_active);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
fn fires_once_on_kth_consecutive_match_and_a_miss_resets(#[case] k: u8) {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let rig = rig(cfg, reset_policy());
    rig.armed_and_tared(k, 100, 4);

    // k-1 matches, a miss, then k-1 more matches: never enough in a row.
    let k = usize::from(k);
    rig.feed.extend(std::iter::repeat_n(130, k - 1));
    rig.feed.push(100);
    rig.feed.extend(std::iter::repeat_n(130, k - 1));
    rig.steps(2 * k - 1);
    assert_eq!(rig.sink.count(), 0);

    rig.feed.push(130);
    rig.step().expect("kth match");
    assert_eq!(rig.sink.hits(), vec![REASON]);
    assert!(rig.sched.is_idle());
    // Nothing more fires however long the scheduler runs.
    assert_eq!(rig.step(), None);
    assert_eq!(rig.sink.count(), 1);
}

#[rstest]
fn streak_rechecks_at_sample_cadence_and_rests_after_a_miss() {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let rig = rig(cfg, reset_policy());
    rig.armed_and_tared(3, 100, 4);
    let t0 = rig.pending().expect("armed");

    rig.feed.extend([130, 100, 130]);
    rig.step();
    assert_eq!(rig.pending(), Some(t0 + SAMPLE));
    rig.step();
    assert_eq!(rig.pending(), Some(t0 + SAMPLE + REST));
    rig.step();
    assert_eq!(rig.pending(), Some(t0 + 2 * SAMPLE + REST));
}

#[rstest]
fn accumulate_policy_counts_matches_across_misses() {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let policy = SamplingPolicy {
        debounce: DebouncePolicy::Accumulate,
        oversample: 1,
    };
    let rig = rig(cfg, policy);
    rig.armed_and_tared(3, 100, 4);
    let t0 = rig.pending().expect("armed");

    rig.feed.extend([130, 100, 130]);
    rig.steps(3);
    // A miss after a match keeps the tight cadence.
    assert_eq!(rig.pending(), Some(t0 + 3 * SAMPLE));
    assert_eq!(rig.sink.count(), 0);

    rig.feed.push(70);
    rig.step();
    assert_eq!(rig.sink.hits(), vec![REASON]);
}

#[rstest]
fn oversampling_averages_conversions_into_one_reading() {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let policy = SamplingPolicy {
        debounce: DebouncePolicy::ResetOnMiss,
        oversample: 4,
    };
    let rig = rig(cfg, policy);
    rig.table.arm_for_homing(&homing(1, 1_000)).unwrap();
    rig.feed.extend([100, 101, 102, 104]);
    rig.steps(3);
    assert_eq!(rig.table.snapshot(OID).unwrap().buffered, 0);
    assert_eq!(rig.pending(), Some(1_000 + 3 * SAMPLE));
    rig.step();
    let snap = rig.table.snapshot(OID).unwrap();
    assert_eq!(snap.buffered, 1);
    // (100 + 101 + 102 + 104) / 4 = 101.75, rounded.
    assert_eq!(snap.current, Some(102.0));
}

#[rstest]
fn no_trigger_before_average_window_fills() {
    let rig = rig(probe_cfg(), reset_policy());
    rig.armed_and_tared(1, 100, 4);
    // Re-arming resets the buffer; tare stays.
    rig.table.arm_for_homing(&homing(1, 5_000)).unwrap();
    rig.feed.extend([200, 200, 200]);
    rig.steps(3);
    let snap = rig.table.snapshot(OID).unwrap();
    assert_eq!(snap.current, None);
    assert!(!snap.trigger_predicate);
    assert_eq!(rig.sink.count(), 0);
    rig.feed.push(200);
    rig.step();
    assert_eq!(rig.sink.count(), 1);
}

#[rstest]
fn untared_probe_never_triggers() {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let rig = rig(cfg, reset_policy());
    rig.table.arm_for_homing(&homing(1, 1_000)).unwrap();
    rig.feed.extend([0, 50_000, 10, 65_535]);
    rig.steps(4);
    assert_eq!(rig.sink.count(), 0);
    assert!(rig.pending().is_some());
}

#[rstest]
fn free_running_probe_samples_without_triggering() {
    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    let rig = rig(cfg, reset_policy());
    rig.armed_and_tared(1, 100, 4);
    let mut free = homing(1, 10_000);
    free.target = false;
    rig.table.arm_for_homing(&free).unwrap();
    rig.feed.extend([300, 300, 300]);
    rig.steps(3);
    assert_eq!(rig.sink.count(), 0);
    assert_eq!(rig.pending(), Some(10_000 + 3 * REST));
    let state = rig.table.query_state(OID).unwrap();
    assert!(!state.homing_active);
    assert!(state.trigger_predicate);
}

#[rstest]
fn zero_debounce_count_disarms_without_a_timer() {
    let rig = rig(probe_cfg(), reset_policy());
    rig.table.arm_for_homing(&HomingCfg::disarm(OID)).unwrap();
    assert!(rig.sched.is_idle());
    let state = rig.table.query_state(OID).unwrap();
    assert!(!state.homing_active);
    // Nothing was running, so nothing to report.
    assert!(rig.records().is_empty());
}

#[rstest]
fn disarm_cancels_timer_and_inflight_conversion() {
    let rig = rig(probe_cfg(), reset_policy());
    rig.table.arm_for_homing(&homing(2, 1_000)).unwrap();
    rig.feed.push_busy(100, 500);
    rig.step();
    assert!(rig.feed.in_flight());
    assert_eq!(rig.pending(), Some(1_500));
    let cancels = rig.feed.cancel_count();

    rig.table.arm_for_homing(&HomingCfg::disarm(OID)).unwrap();
    assert!(!rig.feed.in_flight());
    assert_eq!(rig.feed.cancel_count(), cancels + 1);
    assert_eq!(rig.sched.pending(TimerId(OID)), None);
    assert_eq!(
        active_notes(&rig.records()),
        vec![
            ProbeActive {
                oid: OID,
                active: true
            },
            ProbeActive {
                oid: OID,
                active: false
            }
        ]
    );
}

#[rstest]
fn arming_an_idle_probe_reports_active_once() {
    let rig = rig(probe_cfg(), reset_policy());
    rig.table.arm_for_homing(&homing(2, 1_000)).unwrap();
    // Re-arming a running timer is not a transition.
    rig.table.arm_for_homing(&homing(2, 2_000)).unwrap();
    assert_eq!(
        active_notes(&rig.records()),
        vec![ProbeActive {
            oid: OID,
            active: true
        }]
    );
}

#[rstest]
#[case::delay_longer_than_rest(250, 1_250)]
#[case::delay_shorter_than_rest(30, 1_000 + REST)]
fn busy_adc_reschedules_without_consuming_a_slot(#[case] delay: u32, #[case] next: u32) {
    let rig = rig(probe_cfg(), reset_policy());
    rig.table.arm_for_homing(&homing(1, 1_000)).unwrap();
    rig.feed.push_busy(100, delay);
    rig.step();
    assert_eq!(rig.pending(), Some(next));
    assert_eq!(rig.table.snapshot(OID).unwrap().buffered, 0);
    rig.step();
    assert_eq!(rig.table.snapshot(OID).unwrap().buffered, 1);
}

#[rstest]
fn wake_times_wrap_around_the_tick_counter() {
    let rig = rig(probe_cfg(), reset_policy());
    let start = u32::MAX - 150;
    rig.sched.clock().set(start - 10);
    rig.table.arm_for_homing(&homing(1, start)).unwrap();
    rig.feed.extend([100, 100, 100]);
    rig.steps(3);
    assert_eq!(rig.pending(), Some(start.wrapping_add(3 * REST)));
}

#[rstest]
fn unknown_sink_is_rejected_before_touching_the_probe() {
    let rig = rig(probe_cfg(), reset_policy());
    let mut cfg = homing(1, 1_000);
    cfg.sink_oid = 99;
    let err = rig.table.arm_for_homing(&cfg).unwrap_err();
    assert_eq!(
        err.downcast_ref::<probe_core::ProbeError>(),
        Some(&probe_core::ProbeError::UnknownSink(99))
    );
    assert!(rig.sched.is_idle());
}

/// A sink that asks the table about the probe from inside `notify`.
#[derive(Default)]
struct QueryingSink {
    table: OnceLock<Weak<ProbeTable>>,
    seen: Mutex<Vec<(u8, bool)>>,
}

impl TriggerSink for QueryingSink {
    fn notify(&self, reason: u8) {
        let table = self
            .table
            .get()
            .and_then(Weak::upgrade)
            .expect("table outlives the sink");
        let state = table.query_state(OID).expect("query from notify");
        self.seen.lock().unwrap().push((reason, state.homing_active));
    }
}

#[rstest]
fn sink_may_call_back_into_the_table() {
    let mut bank = SimulatedAdcBank::new();
    let feed = bank.add_pin(PIN);
    let (table, sched, _rx) = bare_table(Box::new(bank));
    let table = Arc::new(table);
    let sink = Arc::new(QueryingSink::default());
    sink.table.set(Arc::downgrade(&table)).unwrap();
    table.register_sink(SINK, sink.clone()).unwrap();

    let mut cfg = probe_cfg();
    cfg.average_window = 1;
    table.configure(&cfg).unwrap();
    table.arm_for_homing(&homing(1, 1_000)).unwrap();
    feed.extend([100; 4]);
    for _ in 0..4 {
        sched.run_next(table.as_ref());
    }
    assert!(table.do_tare(OID).unwrap().outcome.is_valid());

    feed.push(150);
    sched.run_next(table.as_ref());
    // The callback already sees the probe out of homing.
    assert_eq!(*sink.seen.lock().unwrap(), vec![(REASON, false)]);
    assert!(sched.is_idle());
}
