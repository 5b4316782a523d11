#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;
use probe_core::{
    HomingCfg, ProbeActive, ProbeCfg, ProbeTable, Record, LogRecord, SamplingPolicy, TableCfg,
};
use probe_hardware::{AdcFeed, RecordingSink, SimScheduler, VirtualClock};
use probe_traits::TimerId;

pub const OID: u8 = 1;
pub const PIN: u8 = 4;
pub const SINK: u8 = 7;
pub const REASON: u8 = 3;
pub const SAMPLE: u32 = 10;
pub const REST: u32 = 100;

/// A configured probe on a simulated ADC, driven by a virtual-time scheduler.
pub struct Rig {
    pub table: ProbeTable,
    pub sched: Arc<SimScheduler>,
    pub feed: AdcFeed,
    pub sink: Arc<RecordingSink>,
    pub rx: Receiver<Record>,
}

/// Manual threshold of 10% with a 4-sample tare and average window.
pub fn probe_cfg() -> ProbeCfg {
    ProbeCfg {
        oid: OID,
        pin: PIN,
        trigger_above: true,
        trigger_below: true,
        threshold: 0.1,
        auto_threshold: false,
        std_multiplier: 5.0,
        tare_window: 4,
        average_window: 4,
    }
}

pub fn rig(cfg: ProbeCfg, policy: SamplingPolicy) -> Rig {
    let clock = VirtualClock::new(1_000_000);
    let sched = Arc::new(SimScheduler::new(clock.clone()));
    let mut bank = probe_hardware::SimulatedAdcBank::new();
    let feed = bank.add_pin(PIN);
    let (tx, rx) = crossbeam_channel::unbounded();
    let table = ProbeTable::builder()
        .with_scheduler(sched.clone())
        .with_clock(Arc::new(clock))
        .with_adc(Box::new(bank))
        .with_link(tx)
        .with_table_cfg(TableCfg {
            idle_rest_ticks: 1_000,
        })
        .with_policy(policy)
        .try_build()
        .expect("table build");
    let sink = Arc::new(RecordingSink::new());
    table.register_sink(SINK, sink.clone()).expect("register sink");
    table.configure(&cfg).expect("configure");
    Rig {
        table,
        sched,
        feed,
        sink,
        rx,
    }
}

/// A table with no probes on an arbitrary ADC setup.
pub fn bare_table(
    adc: Box<dyn probe_traits::AdcSetup + Send>,
) -> (ProbeTable, Arc<SimScheduler>, Receiver<Record>) {
    let clock = VirtualClock::new(1_000_000);
    let sched = Arc::new(SimScheduler::new(clock.clone()));
    let (tx, rx) = crossbeam_channel::unbounded();
    let table = ProbeTable::builder()
        .with_scheduler(sched.clone())
        .with_clock(Arc::new(clock))
        .with_adc(adc)
        .with_link(tx)
        .with_table_cfg(TableCfg {
            idle_rest_ticks: 1_000,
        })
        .try_build()
        .expect("table build");
    (table, sched, rx)
}

pub fn homing(debounce_count: u8, start_clock: u32) -> HomingCfg {
    HomingCfg {
        oid: OID,
        start_clock,
        sample_ticks: SAMPLE,
        debounce_count,
        rest_ticks: REST,
        target: true,
        sink_oid: SINK,
        trigger_reason: REASON,
    }
}

impl Rig {
    /// Run the next due callback; returns the tick it ran at.
    pub fn step(&self) -> Option<u32> {
        self.sched.run_next(&self.table)
    }

    pub fn steps(&self, n: usize) {
        for i in 0..n {
            assert!(self.step().is_some(), "timer stopped after {i} steps");
        }
    }

    pub fn pending(&self) -> Option<u32> {
        self.sched.pending(TimerId(OID))
    }

    pub fn records(&self) -> Vec<Record> {
        self.rx.try_iter().collect()
    }

    /// Arm, feed `n` readings of `level`, and tare on them. Records sent
    /// while doing so are discarded.
    pub fn armed_and_tared(&self, debounce_count: u8, level: u16, n: usize) {
        self.table
            .arm_for_homing(&homing(debounce_count, 1_000))
            .expect("arm");
        self.feed.extend(std::iter::repeat_n(level, n));
        self.steps(n);
        let reply = self.table.do_tare(OID).expect("tare");
        assert!(reply.outcome.is_valid(), "tare: {:?}", reply.outcome);
        self.records();
    }
}

pub fn logs(records: &[Record]) -> Vec<LogRecord> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::LogRecord(l) => Some(*l),
            _ => None,
        })
        .collect()
}

pub fn active_notes(records: &[Record]) -> Vec<ProbeActive> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::ProbeActive(a) => Some(*a),
            _ => None,
        })
        .collect()
}
