//! Host-side sequences against the simulated probe: replay, stream and
//! self-check.
//!
//! Each run assembles a probe table on a simulated ADC bank and a virtual
//! clock, sends the same command sequence the motion host would, and prints
//! every record that comes back on the link.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;
use probe_config::{Config, TraceRow};
use probe_core::error::Result as CoreResult;
use probe_core::{BUFFER_CAPACITY, Command, HomingCfg, ProbeCfg, ProbeTable, Record, TareOutcome};
use probe_hardware::{AdcFeed, RecordingSink, SimSample, SimScheduler, SimulatedAdcBank, VirtualClock};
use probe_traits::TickClock;
use thiserror::Error;

use crate::records::print_record;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("trace ended after {samples} samples without a trigger")]
    NoTrigger { samples: usize },
    #[error("trace ended with {buffered} of {need} tare readings buffered")]
    TraceTooShort { buffered: usize, need: usize },
    #[error("tare rejected: {0}")]
    Tare(String),
    #[error("self-check failed: {0}")]
    SelfCheck(String),
}

/// Summary printed at the end of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub trigger_clock: u32,
    pub samples: usize,
    pub reason: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub records: usize,
    pub samples: usize,
    pub interrupted: bool,
}

/// A configured probe on simulated collaborators.
pub struct SimProbe {
    pub table: ProbeTable,
    pub sched: Arc<SimScheduler>,
    pub feed: AdcFeed,
    pub sink: Arc<RecordingSink>,
    rx: Receiver<Record>,
    oid: u8,
    json: bool,
}

impl SimProbe {
    /// Build the table and replay the host's start-up sequence: configure,
    /// then the restart disarm.
    pub fn assemble(cfg: &Config, json: bool) -> CoreResult<Self> {
        let clock = VirtualClock::new(cfg.clock.freq_hz);
        let sched = Arc::new(SimScheduler::new(clock.clone()));
        let mut bank = SimulatedAdcBank::new();
        let feed = bank.add_pin(cfg.probe.pin);
        let (tx, rx) = crossbeam_channel::unbounded();
        let table = ProbeTable::builder()
            .with_scheduler(sched.clone())
            .with_clock(Arc::new(clock))
            .with_adc(Box::new(bank))
            .with_link(tx)
            .with_table_cfg((&cfg.clock).into())
            .with_policy((&cfg.policy).into())
            .try_build()?;
        let sink = Arc::new(RecordingSink::new());
        table.register_sink(cfg.homing.sink_oid, sink.clone())?;

        let oid = cfg.probe.oid;
        let configure = Command::from(&ProbeCfg::from(&cfg.probe));
        table.dispatch_raw(configure.id(), &configure.args())?;
        table.dispatch(&Command::from(&HomingCfg::disarm(oid)))?;
        tracing::info!(oid, pin = cfg.probe.pin, "probe configured");

        Ok(Self {
            table,
            sched,
            feed,
            sink,
            rx,
            oid,
            json,
        })
    }

    pub fn load(&self, rows: &[TraceRow]) {
        self.feed.extend_samples(rows.iter().map(|r| SimSample {
            raw: r.raw,
            busy_ticks: r.busy_ticks,
        }));
    }

    /// Print every pending record; returns how many were log records.
    pub fn drain(&self) -> usize {
        let mut logs = 0;
        for record in self.rx.try_iter() {
            if matches!(record, Record::LogRecord(_)) {
                logs += 1;
            }
            print_record(&record, self.json);
        }
        logs
    }

    fn send(&self, cmd: Command) -> CoreResult<()> {
        self.table.dispatch(&cmd)?;
        self.drain();
        Ok(())
    }

    fn now(&self) -> u32 {
        self.sched.clock().now()
    }

    /// Dispatch timer callbacks until `done` holds or the scheduler idles.
    /// Returns `false` when the feed ran dry first.
    fn pump(&self, mut done: impl FnMut(&Self) -> bool) -> bool {
        loop {
            if done(self) {
                return true;
            }
            if self.feed.is_empty() {
                return false;
            }
            if self.sched.run_next(&self.table).is_none() {
                return true;
            }
            self.drain();
        }
    }

    /// Pre-fill the buffer and tare on it.
    fn fill_and_tare(&self) -> CoreResult<()> {
        self.send(Command::Prefill { oid: self.oid })?;
        if !self.pump(|p| p.sched.is_idle()) {
            // Buffered readings, not conversions: oversampling folds several
            // conversions into one reading.
            let snap = self.table.snapshot(self.oid)?;
            return Err(RunError::TraceTooShort {
                buffered: snap.buffered,
                need: snap.tare_window,
            }
            .into());
        }
        let reply = self.table.do_tare(self.oid)?;
        print_record(&reply.record.into(), self.json);
        match reply.outcome {
            TareOutcome::Updated { tare, threshold } => {
                tracing::info!(tare, ?threshold, "tared");
                Ok(())
            }
            other => Err(RunError::Tare(format!("{other:?}")).into()),
        }
    }
}

/// Pre-fill, tare and home against `rows` until the probe triggers.
pub fn run_replay(cfg: &Config, rows: &[TraceRow], log: bool, json: bool) -> CoreResult<ReplaySummary> {
    let sim = SimProbe::assemble(cfg, json)?;
    sim.load(rows);
    sim.fill_and_tare()?;

    let start = sim.now().wrapping_add(cfg.homing.rest_ticks);
    sim.send(Command::from(&HomingCfg::from_config(cfg, start)))?;
    if log {
        sim.send(Command::StartLogging {
            oid: sim.oid,
            duration_ticks: 0,
        })?;
    }

    let mut trigger_clock = None;
    sim.pump(|p| {
        if p.sink.count() > 0 {
            trigger_clock.get_or_insert(p.now());
            true
        } else {
            false
        }
    });
    let samples = sim.feed.read_count();
    let Some(trigger_clock) = trigger_clock else {
        sim.send(Command::StopLogging { oid: sim.oid })?;
        return Err(RunError::NoTrigger { samples }.into());
    };
    sim.send(Command::QueryState { oid: sim.oid })?;

    let reason = sim.sink.hits().first().copied().unwrap_or_default();
    tracing::info!(trigger_clock, samples, reason, "probe triggered");
    Ok(ReplaySummary {
        trigger_clock,
        samples,
        reason,
    })
}

/// Stream log records for `rows`. A zero duration streams until the trace
/// ends or `shutdown` is raised.
pub fn run_stream(
    cfg: &Config,
    rows: &[TraceRow],
    duration_ticks: u32,
    json: bool,
    shutdown: &AtomicBool,
) -> CoreResult<StreamSummary> {
    let sim = SimProbe::assemble(cfg, json)?;
    sim.load(rows);
    sim.table.start_logging(sim.oid, duration_ticks)?;

    let mut records = 0;
    let mut interrupted = false;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            interrupted = true;
            break;
        }
        if sim.sched.is_idle() {
            break;
        }
        if sim.feed.is_empty() {
            break;
        }
        sim.sched.run_next(&sim.table);
        records += sim.drain();
    }
    // No-op when the deadline already ended the stream.
    sim.table.stop_logging(sim.oid)?;
    records += sim.drain();
    Ok(StreamSummary {
        records,
        samples: sim.feed.read_count(),
        interrupted,
    })
}

/// Configure, tare and trigger against a synthetic feed built from the
/// configured windows.
pub fn run_self_check(cfg: &Config, json: bool) -> CoreResult<()> {
    let sim = SimProbe::assemble(cfg, json)?;
    let base: u16 = 2_000;
    let oversample = usize::from(cfg.policy.oversample.max(1));
    let readings = (cfg.probe.tare_window as usize).min(BUFFER_CAPACITY);
    // Alternate whole readings so the tare sees noise after oversampling.
    sim.feed.extend((0..readings * oversample).map(|i| {
        if (i / oversample) % 2 == 0 {
            base - 4
        } else {
            base + 4
        }
    }));
    sim.fill_and_tare()?;

    let report = sim.table.report(sim.oid)?;
    print_record(&report.into(), json);
    if report.tare_scaled == 0 {
        return Err(RunError::SelfCheck("tare is zero after pre-fill".into()).into());
    }

    let start = sim.now().wrapping_add(cfg.homing.rest_ticks);
    sim.send(Command::from(&HomingCfg::from_config(cfg, start)))?;
    let pressed = if cfg.probe.trigger_above { base * 2 } else { 0 };
    let budget = cfg.probe.average_window as usize + usize::from(cfg.homing.debounce_count) + 2;
    sim.feed
        .extend(std::iter::repeat_n(pressed, budget * oversample));
    sim.pump(|p| p.sink.count() > 0);
    if sim.sink.count() != 1 {
        return Err(RunError::SelfCheck(format!(
            "expected one trigger, saw {}",
            sim.sink.count()
        ))
        .into());
    }
    sim.send(Command::QueryState { oid: sim.oid })?;
    Ok(())
}
