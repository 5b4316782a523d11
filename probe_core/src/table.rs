//! Probe arena and the command surface.
//!
//! Probes live in a fixed table indexed by oid. A slot is filled once by
//! `configure` and never freed; the oid doubles as the probe's `TimerId`.
//! Every handler mutates or reads the probe inside one critical section and
//! sends its notifications on the host link after leaving it.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crossbeam_channel::Sender;
use probe_traits::{
    AdcSetup, MonotonicTicks, Scheduler, TickClock, TimerAction, TimerHandler, TimerId,
    TriggerSink,
};

use crate::config::{HomingCfg, ProbeCfg, SamplingPolicy, TableCfg};
use crate::error::{BuildError, ProbeError, Result};
use crate::estimator::TareOutcome;
use crate::fixed_point::{multiplier_from_wire, ratio_from_wire};
use crate::hw_error::map_hw_error;
use crate::probe::{ProbeSnapshot, ProbeState};
use crate::shared::Shared;
use crate::telemetry::{LogSession, activity_change};
use crate::wire::{Command, EndstopState, Record, ReportResult, TareResult};

const SLOTS: usize = u8::MAX as usize + 1;

/// Tick rate assumed when no clock is supplied.
pub const DEFAULT_FREQ_HZ: u32 = 1_000_000;

/// Reply to `do_tare`: what happened, and the record sent to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TareReply {
    pub outcome: TareOutcome,
    pub record: TareResult,
}

pub struct ProbeTable {
    probes: Box<[OnceLock<Shared<ProbeState>>]>,
    sinks: Box<[OnceLock<Arc<dyn TriggerSink>>]>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn TickClock + Send + Sync>,
    adc: Mutex<Box<dyn AdcSetup + Send>>,
    link: Sender<Record>,
    cfg: TableCfg,
    policy: SamplingPolicy,
}

impl core::fmt::Debug for ProbeTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let configured: Vec<usize> = self
            .probes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.get().is_some())
            .map(|(oid, _)| oid)
            .collect();
        f.debug_struct("ProbeTable")
            .field("configured", &configured)
            .field("cfg", &self.cfg)
            .field("policy", &self.policy)
            .finish()
    }
}

fn empty_slots<T>() -> Box<[OnceLock<T>]> {
    (0..SLOTS).map(|_| OnceLock::new()).collect()
}

impl ProbeTable {
    pub fn builder() -> ProbeTableBuilder {
        ProbeTableBuilder::default()
    }

    pub fn clock(&self) -> &Arc<dyn TickClock + Send + Sync> {
        &self.clock
    }

    fn slot(&self, oid: u8) -> core::result::Result<&Shared<ProbeState>, ProbeError> {
        self.probes[usize::from(oid)]
            .get()
            .ok_or(ProbeError::UnknownOid(oid))
    }

    fn sink(&self, oid: u8) -> core::result::Result<Arc<dyn TriggerSink>, ProbeError> {
        self.sinks[usize::from(oid)]
            .get()
            .cloned()
            .ok_or(ProbeError::UnknownSink(oid))
    }

    fn emit(&self, record: impl Into<Record>) {
        let record = record.into();
        if let Err(e) = self.link.send(record) {
            tracing::trace!(record = e.0.name(), oid = e.0.oid(), "host link closed; record dropped");
        }
    }

    /// Make a trigger sink addressable by `oid` from `arm_for_homing`.
    pub fn register_sink(&self, oid: u8, sink: Arc<dyn TriggerSink>) -> Result<()> {
        self.sinks[usize::from(oid)]
            .set(sink)
            .map_err(|_| eyre::Report::new(ProbeError::SinkInUse(oid)))
    }

    /// Allocate the probe, bind its ADC pin and clamp its windows.
    pub fn configure(&self, cfg: &ProbeCfg) -> Result<()> {
        let slot = &self.probes[usize::from(cfg.oid)];
        if slot.get().is_some() {
            return Err(eyre::Report::new(ProbeError::OidInUse(cfg.oid)));
        }
        let adc = self
            .adc
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .setup(cfg.pin)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        let state = ProbeState::new(cfg, adc, self.policy, self.cfg.idle_rest_ticks);
        slot.set(Shared::new(state))
            .map_err(|_| eyre::Report::new(ProbeError::OidInUse(cfg.oid)))?;
        tracing::debug!(oid = cfg.oid, pin = cfg.pin, "probe configured");
        Ok(())
    }

    /// Arm, re-arm or (with a zero debounce count) disarm a probe. The pending
    /// timer and any conversion in flight are cancelled first.
    pub fn arm_for_homing(&self, cfg: &HomingCfg) -> Result<()> {
        let probe = self.slot(cfg.oid)?;
        let sink = if cfg.debounce_count != 0 && cfg.target {
            Some(self.sink(cfg.sink_oid)?)
        } else {
            None
        };
        let timer = TimerId(cfg.oid);
        let change = probe.lock(|p| {
            self.scheduler.cancel(timer);
            let before = p.activity();
            if cfg.debounce_count == 0 {
                p.disarm();
            } else {
                let first = p.arm(cfg, sink);
                self.scheduler.schedule(timer, first);
            }
            activity_change(cfg.oid, before, p.activity())
        });
        tracing::debug!(
            oid = cfg.oid,
            start_clock = cfg.start_clock,
            debounce_count = cfg.debounce_count,
            target = cfg.target,
            "arm for homing"
        );
        if let Some(c) = change {
            self.emit(c);
        }
        Ok(())
    }

    /// `(homing_active, next_wake, trigger_predicate)` read atomically.
    pub fn query_state(&self, oid: u8) -> Result<EndstopState> {
        let snap = self.snapshot(oid)?;
        Ok(snap.endstop_state())
    }

    /// Recompute the tare. With too few readings nothing changes and the reply
    /// carries the current values.
    pub fn do_tare(&self, oid: u8) -> Result<TareReply> {
        let (outcome, snap) = self.slot(oid)?.lock(|p| (p.do_tare(), p.snapshot()));
        match outcome {
            TareOutcome::Insufficient { have, need } => {
                tracing::debug!(oid, have, need, "tare suppressed: window not filled");
            }
            TareOutcome::Updated { tare, threshold } => {
                tracing::debug!(oid, tare, ?threshold, "tare updated");
            }
            TareOutcome::ZeroTare => {}
        }
        Ok(TareReply {
            outcome,
            record: snap.tare_result(),
        })
    }

    pub fn set_threshold(
        &self,
        oid: u8,
        threshold: f32,
        auto_threshold: bool,
        std_multiplier: f32,
    ) -> Result<()> {
        self.slot(oid)?
            .lock(|p| p.set_threshold(threshold, auto_threshold, std_multiplier));
        Ok(())
    }

    pub fn report(&self, oid: u8) -> Result<ReportResult> {
        Ok(self.snapshot(oid)?.report())
    }

    pub fn snapshot(&self, oid: u8) -> Result<ProbeSnapshot> {
        Ok(self.slot(oid)?.lock(|p| p.snapshot()))
    }

    /// Start (or restart) a log stream. `duration_ticks == 0` streams until
    /// `stop_logging`. An idle probe starts sampling at its rest cadence.
    pub fn start_logging(&self, oid: u8, duration_ticks: u32) -> Result<()> {
        let change = self.slot(oid)?.lock(|p| {
            let before = p.activity();
            let first = self.ensure_running(p);
            p.logging = Some(LogSession::stream(first, duration_ticks));
            activity_change(oid, before, p.activity())
        });
        tracing::debug!(oid, duration_ticks, "logging started");
        if let Some(c) = change {
            self.emit(c);
        }
        Ok(())
    }

    /// End the log stream; the timer stops unless homing still needs it.
    pub fn stop_logging(&self, oid: u8) -> Result<()> {
        let change = self.slot(oid)?.lock(|p| {
            let before = p.activity();
            p.logging = None;
            if !p.timer_active() {
                self.scheduler.cancel(TimerId(oid));
                p.halt_sampling();
            }
            activity_change(oid, before, p.activity())
        });
        if let Some(c) = change {
            tracing::debug!(oid, "logging stopped");
            self.emit(c);
        }
        Ok(())
    }

    /// Resize the windows and clear the buffer. The timer is left alone.
    pub fn update_buffer(&self, oid: u8, tare_window: u32, average_window: u32) -> Result<()> {
        self.slot(oid)?
            .lock(|p| p.update_buffer(tare_window, average_window));
        tracing::debug!(oid, tare_window, average_window, "buffer updated");
        Ok(())
    }

    /// Clear the buffer and log until the tare window has been filled.
    pub fn prefill(&self, oid: u8) -> Result<()> {
        let change = self.slot(oid)?.lock(|p| {
            let before = p.activity();
            p.buffer.reset();
            self.ensure_running(p);
            p.logging = Some(LogSession::prefill());
            activity_change(oid, before, p.activity())
        });
        tracing::debug!(oid, "buffer prefill started");
        if let Some(c) = change {
            self.emit(c);
        }
        Ok(())
    }

    pub fn set_policy(&self, oid: u8, policy: SamplingPolicy) -> Result<()> {
        self.slot(oid)?.lock(|p| p.set_policy(policy));
        Ok(())
    }

    /// Schedule the probe timer if nothing keeps it alive yet. Returns the
    /// next wake time.
    fn ensure_running(&self, p: &mut ProbeState) -> u32 {
        if !p.timer_active() {
            p.halt_sampling();
            p.next_wake = self.clock.now().wrapping_add(p.rest_ticks);
            self.scheduler.schedule(TimerId(p.oid), p.next_wake);
        }
        p.next_wake
    }

    /// Execute a decoded host command, sending any reply on the link.
    pub fn dispatch(&self, cmd: &Command) -> Result<()> {
        tracing::trace!(command = cmd.name(), oid = cmd.oid(), "dispatch");
        match *cmd {
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
            } => self.configure(&ProbeCfg {
                oid,
                pin,
                trigger_above,
                trigger_below,
                threshold: ratio_from_wire(threshold_raw),
                auto_threshold,
                std_multiplier: multiplier_from_wire(std_multiplier_raw),
                tare_window,
                average_window,
            }),
            Command::ArmForHoming {
                oid,
                start_clock,
                sample_ticks,
                debounce_count,
                rest_ticks,
                target,
                sink_oid,
                trigger_reason,
            } => self.arm_for_homing(&HomingCfg {
                oid,
                start_clock,
                sample_ticks,
                debounce_count,
                rest_ticks,
                target,
                sink_oid,
                trigger_reason,
            }),
            Command::QueryState { oid } => {
                let state = self.query_state(oid)?;
                self.emit(state);
                Ok(())
            }
            Command::DoTare { oid } => {
                let reply = self.do_tare(oid)?;
                self.emit(reply.record);
                Ok(())
            }
            Command::SetThreshold {
                oid,
                threshold_raw,
                auto_threshold,
                std_multiplier_raw,
            } => self.set_threshold(
                oid,
                ratio_from_wire(threshold_raw),
                auto_threshold,
                multiplier_from_wire(std_multiplier_raw),
            ),
            Command::Report { oid } => {
                let report = self.report(oid)?;
                self.emit(report);
                Ok(())
            }
            Command::StartLogging {
                oid,
                duration_ticks,
            } => self.start_logging(oid, duration_ticks),
            Command::StopLogging { oid } => self.stop_logging(oid),
            Command::UpdateBuffer {
                oid,
                tare_window,
                average_window,
            } => self.update_buffer(oid, tare_window, average_window),
            Command::Prefill { oid } => self.prefill(oid),
        }
    }

    /// Decode and execute a raw `(id, args)` frame.
    pub fn dispatch_raw(&self, id: u8, args: &[u32]) -> Result<()> {
        let cmd = Command::decode(id, args).map_err(ProbeError::from)?;
        self.dispatch(&cmd)
    }
}

impl TimerHandler for ProbeTable {
    fn on_timer(&self, timer: TimerId, waketime: u32) -> TimerAction {
        let Ok(probe) = self.slot(timer.0) else {
            tracing::trace!(timer = timer.0, "timer for unconfigured oid");
            return TimerAction::Done;
        };
        let (tick, change) = probe.lock(|p| {
            let before = p.activity();
            let tick = p.on_tick(waketime);
            (tick, activity_change(p.oid, before, p.activity()))
        });
        // Outside the critical section: the sink may call back into the table.
        if let Some(trigger) = tick.trigger {
            trigger.deliver();
        }
        if let Some(log) = tick.log {
            self.emit(log);
        }
        if let Some(c) = change {
            self.emit(c);
        }
        tick.action
    }
}

/// Assembles a `ProbeTable` from its collaborators.
#[derive(Default)]
pub struct ProbeTableBuilder {
    scheduler: Option<Arc<dyn Scheduler>>,
    clock: Option<Arc<dyn TickClock + Send + Sync>>,
    adc: Option<Box<dyn AdcSetup + Send>>,
    link: Option<Sender<Record>>,
    cfg: TableCfg,
    policy: SamplingPolicy,
}

impl ProbeTableBuilder {
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Defaults to a monotonic clock at `DEFAULT_FREQ_HZ`.
    pub fn with_clock(mut self, clock: Arc<dyn TickClock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_adc(mut self, adc: Box<dyn AdcSetup + Send>) -> Self {
        self.adc = Some(adc);
        self
    }

    pub fn with_link(mut self, link: Sender<Record>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_table_cfg(mut self, cfg: TableCfg) -> Self {
        self.cfg = cfg;
        self
    }

    /// Policy given to probes as they are configured.
    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn try_build(self) -> Result<ProbeTable> {
        let scheduler = self
            .scheduler
            .ok_or_else(|| eyre::Report::new(BuildError::MissingScheduler))?;
        let adc = self
            .adc
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAdc))?;
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLink))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicTicks::new(DEFAULT_FREQ_HZ)));
        Ok(ProbeTable {
            probes: empty_slots(),
            sinks: empty_slots(),
            scheduler,
            clock,
            adc: Mutex::new(adc),
            link,
            cfg: self.cfg,
            policy: self.policy,
        })
    }
}
