use crate::events::{EventHistory, EventKind};
use crate::hal::{
    BaroSensor, DynamicModel, FixQuality, GnssOutputMode, GnssReceiver, Line, ModemTransport,
    Platform,
};
use crate::interval::IntervalClock;
use crate::poll::{poll_bounded, PollOutcome, PollWindow};
use crate::power::{PowerDomain, PowerDomainController, PowerStatus, VoltageCalibration, VoltageMonitor};
use crate::report::{format_report, EnvironmentRecord, FixRecord};
use crate::sleep::SleepController;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on state-machine steps per cycle. The longest legal path
/// (full acquisition and transmit) is nine steps.
const MAX_STEPS_PER_CYCLE: usize = 16;

/// The sequencer's states. Exactly one is current at a time; transitions
/// are determined purely by the outcome of the state's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    Init,
    StartGnss,
    ReadGnss,
    ReadPressure,
    StartCapacitorCharge,
    TopUpCapacitorCharge,
    StartTransmit,
    Sleep,
    Wake,
}

/// Timing, threshold, and calibration parameters for the cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Seconds between transmit cycles.
    pub transmit_interval_s: u32,
    /// Bus voltage below which further current draw is refused.
    pub low_voltage_threshold_v: f32,
    /// GNSS power-domain settle time before the handshake.
    pub gnss_settle_ms: u32,
    /// Upper bound on the 3D-fix wait.
    pub fix_timeout_ms: u32,
    /// Fix-quality poll cadence (~10/s keeps bus load down).
    pub fix_poll_interval_ms: u32,
    /// Charger settle time before watching the ready signal.
    pub charger_settle_ms: u32,
    /// Upper bound on the charger-ready wait.
    pub charge_timeout_ms: u32,
    pub charge_poll_interval_ms: u32,
    /// Extra hold beyond the ready threshold to bank transmit reserve.
    pub topup_duration_ms: u32,
    pub topup_poll_interval_ms: u32,
    pub gnss_output_mode: GnssOutputMode,
    pub dynamic_model: DynamicModel,
    pub calibration: VoltageCalibration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            transmit_interval_s: 600,
            low_voltage_threshold_v: 3.40,
            gnss_settle_ms: 1000,
            fix_timeout_ms: 120_000,
            fix_poll_interval_ms: 100,
            charger_settle_ms: 100,
            charge_timeout_ms: 60_000,
            charge_poll_interval_ms: 100,
            topup_duration_ms: 10_000,
            topup_poll_interval_ms: 100,
            gnss_output_mode: GnssOutputMode::Binary,
            dynamic_model: DynamicModel::Portable,
            calibration: VoltageCalibration::default(),
        }
    }
}

/// Volatile per-boot counters. `transmit_count` is the COUNT field of the
/// outbound message; its reset to zero across a restart is the tracker's
/// implicit reboot signal downstream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackerStats {
    pub transmit_count: u32,
    pub sends_ok: u32,
    pub sends_failed: u32,
    pub fixes_acquired: u32,
    pub fix_timeouts: u32,
    pub low_voltage_aborts: u32,
    pub charge_failures: u32,
    pub cycles_completed: u32,
}

/// The power-aware sequencing state machine.
///
/// Drives one acquisition/transmit/sleep cycle per interval, stepping
/// synchronously through [`CycleState`]s. Every state that draws battery
/// current re-samples [`PowerStatus`] and can short-circuit to Sleep, and
/// every bounded wait carries both a voltage-abort and a timeout; power
/// domains are always left known-off before the deep-sleep wait.
pub struct Tracker<P, G, B, M>
where
    P: Platform,
    G: GnssReceiver,
    B: BaroSensor,
    M: ModemTransport,
{
    platform: P,
    gnss: G,
    baro: B,
    modem: M,
    domains: PowerDomainController,
    voltage: VoltageMonitor,
    sleeper: SleepController,
    clock: Arc<IntervalClock>,
    config: TrackerConfig,
    state: CycleState,
    fix: FixRecord,
    environment: EnvironmentRecord,
    stats: TrackerStats,
    events: EventHistory,
}

impl<P, G, B, M> Tracker<P, G, B, M>
where
    P: Platform,
    G: GnssReceiver,
    B: BaroSensor,
    M: ModemTransport,
{
    pub fn new(
        mut platform: P,
        gnss: G,
        baro: B,
        modem: M,
        clock: Arc<IntervalClock>,
        config: TrackerConfig,
    ) -> Self {
        let domains = PowerDomainController::new(&mut platform);
        let voltage = VoltageMonitor::new(config.calibration);
        clock.set_interval_s(config.transmit_interval_s);

        Self {
            platform,
            gnss,
            baro,
            modem,
            domains,
            voltage,
            sleeper: SleepController::new(),
            clock,
            config,
            state: CycleState::Init,
            fix: FixRecord::default(),
            environment: EnvironmentRecord::default(),
            stats: TrackerStats::default(),
            events: EventHistory::new(),
        }
    }

    /// Performs the full work of the current state and returns (and
    /// stores) the next one.
    pub fn step(&mut self) -> CycleState {
        let current = self.state;
        let next = match current {
            CycleState::Init => self.state_init(),
            CycleState::StartGnss => self.state_start_gnss(),
            CycleState::ReadGnss => self.state_read_gnss(),
            CycleState::ReadPressure => self.state_read_pressure(),
            CycleState::StartCapacitorCharge => self.state_start_capacitor_charge(),
            CycleState::TopUpCapacitorCharge => self.state_top_up_capacitor_charge(),
            CycleState::StartTransmit => self.state_start_transmit(),
            CycleState::Sleep => self.state_sleep(),
            CycleState::Wake => self.state_wake(),
        };
        debug!(?current, ?next, "state transition");
        self.state = next;
        next
    }

    /// Steps until the machine is back at Init (one full cycle including
    /// the deep-sleep wait).
    pub fn run_cycle(&mut self) {
        for _ in 0..MAX_STEPS_PER_CYCLE {
            if self.step() == CycleState::Init {
                return;
            }
        }
        debug_assert!(false, "cycle exceeded {MAX_STEPS_PER_CYCLE} steps");
    }

    fn power_status(&mut self) -> PowerStatus {
        self.voltage
            .status(&mut self.platform, self.config.low_voltage_threshold_v)
    }

    fn record_event(&mut self, kind: EventKind, state: CycleState) {
        let now = self.platform.millis();
        self.events.record(kind, state, now);
    }

    /// The single low-voltage shortcut every drawing state composes in.
    fn abort_low_voltage(&mut self, state: CycleState) -> CycleState {
        warn!(?state, "bus voltage below threshold; aborting cycle");
        self.stats.low_voltage_aborts = self.stats.low_voltage_aborts.saturating_add(1);
        self.record_event(EventKind::LowVoltageAbort, state);
        CycleState::Sleep
    }

    fn state_init(&mut self) -> CycleState {
        let status = self.power_status();
        if status.low {
            return self.abort_low_voltage(CycleState::Init);
        }
        debug!(volts = status.volts, "battery ok, starting acquisition");
        CycleState::StartGnss
    }

    fn state_start_gnss(&mut self) -> CycleState {
        self.domains.enable(&mut self.platform, PowerDomain::Gnss);
        self.platform.delay_ms(self.config.gnss_settle_ms);

        let status = self.power_status();
        if status.low {
            self.domains.disable(&mut self.platform, PowerDomain::Gnss);
            return self.abort_low_voltage(CycleState::StartGnss);
        }

        if !self.gnss.begin() {
            warn!("GNSS receiver did not answer; substituting no-fix record");
            self.record_event(EventKind::GnssHandshakeFailed, CycleState::StartGnss);
            self.fix = FixRecord::default();
            self.domains.disable(&mut self.platform, PowerDomain::Gnss);
            return CycleState::ReadPressure;
        }

        // Both configuration calls are best-effort: a refusal degrades fix
        // latency, not correctness.
        if let Err(e) = self.gnss.set_output_mode(self.config.gnss_output_mode) {
            warn!(error = e, "GNSS output-mode configuration refused");
            self.record_event(EventKind::GnssConfigFailed, CycleState::StartGnss);
        }
        if let Err(e) = self.gnss.set_dynamic_model(self.config.dynamic_model) {
            warn!(error = e, "GNSS dynamic-model configuration refused");
            self.record_event(EventKind::GnssConfigFailed, CycleState::StartGnss);
        }

        CycleState::ReadGnss
    }

    fn state_read_gnss(&mut self) -> CycleState {
        let window = PollWindow {
            timeout_ms: self.config.fix_timeout_ms,
            poll_interval_ms: self.config.fix_poll_interval_ms,
        };
        let threshold = self.config.low_voltage_threshold_v;

        let outcome = {
            let Self {
                platform,
                gnss,
                voltage,
                ..
            } = self;
            poll_bounded(
                platform,
                window,
                |_p| gnss.fix_quality() == FixQuality::Fix3D,
                |p| voltage.status(p, threshold).low,
            )
        };

        // The GNSS domain goes off on every exit path from this state.
        match outcome {
            PollOutcome::Ready => {
                // Clock before position: capturing across a second
                // rollover must not pair the old timestamp with the new
                // position.
                let clock = self.gnss.read_clock();
                let position = self.gnss.read_position();
                self.fix = FixRecord::from_snapshots(clock, position);
                self.stats.fixes_acquired = self.stats.fixes_acquired.saturating_add(1);
                info!(
                    satellites = position.satellites,
                    pdop = position.pdop,
                    "3D fix acquired"
                );
                self.domains.disable(&mut self.platform, PowerDomain::Gnss);
                CycleState::ReadPressure
            }
            PollOutcome::TimedOut => {
                warn!("fix wait timed out; substituting no-fix record");
                self.record_event(EventKind::FixTimeout, CycleState::ReadGnss);
                self.stats.fix_timeouts = self.stats.fix_timeouts.saturating_add(1);
                self.fix = FixRecord::default();
                self.domains.disable(&mut self.platform, PowerDomain::Gnss);
                CycleState::ReadPressure
            }
            PollOutcome::Aborted => {
                self.domains.disable(&mut self.platform, PowerDomain::Gnss);
                self.abort_low_voltage(CycleState::ReadGnss)
            }
        }
    }

    fn state_read_pressure(&mut self) -> CycleState {
        // One retry covers transient bus glitches right after the GNSS
        // power-down.
        let ok = self.baro.begin() || self.baro.begin();
        if ok {
            let temperature_c = self.baro.temperature_c();
            let pressure_pa = self.baro.pressure_hpa() * 100.0;
            self.environment = EnvironmentRecord {
                pressure_pa,
                temperature_c,
            };
            debug!(pressure_pa, temperature_c, "environment sampled");
        } else {
            warn!("pressure sensor did not answer; substituting zero record");
            self.record_event(EventKind::SensorFailed, CycleState::ReadPressure);
            self.environment = EnvironmentRecord::default();
        }
        CycleState::StartCapacitorCharge
    }

    fn state_start_capacitor_charge(&mut self) -> CycleState {
        self.domains.enable(&mut self.platform, PowerDomain::Charger);
        self.platform.delay_ms(self.config.charger_settle_ms);

        let window = PollWindow {
            timeout_ms: self.config.charge_timeout_ms,
            poll_interval_ms: self.config.charge_poll_interval_ms,
        };
        let threshold = self.config.low_voltage_threshold_v;

        let outcome = {
            let Self {
                platform, voltage, ..
            } = self;
            poll_bounded(
                platform,
                window,
                |p| p.pin_read(Line::ChargerReady),
                |p| voltage.status(p, threshold).low,
            )
        };

        match outcome {
            PollOutcome::Ready => CycleState::TopUpCapacitorCharge,
            PollOutcome::TimedOut => {
                warn!("capacitor bank never reached ready; abandoning cycle");
                self.record_event(EventKind::ChargeTimeout, CycleState::StartCapacitorCharge);
                self.stats.charge_failures = self.stats.charge_failures.saturating_add(1);
                CycleState::Sleep
            }
            PollOutcome::Aborted => self.abort_low_voltage(CycleState::StartCapacitorCharge),
        }
    }

    fn state_top_up_capacitor_charge(&mut self) -> CycleState {
        // Hold window: "ready" here means the PGOOD signal was lost, and
        // the timeout means the full top-up duration was held.
        let window = PollWindow {
            timeout_ms: self.config.topup_duration_ms,
            poll_interval_ms: self.config.topup_poll_interval_ms,
        };
        let threshold = self.config.low_voltage_threshold_v;

        let outcome = {
            let Self {
                platform, voltage, ..
            } = self;
            poll_bounded(
                platform,
                window,
                |p| !p.pin_read(Line::ChargerReady),
                |p| voltage.status(p, threshold).low,
            )
        };

        match outcome {
            PollOutcome::TimedOut => CycleState::StartTransmit,
            PollOutcome::Ready => {
                warn!("charge ready signal lost during top-up; abandoning cycle");
                self.record_event(EventKind::ChargeLost, CycleState::TopUpCapacitorCharge);
                self.stats.charge_failures = self.stats.charge_failures.saturating_add(1);
                CycleState::Sleep
            }
            PollOutcome::Aborted => self.abort_low_voltage(CycleState::TopUpCapacitorCharge),
        }
    }

    fn state_start_transmit(&mut self) -> CycleState {
        self.domains.enable(&mut self.platform, PowerDomain::Modem);

        if let Err(e) = self.modem.begin() {
            warn!(error = %e, "modem session init failed; abandoning transmit");
            self.record_event(EventKind::ModemInitFailed, CycleState::StartTransmit);
            return CycleState::Sleep;
        }

        let status = self.power_status();
        let send_result = match format_report(
            &self.fix,
            &self.environment,
            status.volts,
            self.stats.transmit_count,
        ) {
            Ok(report) => {
                info!(report = report.as_str(), "transmitting status message");
                let threshold = self.config.low_voltage_threshold_v;
                let Self {
                    platform,
                    modem,
                    voltage,
                    ..
                } = self;
                let mut keep_going = || !voltage.status(platform, threshold).low;
                modem.send_text(report.as_str(), &mut keep_going)
            }
            Err(e) => {
                warn!(error = %e, "report formatting failed");
                Err(crate::hal::ModemError::BufferError)
            }
        };

        match send_result {
            Ok(()) => {
                info!("send complete");
                self.stats.sends_ok = self.stats.sends_ok.saturating_add(1);
                self.flash_success();
            }
            Err(e) => {
                warn!(error = %e, "send failed");
                self.record_event(EventKind::SendFailed, CycleState::StartTransmit);
                self.stats.sends_failed = self.stats.sends_failed.saturating_add(1);
                self.indicate_failure();
            }
        }

        // Cleanup is best-effort: the cycle must reach the low-power wait
        // even if the modem misbehaves here.
        if let Err(e) = self.modem.clear_outbound_buffer() {
            warn!(error = %e, "outbound buffer clear failed");
            self.record_event(EventKind::ModemCleanupFailed, CycleState::StartTransmit);
        }
        if let Err(e) = self.modem.sleep() {
            warn!(error = %e, "modem sleep refused");
            self.record_event(EventKind::ModemCleanupFailed, CycleState::StartTransmit);
        }

        self.stats.transmit_count = self.stats.transmit_count.wrapping_add(1);
        CycleState::Sleep
    }

    fn state_sleep(&mut self) -> CycleState {
        // Idempotent: safe even when a domain was never enabled this
        // cycle, or a shortcut skipped its disable.
        self.domains.disable_all(&mut self.platform);
        debug_assert!(
            !self.domains.any_enabled(),
            "all power domains must be off before deep sleep"
        );

        self.platform.configure_low_power_io();
        info!(
            interval_s = self.clock.interval_s(),
            "entering deep sleep until next interval"
        );

        let clock = Arc::clone(&self.clock);
        self.sleeper.sleep_until_interval(&mut self.platform, &clock);
        CycleState::Wake
    }

    fn state_wake(&mut self) -> CycleState {
        self.platform.configure_active_io();
        self.stats.cycles_completed = self.stats.cycles_completed.saturating_add(1);
        debug!("wake complete; restarting cycle");
        CycleState::Init
    }

    // Three short blinks: message accepted by the satellite network.
    fn flash_success(&mut self) {
        for _ in 0..3 {
            self.platform.pin_write(Line::StatusLed, true);
            self.platform.delay_ms(100);
            self.platform.pin_write(Line::StatusLed, false);
            self.platform.delay_ms(100);
        }
    }

    // One long pulse: transmit failed this cycle.
    fn indicate_failure(&mut self) {
        self.platform.pin_write(Line::StatusLed, true);
        self.platform.delay_ms(1000);
        self.platform.pin_write(Line::StatusLed, false);
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn fix(&self) -> &FixRecord {
        &self.fix
    }

    pub fn environment(&self) -> &EnvironmentRecord {
        &self.environment
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    pub fn events(&self) -> &EventHistory {
        &self.events
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn interval_clock(&self) -> Arc<IntervalClock> {
        Arc::clone(&self.clock)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn modem(&self) -> &M {
        &self.modem
    }

    pub fn gnss(&self) -> &G {
        &self.gnss
    }

    pub fn baro(&self) -> &B {
        &self.baro
    }
}
