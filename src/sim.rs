//! Scripted hardware backends for tests and the demo binary.
//!
//! The simulated platform keeps a virtual millisecond clock that advances
//! through `delay_ms` and `deep_sleep`, logs every pin transition with a
//! timestamp, and derives the charger-ready signal and the battery-bus ADC
//! counts from scriptable parameters. Each non-spurious deep-sleep wake
//! ticks the shared [`IntervalClock`] once, standing in for the 1 Hz
//! hardware tick.

use crate::hal::{
    BaroSensor, DynamicModel, FixQuality, GnssClock, GnssOutputMode, GnssPosition, GnssReceiver,
    Line, ModemError, ModemTransport, PinMode, Platform,
};
use crate::interval::IntervalClock;
use crate::power::VoltageCalibration;
use std::sync::Arc;

const LINE_COUNT: usize = 7;

fn line_index(line: Line) -> usize {
    match line {
        Line::GnssPower => 0,
        Line::ModemPower => 1,
        Line::ChargerEnable => 2,
        Line::ChargerReady => 3,
        Line::VbatSense => 4,
        Line::VbatMeasureEnable => 5,
        Line::StatusLed => 6,
    }
}

/// One logged pin transition.
#[derive(Debug, Clone, Copy)]
pub struct PinEvent {
    pub at_ms: u32,
    pub line: Line,
    pub high: bool,
}

/// Simulated platform with a scripted battery and charger.
pub struct SimPlatform {
    clock: Arc<IntervalClock>,
    now_ms: u32,
    levels: [bool; LINE_COUNT],
    modes: [PinMode; LINE_COUNT],
    pin_log: Vec<PinEvent>,
    /// Battery-bus voltage schedule: `(from_ms, volts)`, sorted by time.
    vbat_schedule: Vec<(u32, f32)>,
    calibration: VoltageCalibration,
    /// Charger PGOOD asserts this long after the charger is enabled.
    /// `None` means the bank never reaches ready.
    pub charger_ready_after_ms: Option<u32>,
    /// PGOOD drops again this long after enable (scripted brownout).
    pub charger_lost_after_ms: Option<u32>,
    charger_enabled_at: Option<u32>,
    /// Wakes that fire without an interval tick before real ticks resume.
    pub spurious_wakes: u32,
    pub deep_sleeps: u32,
    pub low_power_io_entries: u32,
    pub active_io_entries: u32,
}

impl SimPlatform {
    pub fn new(clock: Arc<IntervalClock>) -> Self {
        Self {
            clock,
            now_ms: 0,
            levels: [false; LINE_COUNT],
            modes: [PinMode::InputFloating; LINE_COUNT],
            pin_log: Vec::new(),
            vbat_schedule: vec![(0, 4.05)],
            calibration: VoltageCalibration::default(),
            charger_ready_after_ms: Some(2_000),
            charger_lost_after_ms: None,
            charger_enabled_at: None,
            spurious_wakes: 0,
            deep_sleeps: 0,
            low_power_io_entries: 0,
            active_io_entries: 0,
        }
    }

    /// Replaces the whole voltage schedule with a constant.
    pub fn set_vbat(&mut self, volts: f32) {
        self.vbat_schedule = vec![(0, volts)];
    }

    /// Scripts a voltage step at a future point on the virtual clock.
    pub fn schedule_vbat(&mut self, from_ms: u32, volts: f32) {
        self.vbat_schedule.push((from_ms, volts));
        self.vbat_schedule.sort_by_key(|&(t, _)| t);
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    pub fn pin_log(&self) -> &[PinEvent] {
        &self.pin_log
    }

    pub fn level(&self, line: Line) -> bool {
        self.levels[line_index(line)]
    }

    pub fn mode(&self, line: Line) -> PinMode {
        self.modes[line_index(line)]
    }

    fn vbat_now(&self) -> f32 {
        let now = self.now_ms;
        self.vbat_schedule
            .iter()
            .rev()
            .find(|&&(t, _)| t <= now)
            .map_or(0.0, |&(_, v)| v)
    }

    fn charger_ready_now(&self) -> bool {
        let Some(enabled_at) = self.charger_enabled_at else {
            return false;
        };
        let held_ms = self.now_ms.wrapping_sub(enabled_at);
        let reached = self
            .charger_ready_after_ms
            .is_some_and(|t| held_ms >= t);
        let lost = self.charger_lost_after_ms.is_some_and(|t| held_ms >= t);
        reached && !lost
    }
}

impl Platform for SimPlatform {
    fn pin_mode(&mut self, line: Line, mode: PinMode) {
        self.modes[line_index(line)] = mode;
    }

    fn pin_write(&mut self, line: Line, high: bool) {
        if self.levels[line_index(line)] != high {
            self.pin_log.push(PinEvent {
                at_ms: self.now_ms,
                line,
                high,
            });
        }
        self.levels[line_index(line)] = high;

        if line == Line::ChargerEnable {
            self.charger_enabled_at = if high { Some(self.now_ms) } else { None };
        }
    }

    fn pin_read(&mut self, line: Line) -> bool {
        match line {
            Line::ChargerReady => self.charger_ready_now(),
            other => self.levels[line_index(other)],
        }
    }

    fn analog_read(&mut self, line: Line) -> u16 {
        if line != Line::VbatSense {
            return 0;
        }
        let cal = &self.calibration;
        let volts_per_count = cal.reference_v / 4096.0 * cal.divider_ratio * cal.correction;
        let counts = self.vbat_now() / volts_per_count;
        counts.clamp(0.0, 4095.0) as u16
    }

    fn millis(&mut self) -> u32 {
        self.now_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    fn configure_low_power_io(&mut self) {
        self.low_power_io_entries += 1;
    }

    fn deep_sleep(&mut self) {
        self.deep_sleeps += 1;
        if self.spurious_wakes > 0 {
            // A wake event with no interval tick behind it.
            self.spurious_wakes -= 1;
            self.now_ms = self.now_ms.wrapping_add(10);
        } else {
            self.now_ms = self.now_ms.wrapping_add(1_000);
            self.clock.tick();
        }
    }

    fn configure_active_io(&mut self) {
        self.active_io_entries += 1;
    }
}

/// Simulated GNSS receiver.
pub struct SimGnss {
    pub begin_ok: bool,
    pub output_mode_result: Result<(), &'static str>,
    pub dynamic_model_result: Result<(), &'static str>,
    /// `fix_quality` reports 3D after this many polls; `None` never does.
    pub fix_after_polls: Option<u32>,
    pub clock: GnssClock,
    pub position: GnssPosition,
    pub begin_calls: u32,
    pub quality_polls: u32,
    pub configured_mode: Option<GnssOutputMode>,
    pub configured_model: Option<DynamicModel>,
}

impl SimGnss {
    pub fn new() -> Self {
        Self {
            begin_ok: true,
            output_mode_result: Ok(()),
            dynamic_model_result: Ok(()),
            fix_after_polls: Some(3),
            clock: GnssClock {
                year: 2020,
                month: 12,
                day: 15,
                hour: 9,
                minute: 30,
                second: 0,
                millisecond: 0,
            },
            position: GnssPosition {
                latitude_deg: 51.123_456,
                longitude_deg: -1.234_567,
                altitude_m: 123,
                speed_mps: 1.50,
                course_deg: 90,
                satellites: 8,
                pdop: 2,
            },
            begin_calls: 0,
            quality_polls: 0,
            configured_mode: None,
            configured_model: None,
        }
    }
}

impl Default for SimGnss {
    fn default() -> Self {
        Self::new()
    }
}

impl GnssReceiver for SimGnss {
    fn begin(&mut self) -> bool {
        self.begin_calls += 1;
        self.begin_ok
    }

    fn set_output_mode(&mut self, mode: GnssOutputMode) -> Result<(), &'static str> {
        self.configured_mode = Some(mode);
        self.output_mode_result
    }

    fn set_dynamic_model(&mut self, model: DynamicModel) -> Result<(), &'static str> {
        self.configured_model = Some(model);
        self.dynamic_model_result
    }

    fn fix_quality(&mut self) -> FixQuality {
        self.quality_polls += 1;
        match self.fix_after_polls {
            Some(n) if self.quality_polls >= n => FixQuality::Fix3D,
            _ => FixQuality::Fix2D,
        }
    }

    fn read_clock(&mut self) -> GnssClock {
        self.clock
    }

    fn read_position(&mut self) -> GnssPosition {
        self.position
    }
}

/// Simulated barometric sensor.
pub struct SimBaro {
    /// Number of initial `begin` calls that fail before one succeeds.
    pub begin_failures: u32,
    pub temperature_c: f32,
    pub pressure_hpa: f32,
    pub begin_calls: u32,
}

impl SimBaro {
    pub fn new() -> Self {
        Self {
            begin_failures: 0,
            temperature_c: 15.5,
            pressure_hpa: 1013.0,
            begin_calls: 0,
        }
    }
}

impl Default for SimBaro {
    fn default() -> Self {
        Self::new()
    }
}

impl BaroSensor for SimBaro {
    fn begin(&mut self) -> bool {
        self.begin_calls += 1;
        self.begin_calls > self.begin_failures
    }

    fn temperature_c(&mut self) -> f32 {
        self.temperature_c
    }

    fn pressure_hpa(&mut self) -> f32 {
        self.pressure_hpa
    }
}

/// Simulated satellite modem.
pub struct SimModem {
    pub begin_result: Result<(), ModemError>,
    pub send_result: Result<(), ModemError>,
    pub clear_result: Result<(), ModemError>,
    pub sleep_result: Result<(), ModemError>,
    /// How many times a blocking send polls the supervisor callback.
    pub callback_polls_per_send: u32,
    pub sent: Vec<String>,
    pub send_attempts: u32,
    pub begin_calls: u32,
    pub buffer_clears: u32,
    pub sleeps: u32,
}

impl SimModem {
    pub fn new() -> Self {
        Self {
            begin_result: Ok(()),
            send_result: Ok(()),
            clear_result: Ok(()),
            sleep_result: Ok(()),
            callback_polls_per_send: 3,
            sent: Vec::new(),
            send_attempts: 0,
            begin_calls: 0,
            buffer_clears: 0,
            sleeps: 0,
        }
    }
}

impl Default for SimModem {
    fn default() -> Self {
        Self::new()
    }
}

impl ModemTransport for SimModem {
    fn begin(&mut self) -> Result<(), ModemError> {
        self.begin_calls += 1;
        self.begin_result
    }

    fn send_text(
        &mut self,
        message: &str,
        keep_going: &mut dyn FnMut() -> bool,
    ) -> Result<(), ModemError> {
        self.send_attempts += 1;
        for _ in 0..self.callback_polls_per_send {
            if !keep_going() {
                return Err(ModemError::Aborted);
            }
        }
        self.send_result?;
        self.sent.push(message.to_owned());
        Ok(())
    }

    fn clear_outbound_buffer(&mut self) -> Result<(), ModemError> {
        self.buffer_clears += 1;
        self.clear_result
    }

    fn sleep(&mut self) -> Result<(), ModemError> {
        self.sleeps += 1;
        self.sleep_result
    }
}
