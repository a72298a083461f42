//! Hardware collaborator contracts consumed by the sequencer.
//!
//! The tracker core never talks to registers or buses directly; it drives
//! these traits. Production firmware implements them on top of the target
//! HAL, while [`crate::sim`] provides scripted implementations for tests
//! and the demo binary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical pin lines owned by the sequencer.
///
/// The mapping to physical pins is the platform implementation's concern;
/// the core only names the signals it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Line {
    /// GNSS receiver power-domain enable.
    GnssPower,
    /// Satellite-modem power-domain enable.
    ModemPower,
    /// Capacitor-bank charger enable.
    ChargerEnable,
    /// Charger PGOOD input: high once the bank holds usable charge.
    ChargerReady,
    /// Analog battery-bus sense input (behind a divider).
    VbatSense,
    /// Measurement-enable line for the battery divider.
    VbatMeasureEnable,
    /// Status indicator LED.
    StatusLed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinMode {
    /// Push-pull output.
    Output,
    /// High-impedance input, used to park disabled enable lines so the
    /// pin does not leak through downstream pull networks.
    InputFloating,
}

/// Platform primitives: digital/analog I/O, the millisecond clock, bounded
/// delay, and the deep-sleep entry points.
pub trait Platform {
    fn pin_mode(&mut self, line: Line, mode: PinMode);
    fn pin_write(&mut self, line: Line, high: bool);
    fn pin_read(&mut self, line: Line) -> bool;

    /// 12-bit ADC sample of an analog line (0..=4095).
    fn analog_read(&mut self, line: Line) -> u16;

    /// Milliseconds since boot. Wraps at `u32::MAX`.
    fn millis(&mut self) -> u32;
    fn delay_ms(&mut self, ms: u32);

    /// Route non-essential I/O for minimum leakage before deep sleep.
    fn configure_low_power_io(&mut self);

    /// Block in the lowest-power wait state until any wake event fires.
    /// May return spuriously; the caller re-checks its wake condition.
    fn deep_sleep(&mut self);

    /// Restore active-mode clocking and I/O routing after wake.
    fn configure_active_io(&mut self);
}

/// GNSS position-solution quality as reported by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FixQuality {
    NoFix,
    Fix2D,
    Fix3D,
}

/// Receiver output framing requested after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GnssOutputMode {
    /// Binary-only output; suppresses NMEA chatter on the bus.
    Binary,
    Nmea,
}

/// Receiver motion profile. Tunes the receiver's internal filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicModel {
    Portable,
    Stationary,
    HighAltitude,
}

/// UTC clock snapshot from the receiver.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GnssClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

/// Position/velocity/quality snapshot from the receiver.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GnssPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: i32,
    pub speed_mps: f32,
    pub course_deg: i32,
    pub satellites: u8,
    pub pdop: u16,
}

/// GNSS receiver driver contract.
pub trait GnssReceiver {
    /// Handshake with the receiver. `false` means it never answered.
    fn begin(&mut self) -> bool;

    /// Best-effort output-mode configuration.
    fn set_output_mode(&mut self, mode: GnssOutputMode) -> Result<(), &'static str>;

    /// Best-effort motion-profile configuration.
    fn set_dynamic_model(&mut self, model: DynamicModel) -> Result<(), &'static str>;

    fn fix_quality(&mut self) -> FixQuality;

    /// Read the UTC clock. Callers that also read the position must read
    /// the clock first to minimize second-rollover skew between the two.
    fn read_clock(&mut self) -> GnssClock;

    fn read_position(&mut self) -> GnssPosition;
}

/// Barometric pressure/temperature sensor contract.
pub trait BaroSensor {
    fn begin(&mut self) -> bool;
    fn temperature_c(&mut self) -> f32;
    fn pressure_hpa(&mut self) -> f32;
}

/// Satellite-modem transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModemError {
    #[error("modem did not respond to session init")]
    NoResponse,
    #[error("send aborted by supervisor callback")]
    Aborted,
    #[error("transmit failed")]
    TxFailed,
    #[error("outbound buffer operation failed")]
    BufferError,
    #[error("modem refused sleep command")]
    SleepRefused,
}

/// Satellite-modem transport contract.
///
/// `send_text` blocks for the duration of the transmit attempt and polls
/// `keep_going` periodically; the send is abandoned with
/// [`ModemError::Aborted`] as soon as the callback returns `false`.
pub trait ModemTransport {
    fn begin(&mut self) -> Result<(), ModemError>;

    fn send_text(
        &mut self,
        message: &str,
        keep_going: &mut dyn FnMut() -> bool,
    ) -> Result<(), ModemError>;

    fn clear_outbound_buffer(&mut self) -> Result<(), ModemError>;

    fn sleep(&mut self) -> Result<(), ModemError>;
}
