use crate::hal::{GnssClock, GnssPosition};
use arrayvec::ArrayString;
use core::fmt::Write;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum outbound report size. The fixed layout stays well under this
/// even with pathological field values.
pub const MAX_REPORT_SIZE: usize = 160;

pub type ReportBuffer = ArrayString<MAX_REPORT_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("report exceeds outbound buffer capacity")]
    BufferOverflow,
}

/// One position-fix snapshot.
///
/// Either every field holds a genuine 3D-fix snapshot, or every field
/// holds the no-fix sentinel set (epoch date, zero position) produced by
/// [`FixRecord::default`]. Overwritten at most once per cycle; never
/// partially updated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixRecord {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: i32,
    pub speed_mps: f32,
    pub course_deg: i32,
    pub satellites: u8,
    pub pdop: u16,
}

impl Default for FixRecord {
    /// The documented no-fix sentinel set: epoch date, zero position.
    fn default() -> Self {
        Self {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_m: 0,
            speed_mps: 0.0,
            course_deg: 0,
            satellites: 0,
            pdop: 0,
        }
    }
}

impl FixRecord {
    /// Assembles a record from the two receiver snapshots. The clock must
    /// have been read before the position (second-rollover skew).
    pub fn from_snapshots(clock: GnssClock, position: GnssPosition) -> Self {
        Self {
            year: clock.year,
            month: clock.month,
            day: clock.day,
            hour: clock.hour,
            minute: clock.minute,
            second: clock.second,
            millisecond: clock.millisecond,
            latitude_deg: position.latitude_deg,
            longitude_deg: position.longitude_deg,
            altitude_m: position.altitude_m,
            speed_mps: position.speed_mps,
            course_deg: position.course_deg,
            satellites: position.satellites,
            pdop: position.pdop,
        }
    }
}

/// Barometric sensor snapshot. Zeroed on sensor failure.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub pressure_pa: f32,
    pub temperature_c: f32,
}

/// Formats the outbound status message:
///
/// `YYYYMMDDHHMMSS,LAT,LON,ALT,SPEED,COURSE,PDOP,SATS,PRESSURE,TEMP,VBAT,COUNT`
///
/// Timestamp is 14 zero-padded UTC digits; lat/lon carry 6 decimals,
/// altitude/speed/VBAT 2, temperature 1, pressure none; course, PDOP,
/// satellite count and the cycle counter are plain integers.
pub fn format_report(
    fix: &FixRecord,
    environment: &EnvironmentRecord,
    battery_v: f32,
    cycle_count: u32,
) -> Result<ReportBuffer, ReportError> {
    let mut buffer = ReportBuffer::new();
    write!(
        buffer,
        "{:04}{:02}{:02}{:02}{:02}{:02},{:.6},{:.6},{:.2},{:.2},{},{},{},{:.0},{:.1},{:.2},{}",
        fix.year,
        fix.month,
        fix.day,
        fix.hour,
        fix.minute,
        fix.second,
        fix.latitude_deg,
        fix.longitude_deg,
        f64::from(fix.altitude_m),
        fix.speed_mps,
        fix.course_deg,
        fix.pdop,
        fix.satellites,
        environment.pressure_pa,
        environment.temperature_c,
        battery_v,
        cycle_count,
    )
    .map_err(|_| ReportError::BufferOverflow)?;
    Ok(buffer)
}
