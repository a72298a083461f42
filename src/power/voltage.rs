use crate::hal::{Line, PinMode, Platform};
use serde::{Deserialize, Serialize};

const ADC_FULL_SCALE: f32 = 4096.0;

/// Calibration constants for the battery divider chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoltageCalibration {
    /// ADC reference voltage, volts.
    pub reference_v: f32,
    /// Divider ratio bringing the bus voltage into ADC range.
    pub divider_ratio: f32,
    /// Empirical correction for divider tolerance, measured per board lot.
    pub correction: f32,
    /// Divider settle time after raising the measurement-enable line.
    pub settle_ms: u32,
}

impl Default for VoltageCalibration {
    fn default() -> Self {
        Self {
            reference_v: 3.3,
            divider_ratio: 4.30,
            correction: 1.019,
            settle_ms: 1,
        }
    }
}

/// Battery bus voltage snapshot with the derived low-voltage flag.
///
/// Recomputed on demand before and during every power-drawing action;
/// never cached across states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerStatus {
    pub volts: f32,
    pub low: bool,
}

/// On-demand battery bus voltage reader.
///
/// A read transiently enables the divider through `VbatMeasureEnable`,
/// waits for it to settle, samples, and drops the line again. Cheap enough
/// to call every iteration of the bounded wait loops.
#[derive(Debug, Clone, Copy)]
pub struct VoltageMonitor {
    calibration: VoltageCalibration,
}

impl VoltageMonitor {
    pub fn new(calibration: VoltageCalibration) -> Self {
        Self { calibration }
    }

    pub fn read<P: Platform>(&self, platform: &mut P) -> f32 {
        let cal = &self.calibration;
        platform.pin_mode(Line::VbatMeasureEnable, PinMode::Output);
        platform.pin_write(Line::VbatMeasureEnable, true);
        platform.delay_ms(cal.settle_ms);
        let raw = platform.analog_read(Line::VbatSense);
        platform.pin_write(Line::VbatMeasureEnable, false);

        f32::from(raw) * cal.reference_v / ADC_FULL_SCALE * cal.divider_ratio * cal.correction
    }

    pub fn status<P: Platform>(&self, platform: &mut P, low_threshold_v: f32) -> PowerStatus {
        let volts = self.read(platform);
        PowerStatus {
            volts,
            low: volts < low_threshold_v,
        }
    }
}
