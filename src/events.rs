use crate::tracker::CycleState;
use heapless::Vec;
use serde::{Deserialize, Serialize};

const MAX_EVENT_HISTORY: usize = 32;

/// Notable outcomes recorded while sequencing a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    LowVoltageAbort,
    GnssHandshakeFailed,
    GnssConfigFailed,
    FixTimeout,
    SensorFailed,
    ChargeTimeout,
    ChargeLost,
    ModemInitFailed,
    SendFailed,
    ModemCleanupFailed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CycleEvent {
    pub kind: EventKind,
    pub state: CycleState,
    pub at_ms: u32,
}

/// Volatile ring buffer of per-boot cycle events.
///
/// Diagnostic only: recording an event never changes control flow, and the
/// history resets with the rest of RAM on power-on.
#[derive(Debug, Default)]
pub struct EventHistory {
    events: Vec<CycleEvent, MAX_EVENT_HISTORY>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, kind: EventKind, state: CycleState, at_ms: u32) {
        if self.events.is_full() {
            self.events.remove(0);
        }
        let _ = self.events.push(CycleEvent { kind, state, at_ms });
    }

    pub fn events(&self) -> &[CycleEvent] {
        &self.events
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
