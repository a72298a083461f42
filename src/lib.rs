//! # Skybeacon Tracker Core
//!
//! The power-aware sequencing core of a battery-powered GNSS +
//! satellite-messaging tracker: once per interval it acquires a position
//! fix, samples pressure/temperature and battery voltage, charges a
//! capacitor bank, transmits a compact status message over the satellite
//! link, and deep-sleeps until the next interval.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use skybeacon::interval::IntervalClock;
//! use skybeacon::sim::{SimBaro, SimGnss, SimModem, SimPlatform};
//! use skybeacon::tracker::{Tracker, TrackerConfig};
//!
//! let clock = Arc::new(IntervalClock::new(60));
//! let platform = SimPlatform::new(Arc::clone(&clock));
//! let mut tracker = Tracker::new(
//!     platform,
//!     SimGnss::new(),
//!     SimBaro::new(),
//!     SimModem::new(),
//!     clock,
//!     TrackerConfig::default(),
//! );
//!
//! tracker.run_cycle();
//! assert_eq!(tracker.stats().transmit_count, 1);
//! ```
//!
//! ## Architecture
//!
//! - [`tracker`] - the step-driven cycle state machine (the core)
//! - [`hal`] - collaborator contracts for GNSS, baro, modem, platform
//! - [`power`] - power-domain switching and voltage monitoring
//! - [`interval`] / [`sleep`] - 1 Hz interval latch and deep-sleep wait
//! - [`poll`] - the shared bounded-wait primitive
//! - [`report`] - fix/environment records and message formatting
//! - [`events`] - volatile per-boot cycle-event history
//! - [`sim`] - scripted hardware backends for tests and the demo binary

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod events;
pub mod hal;
pub mod interval;
pub mod poll;
pub mod power;
pub mod report;
pub mod sim;
pub mod sleep;
pub mod tracker;

// Re-export main public types for convenience
pub use report::{EnvironmentRecord, FixRecord};
pub use tracker::{CycleState, Tracker, TrackerConfig, TrackerStats};
