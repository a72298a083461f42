//! Runs the tracker state machine against the scripted hardware backends
//! and logs every cycle, standing in for a bench test of real hardware.

use skybeacon::interval::IntervalClock;
use skybeacon::sim::{SimBaro, SimGnss, SimModem, SimPlatform};
use skybeacon::tracker::{Tracker, TrackerConfig};
use std::sync::Arc;
use tracing::info;

const CYCLES: u32 = 5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = TrackerConfig {
        // Bench timings: short enough to watch, long enough to exercise
        // the settle/poll paths.
        transmit_interval_s: 30,
        gnss_settle_ms: 200,
        fix_timeout_ms: 10_000,
        charge_timeout_ms: 10_000,
        topup_duration_ms: 1_000,
        ..TrackerConfig::default()
    };

    let clock = Arc::new(IntervalClock::new(config.transmit_interval_s));
    let mut platform = SimPlatform::new(Arc::clone(&clock));
    // Let the battery sag a little over the run, staying above threshold.
    platform.schedule_vbat(120_000, 3.92);

    let mut tracker = Tracker::new(
        platform,
        SimGnss::new(),
        SimBaro::new(),
        SimModem::new(),
        clock,
        config,
    );

    for cycle in 1..=CYCLES {
        tracker.run_cycle();
        if let Some(report) = tracker.modem().sent.last() {
            info!(cycle, report = report.as_str(), "cycle complete");
        } else {
            info!(cycle, "cycle complete without transmission");
        }
    }

    println!("{}", serde_json::to_string_pretty(tracker.stats())?);
    Ok(())
}
