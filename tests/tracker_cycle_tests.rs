use skybeacon::hal::{Line, ModemError};
use skybeacon::interval::IntervalClock;
use skybeacon::sim::{SimBaro, SimGnss, SimModem, SimPlatform};
use skybeacon::tracker::{CycleState, Tracker, TrackerConfig};
use std::sync::Arc;

type SimTracker = Tracker<SimPlatform, SimGnss, SimBaro, SimModem>;

/// Timings shrunk so a full cycle runs in a handful of virtual seconds.
fn test_config() -> TrackerConfig {
    TrackerConfig {
        transmit_interval_s: 5,
        gnss_settle_ms: 100,
        fix_timeout_ms: 5_000,
        fix_poll_interval_ms: 100,
        charger_settle_ms: 50,
        charge_timeout_ms: 5_000,
        charge_poll_interval_ms: 100,
        topup_duration_ms: 500,
        topup_poll_interval_ms: 100,
        ..TrackerConfig::default()
    }
}

fn build_tracker(
    configure: impl FnOnce(&mut SimPlatform, &mut SimGnss, &mut SimBaro, &mut SimModem),
) -> SimTracker {
    let config = test_config();
    let clock = Arc::new(IntervalClock::new(config.transmit_interval_s));
    let mut platform = SimPlatform::new(Arc::clone(&clock));
    let mut gnss = SimGnss::new();
    let mut baro = SimBaro::new();
    let mut modem = SimModem::new();
    configure(&mut platform, &mut gnss, &mut baro, &mut modem);
    Tracker::new(platform, gnss, baro, modem, clock, config)
}

fn drive_to_init(tracker: &mut SimTracker) -> Vec<CycleState> {
    let mut visited = Vec::new();
    for _ in 0..16 {
        let next = tracker.step();
        visited.push(next);
        if next == CycleState::Init {
            return visited;
        }
    }
    panic!("state machine did not return to Init: {visited:?}");
}

#[test]
fn test_happy_path_state_sequence() {
    let mut tracker = build_tracker(|_, _, _, _| {});
    let visited = drive_to_init(&mut tracker);
    assert_eq!(
        visited,
        vec![
            CycleState::StartGnss,
            CycleState::ReadGnss,
            CycleState::ReadPressure,
            CycleState::StartCapacitorCharge,
            CycleState::TopUpCapacitorCharge,
            CycleState::StartTransmit,
            CycleState::Sleep,
            CycleState::Wake,
            CycleState::Init,
        ]
    );

    let stats = tracker.stats();
    assert_eq!(stats.transmit_count, 1);
    assert_eq!(stats.sends_ok, 1);
    assert_eq!(stats.sends_failed, 0);
    assert_eq!(stats.fixes_acquired, 1);
    assert_eq!(stats.cycles_completed, 1);
}

#[test]
fn test_happy_path_message_content() {
    let mut tracker = build_tracker(|_, _, _, _| {});
    tracker.run_cycle();

    let sent = &tracker.modem().sent;
    assert_eq!(sent.len(), 1);
    // Sim defaults: the reference fix, 1013.0 hPa / 15.5 C, a 4.05 V
    // battery, and a zero cycle counter on the first transmission.
    assert_eq!(
        sent[0],
        "20201215093000,51.123456,-1.234567,123.00,1.50,90,2,8,101300,15.5,4.05,0"
    );
}

#[test]
fn test_low_voltage_at_init_goes_straight_to_sleep() {
    let mut tracker = build_tracker(|platform, _, _, _| {
        platform.set_vbat(3.20);
    });

    assert_eq!(tracker.step(), CycleState::Sleep);
    let visited = drive_to_init(&mut tracker);
    assert_eq!(visited, vec![CycleState::Wake, CycleState::Init]);

    assert_eq!(tracker.stats().low_voltage_aborts, 1);
    assert_eq!(tracker.stats().transmit_count, 0);
    // No peripheral domain was ever powered.
    assert!(tracker
        .platform()
        .pin_log()
        .iter()
        .all(|e| !matches!(e.line, Line::GnssPower | Line::ModemPower | Line::ChargerEnable)));
}

#[test]
fn test_gnss_handshake_failure_substitutes_defaults_and_continues() {
    let mut tracker = build_tracker(|_, gnss, _, _| {
        gnss.begin_ok = false;
    });

    assert_eq!(tracker.step(), CycleState::StartGnss);
    assert_eq!(tracker.step(), CycleState::ReadPressure);

    let fix = tracker.fix();
    assert_eq!(fix.year, 1970);
    assert_eq!(fix.latitude_deg, 0.0);
    assert_eq!(fix.satellites, 0);
    assert!(!tracker.platform().level(Line::GnssPower));

    // The cycle still charges and transmits the sentinel record.
    drive_to_init(&mut tracker);
    assert_eq!(tracker.stats().transmit_count, 1);
    let sent = &tracker.modem().sent;
    assert!(sent[0].starts_with("19700101000000,0.000000,0.000000,0.00,0.00,0,0,0,"));
    assert!(sent[0].contains(",101300,15.5,"));
}

#[test]
fn test_fix_timeout_substitutes_defaults() {
    let mut tracker = build_tracker(|_, gnss, _, _| {
        gnss.fix_after_polls = None;
    });

    tracker.step();
    tracker.step();
    let start_ms = tracker.platform().now_ms();
    assert_eq!(tracker.step(), CycleState::ReadPressure);
    let elapsed = tracker.platform().now_ms() - start_ms;

    // The wait must run the full window, but exit within one poll
    // interval (plus measurement settle overhead) of the deadline.
    assert!(elapsed >= 5_000, "exited early at {elapsed} ms");
    assert!(elapsed < 5_300, "exited late at {elapsed} ms");

    assert_eq!(tracker.stats().fix_timeouts, 1);
    assert_eq!(tracker.fix().year, 1970);
    assert!(!tracker.platform().level(Line::GnssPower));
}

#[test]
fn test_voltage_drop_during_fix_wait_aborts_to_sleep() {
    let mut tracker = build_tracker(|platform, gnss, _, _| {
        gnss.fix_after_polls = None;
        platform.schedule_vbat(500, 3.00);
    });

    tracker.step();
    tracker.step();
    assert_eq!(tracker.step(), CycleState::Sleep);

    // Terminated well before the fix timeout, with the domain off.
    assert!(tracker.platform().now_ms() < 1_500);
    assert!(!tracker.platform().level(Line::GnssPower));
    assert_eq!(tracker.stats().low_voltage_aborts, 1);
    assert!(tracker.modem().sent.is_empty());
}

#[test]
fn test_gnss_config_refusal_is_best_effort() {
    let mut tracker = build_tracker(|_, gnss, _, _| {
        gnss.output_mode_result = Err("refused");
    });

    tracker.run_cycle();
    // Control flow unchanged: the cycle still fixed and transmitted.
    assert_eq!(tracker.stats().transmit_count, 1);
    assert_eq!(tracker.stats().fixes_acquired, 1);
    assert!(tracker.gnss().configured_model.is_some());
}

#[test]
fn test_pressure_sensor_retry_recovers() {
    let mut tracker = build_tracker(|_, _, baro, _| {
        baro.begin_failures = 1;
    });

    tracker.run_cycle();
    assert_eq!(tracker.baro().begin_calls, 2);
    assert_eq!(tracker.environment().pressure_pa, 101_300.0);
    assert_eq!(tracker.environment().temperature_c, 15.5);
}

#[test]
fn test_pressure_sensor_persistent_failure_zeroes_record() {
    let mut tracker = build_tracker(|_, _, baro, _| {
        baro.begin_failures = 2;
    });

    tracker.run_cycle();
    assert_eq!(tracker.baro().begin_calls, 2, "exactly one retry");
    assert_eq!(tracker.environment().pressure_pa, 0.0);
    assert_eq!(tracker.environment().temperature_c, 0.0);
    // Sensor failure does not stop the transmission.
    assert_eq!(tracker.stats().transmit_count, 1);
}

#[test]
fn test_charge_timeout_is_fatal_for_the_cycle() {
    let mut tracker = build_tracker(|platform, _, _, _| {
        platform.charger_ready_after_ms = None;
    });

    tracker.step();
    tracker.step();
    tracker.step();
    assert_eq!(tracker.step(), CycleState::StartCapacitorCharge);
    assert_eq!(tracker.step(), CycleState::Sleep);

    assert_eq!(tracker.stats().charge_failures, 1);
    assert_eq!(tracker.stats().transmit_count, 0);
    assert!(tracker.modem().sent.is_empty());
}

#[test]
fn test_ready_signal_lost_during_top_up_aborts() {
    let mut tracker = build_tracker(|platform, _, _, _| {
        platform.charger_ready_after_ms = Some(500);
        platform.charger_lost_after_ms = Some(800);
    });

    tracker.step();
    tracker.step();
    tracker.step();
    assert_eq!(tracker.step(), CycleState::StartCapacitorCharge);
    assert_eq!(tracker.step(), CycleState::TopUpCapacitorCharge);
    assert_eq!(tracker.step(), CycleState::Sleep);

    assert_eq!(tracker.stats().charge_failures, 1);
    assert_eq!(tracker.stats().transmit_count, 0);
}

#[test]
fn test_modem_init_failure_skips_the_attempt() {
    let mut tracker = build_tracker(|_, _, _, modem| {
        modem.begin_result = Err(ModemError::NoResponse);
    });

    tracker.run_cycle();
    let stats = tracker.stats();
    // The state never completed, so the counter holds.
    assert_eq!(stats.transmit_count, 0);
    assert_eq!(stats.sends_ok + stats.sends_failed, 0);
    assert_eq!(tracker.modem().send_attempts, 0);
    assert_eq!(tracker.modem().buffer_clears, 0);
}

#[test]
fn test_send_failure_still_cleans_up_and_counts() {
    let mut tracker = build_tracker(|_, _, _, modem| {
        modem.send_result = Err(ModemError::TxFailed);
    });

    tracker.run_cycle();
    let stats = tracker.stats();
    assert_eq!(stats.sends_failed, 1);
    assert_eq!(stats.sends_ok, 0);
    assert_eq!(stats.transmit_count, 1, "the attempt still counts");

    // Buffer clear and modem sleep are always attempted.
    assert_eq!(tracker.modem().buffer_clears, 1);
    assert_eq!(tracker.modem().sleeps, 1);
    assert_eq!(tracker.state(), CycleState::Init, "cycle still reached sleep");
}

#[test]
fn test_send_aborted_when_voltage_drops_mid_transmit() {
    let mut tracker = build_tracker(|platform, _, _, modem| {
        // Each supervisor poll costs one measurement settle on the
        // virtual clock, so a long send walks into the scripted sag.
        modem.callback_polls_per_send = 100_000;
        platform.schedule_vbat(10_000, 3.00);
    });

    tracker.run_cycle();
    let stats = tracker.stats();
    assert_eq!(stats.sends_failed, 1);
    assert_eq!(stats.transmit_count, 1);
    assert_eq!(tracker.modem().send_attempts, 1);
    assert!(tracker.modem().sent.is_empty());
    assert_eq!(tracker.modem().buffer_clears, 1);
}

#[test]
fn test_counter_increments_once_per_transmit_cycle() {
    let mut tracker = build_tracker(|_, _, _, _| {});
    for _ in 0..3 {
        tracker.run_cycle();
    }

    assert_eq!(tracker.stats().transmit_count, 3);
    let sent = &tracker.modem().sent;
    assert_eq!(sent.len(), 3);
    assert!(sent[0].ends_with(",0"), "first message after boot carries 0");
    assert!(sent[1].ends_with(",1"));
    assert!(sent[2].ends_with(",2"));

    // A restart resets the counter: the downstream reboot signal.
    let mut rebooted = build_tracker(|_, _, _, _| {});
    rebooted.run_cycle();
    assert!(rebooted.modem().sent[0].ends_with(",0"));
}

#[test]
fn test_gnss_and_modem_domains_never_overlap() {
    let mut tracker = build_tracker(|_, _, _, _| {});
    for _ in 0..3 {
        tracker.run_cycle();
    }

    let mut gnss_on = false;
    let mut modem_on = false;
    for event in tracker.platform().pin_log() {
        match event.line {
            Line::GnssPower => gnss_on = event.high,
            Line::ModemPower => modem_on = event.high,
            _ => continue,
        }
        assert!(
            !(gnss_on && modem_on),
            "GNSS and modem domains overlap at {} ms",
            event.at_ms
        );
    }
}

#[test]
fn test_sleep_wake_round_trip_restores_initial_conditions() {
    let mut tracker = build_tracker(|_, _, _, _| {});
    tracker.run_cycle();

    assert_eq!(tracker.state(), CycleState::Init);
    assert!(!tracker.platform().level(Line::GnssPower));
    assert!(!tracker.platform().level(Line::ModemPower));
    assert!(!tracker.platform().level(Line::ChargerEnable));
    assert_eq!(tracker.platform().low_power_io_entries, 1);
    assert_eq!(tracker.platform().active_io_entries, 1);
    assert!(!tracker.interval_clock().latch_set());
}

#[test]
fn test_event_history_records_abort_paths() {
    let mut tracker = build_tracker(|platform, gnss, baro, _| {
        gnss.begin_ok = false;
        baro.begin_failures = 2;
        platform.charger_ready_after_ms = None;
    });

    tracker.run_cycle();
    let events = tracker.events();
    assert_eq!(
        events.count_of(skybeacon::events::EventKind::GnssHandshakeFailed),
        1
    );
    assert_eq!(events.count_of(skybeacon::events::EventKind::SensorFailed), 1);
    assert_eq!(events.count_of(skybeacon::events::EventKind::ChargeTimeout), 1);
}
