use crate::hal::Platform;

/// Timing parameters for one bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct PollWindow {
    pub timeout_ms: u32,
    pub poll_interval_ms: u32,
}

/// Outcome of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The ready predicate fired.
    Ready,
    /// The abort predicate fired (low-voltage gate).
    Aborted,
    /// The window elapsed with neither predicate firing.
    TimedOut,
}

/// Bounded polling loop shared by every wait in the cycle: GNSS fix wait,
/// charger-ready wait, and the capacitor top-up hold.
///
/// Per-iteration order is abort, ready, deadline, delay. A true abort
/// predicate therefore terminates the loop within one iteration, the
/// ready predicate is checked at least once even for a zero-length
/// window, and the timeout fires at or just after `timeout_ms`, never
/// before.
pub fn poll_bounded<P, R, A>(
    platform: &mut P,
    window: PollWindow,
    mut ready: R,
    mut abort: A,
) -> PollOutcome
where
    P: Platform,
    R: FnMut(&mut P) -> bool,
    A: FnMut(&mut P) -> bool,
{
    let started = platform.millis();
    loop {
        if abort(platform) {
            return PollOutcome::Aborted;
        }
        if ready(platform) {
            return PollOutcome::Ready;
        }
        if platform.millis().wrapping_sub(started) >= window.timeout_ms {
            return PollOutcome::TimedOut;
        }
        platform.delay_ms(window.poll_interval_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{Line, PinMode, Platform};

    /// Minimal clock-only platform for exercising the loop shape.
    struct ClockPlatform {
        now_ms: u32,
    }

    impl Platform for ClockPlatform {
        fn pin_mode(&mut self, _line: Line, _mode: PinMode) {}
        fn pin_write(&mut self, _line: Line, _high: bool) {}
        fn pin_read(&mut self, _line: Line) -> bool {
            false
        }
        fn analog_read(&mut self, _line: Line) -> u16 {
            0
        }
        fn millis(&mut self) -> u32 {
            self.now_ms
        }
        fn delay_ms(&mut self, ms: u32) {
            self.now_ms = self.now_ms.wrapping_add(ms);
        }
        fn configure_low_power_io(&mut self) {}
        fn deep_sleep(&mut self) {}
        fn configure_active_io(&mut self) {}
    }

    #[test]
    fn test_abort_wins_within_one_iteration() {
        let mut platform = ClockPlatform { now_ms: 0 };
        let window = PollWindow {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
        };
        let outcome = poll_bounded(&mut platform, window, |_| true, |_| true);
        assert_eq!(outcome, PollOutcome::Aborted);
        assert_eq!(platform.now_ms, 0, "abort must not wait out a poll interval");
    }

    #[test]
    fn test_ready_checked_before_deadline() {
        let mut platform = ClockPlatform { now_ms: 0 };
        let window = PollWindow {
            timeout_ms: 0,
            poll_interval_ms: 100,
        };
        let outcome = poll_bounded(&mut platform, window, |_| true, |_| false);
        assert_eq!(outcome, PollOutcome::Ready);
    }

    #[test]
    fn test_timeout_at_or_just_after_deadline() {
        let mut platform = ClockPlatform { now_ms: 0 };
        let window = PollWindow {
            timeout_ms: 1000,
            poll_interval_ms: 100,
        };
        let outcome = poll_bounded(&mut platform, window, |_| false, |_| false);
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(platform.now_ms >= 1000);
        assert!(platform.now_ms < 1000 + 100, "exit within one poll interval of the deadline");
    }

    #[test]
    fn test_ready_after_some_polls() {
        let mut platform = ClockPlatform { now_ms: 0 };
        let window = PollWindow {
            timeout_ms: 5000,
            poll_interval_ms: 100,
        };
        let mut polls = 0;
        let outcome = poll_bounded(
            &mut platform,
            window,
            |_| {
                polls += 1;
                polls >= 4
            },
            |_| false,
        );
        assert_eq!(outcome, PollOutcome::Ready);
        assert_eq!(platform.now_ms, 300);
    }

    #[test]
    fn test_clock_wrap_tolerated() {
        let mut platform = ClockPlatform { now_ms: u32::MAX - 50 };
        let window = PollWindow {
            timeout_ms: 1000,
            poll_interval_ms: 100,
        };
        let outcome = poll_bounded(&mut platform, window, |_| false, |_| false);
        assert_eq!(outcome, PollOutcome::TimedOut);
    }
}
