use crate::hal::Platform;
use crate::interval::IntervalClock;

/// Suspends the processor until the interval latch fires.
///
/// Spurious wake events (any interrupt other than the interval tick that
/// crossed the boundary) put the processor straight back to sleep; the
/// loop only exits once the latch is actually observed set.
#[derive(Debug, Default)]
pub struct SleepController;

impl SleepController {
    pub fn new() -> Self {
        Self
    }

    /// Blocks in the platform's low-power wait until the interval latch
    /// is set, then clears it. I/O and clock reconfiguration around the
    /// wait belongs to the caller's sleep/wake states.
    pub fn sleep_until_interval<P: Platform>(&self, platform: &mut P, clock: &IntervalClock) {
        loop {
            // Latch may already be set if the interval elapsed while the
            // cycle was still running; consume it without sleeping.
            if clock.take_latch() {
                return;
            }
            platform.deep_sleep();
        }
    }
}
