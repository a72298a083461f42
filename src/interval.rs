use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Shared cell between the 1 Hz tick handler and the sleep controller.
///
/// Producer: [`IntervalClock::tick`], called from interrupt context once
/// per second. Consumer: the sleep controller, through
/// [`IntervalClock::take_latch`]. Both sides only touch atomics, so the
/// sequencer always observes fully-updated values.
#[derive(Debug)]
pub struct IntervalClock {
    interval_s: AtomicU32,
    elapsed_s: AtomicU32,
    elapsed_latch: AtomicBool,
}

impl IntervalClock {
    pub const fn new(interval_s: u32) -> Self {
        Self {
            interval_s: AtomicU32::new(interval_s),
            elapsed_s: AtomicU32::new(0),
            elapsed_latch: AtomicBool::new(false),
        }
    }

    /// One-second tick. Interrupt-context minimal: increments the elapsed
    /// counter and, once the configured interval is reached, sets the
    /// latch and zeroes the counter. No blocking, no calls out.
    pub fn tick(&self) {
        let elapsed = self.elapsed_s.load(Ordering::Relaxed) + 1;
        if elapsed >= self.interval_s.load(Ordering::Relaxed) {
            self.elapsed_s.store(0, Ordering::Relaxed);
            self.elapsed_latch.store(true, Ordering::Release);
        } else {
            self.elapsed_s.store(elapsed, Ordering::Relaxed);
        }
    }

    /// Consumes the interval-elapsed latch. Returns whether it was set.
    pub fn take_latch(&self) -> bool {
        self.elapsed_latch.swap(false, Ordering::Acquire)
    }

    pub fn latch_set(&self) -> bool {
        self.elapsed_latch.load(Ordering::Acquire)
    }

    pub fn elapsed_s(&self) -> u32 {
        self.elapsed_s.load(Ordering::Relaxed)
    }

    pub fn interval_s(&self) -> u32 {
        self.interval_s.load(Ordering::Relaxed)
    }

    pub fn set_interval_s(&self, interval_s: u32) {
        self.interval_s.store(interval_s.max(1), Ordering::Relaxed);
    }
}
