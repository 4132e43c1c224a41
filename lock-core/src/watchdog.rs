//! Entry timeout watchdog shared between the polling loop and the timer interrupt.
//!
//! The timer callback only counts ticks and raises a one-shot flag; the lock
//! state machine consumes the flag on its next poll and performs the abort.
//! All cells are atomics so the watchdog can sit in a `static` and be touched
//! from interrupt context without a lock.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::DEFAULT_TIMEOUT_TICKS;

#[derive(Debug)]
pub struct EntryWatchdog {
    armed: AtomicBool,
    ticks: AtomicU8,
    timed_out: AtomicBool,
    threshold: u8,
}

impl EntryWatchdog {
    /// Creates a disarmed watchdog using the default threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(DEFAULT_TIMEOUT_TICKS)
    }

    /// Creates a disarmed watchdog that fires after `threshold` armed ticks.
    #[must_use]
    pub const fn with_threshold(threshold: u8) -> Self {
        Self {
            armed: AtomicBool::new(false),
            ticks: AtomicU8::new(0),
            timed_out: AtomicBool::new(false),
            threshold,
        }
    }

    /// Restarts the countdown and opens the gate.
    ///
    /// Returns `true` when a timeout raised before the restart was still
    /// pending. The flag is consumed either way, so a restarted countdown never
    /// reports a stale timeout.
    pub fn arm(&self) -> bool {
        self.ticks.store(0, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
        self.timed_out.swap(false, Ordering::AcqRel)
    }

    /// Closes the gate and discards any pending timeout.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        self.ticks.store(0, Ordering::Relaxed);
        self.timed_out.store(false, Ordering::Release);
    }

    /// Timer interrupt body. Returns `true` on the tick that raised the timeout.
    pub fn on_timer_tick(&self) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            return false;
        }

        let elapsed = self.ticks.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if elapsed < self.threshold {
            return false;
        }

        self.armed.store(false, Ordering::Release);
        self.ticks.store(0, Ordering::Relaxed);
        self.timed_out.store(true, Ordering::Release);
        true
    }

    /// Consumes the one-shot timeout flag.
    #[must_use]
    pub fn take_timeout(&self) -> bool {
        self.timed_out.swap(false, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Ticks counted since the gate was last armed.
    #[must_use]
    pub fn elapsed_ticks(&self) -> u8 {
        self.ticks.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Default for EntryWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_watchdog_never_fires() {
        let watchdog = EntryWatchdog::with_threshold(2);
        for _ in 0..10 {
            assert!(!watchdog.on_timer_tick());
        }
        assert_eq!(watchdog.elapsed_ticks(), 0);
        assert!(!watchdog.take_timeout());
    }

    #[test]
    fn fires_once_at_threshold_and_closes_gate() {
        let watchdog = EntryWatchdog::with_threshold(3);
        watchdog.arm();

        assert!(!watchdog.on_timer_tick());
        assert!(!watchdog.on_timer_tick());
        assert!(watchdog.on_timer_tick());
        assert!(!watchdog.is_armed());
        assert_eq!(watchdog.elapsed_ticks(), 0);

        assert!(!watchdog.on_timer_tick());
        assert!(watchdog.take_timeout());
        assert!(!watchdog.take_timeout());
    }

    #[test]
    fn rearming_restarts_the_countdown() {
        let watchdog = EntryWatchdog::with_threshold(3);
        watchdog.arm();
        watchdog.on_timer_tick();
        watchdog.on_timer_tick();
        watchdog.arm();

        assert!(!watchdog.on_timer_tick());
        assert!(!watchdog.on_timer_tick());
        assert!(watchdog.on_timer_tick());
    }

    #[test]
    fn arm_reports_and_clears_a_pending_timeout() {
        let watchdog = EntryWatchdog::with_threshold(2);
        watchdog.arm();
        watchdog.on_timer_tick();
        assert!(watchdog.on_timer_tick());

        assert!(watchdog.arm(), "timeout raised before the restart");
        assert!(watchdog.is_armed());
        assert!(!watchdog.take_timeout());
        assert!(!watchdog.arm());
    }

    #[test]
    fn disarm_discards_pending_timeout() {
        let watchdog = EntryWatchdog::with_threshold(1);
        watchdog.arm();
        assert!(watchdog.on_timer_tick());
        watchdog.disarm();
        assert!(!watchdog.take_timeout());
    }
}
