//! Embassy time adapters for the `lock-core` state machine.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::convert::TryFrom;
use core::ops::Add;

use embassy_time::{Duration, Instant};

/// Monotonic instant handed to the lock machine.
///
/// Wraps Embassy's [`Instant`] so it can be advanced by `core::time::Duration`
/// values coming from [`LockConfig`](lock_core::config::LockConfig).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareInstant(Instant);

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<core::time::Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: core::time::Duration) -> Self::Output {
        Self(self.0 + core_duration_to_embassy(rhs))
    }
}

/// Converts a `core` duration into Embassy ticks, saturating on overflow.
pub fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = duration.as_micros();
    let micros = u64::try_from(micros).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_period_keeps_sub_millisecond_precision() {
        let period = core_duration_to_embassy(lock_core::config::DEFAULT_WATCHDOG_PERIOD);
        assert_eq!(period.as_micros(), 187_500);
    }

    #[test]
    fn adding_core_durations_orders_instants() {
        let start = FirmwareInstant::from(Instant::from_micros(1_000));
        let later = start + core::time::Duration::from_millis(300);

        assert!(later > start);
        assert_eq!(later, FirmwareInstant::from(Instant::from_micros(301_000)));
    }
}
