//! Tunable timing and behaviour parameters for the lock state machine.

use core::{fmt, time::Duration};

/// Default number of consecutive consistent samples required to confirm an edge.
pub const DEFAULT_DEBOUNCE_DEPTH: u8 = 8;

/// Largest debounce depth that fits in the 8-bit sample history.
pub const MAX_DEBOUNCE_DEPTH: u8 = 8;

/// Default polling interval of the main loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Default period of the watchdog timer interrupt.
pub const DEFAULT_WATCHDOG_PERIOD: Duration = Duration::from_micros(187_500);

/// Watchdog ticks after the last release before in-progress entry is aborted.
///
/// Sixteen ticks of [`DEFAULT_WATCHDOG_PERIOD`] is three seconds.
pub const DEFAULT_TIMEOUT_TICKS: u8 = 16;

/// Duration of each on/off phase of a strobe.
pub const DEFAULT_STROBE_PHASE: Duration = Duration::from_millis(300);

/// Number of on/off repetitions in a strobe.
pub const DEFAULT_STROBE_REPETITIONS: u8 = 4;

/// Configuration consumed by [`LockMachine`](crate::machine::LockMachine) and
/// the targets driving it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LockConfig {
    pub debounce_depth: u8,
    pub poll_interval: Duration,
    pub watchdog_period: Duration,
    pub timeout_ticks: u8,
    pub strobe_phase: Duration,
    pub strobe_repetitions: u8,
    /// Allows holding a key at power-on to force the unlocked state.
    pub recovery_bypass: bool,
}

impl LockConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            debounce_depth: DEFAULT_DEBOUNCE_DEPTH,
            poll_interval: DEFAULT_POLL_INTERVAL,
            watchdog_period: DEFAULT_WATCHDOG_PERIOD,
            timeout_ticks: DEFAULT_TIMEOUT_TICKS,
            strobe_phase: DEFAULT_STROBE_PHASE,
            strobe_repetitions: DEFAULT_STROBE_REPETITIONS,
            recovery_bypass: true,
        }
    }

    #[must_use]
    pub const fn with_debounce_depth(mut self, depth: u8) -> Self {
        self.debounce_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_timeout_ticks(mut self, ticks: u8) -> Self {
        self.timeout_ticks = ticks;
        self
    }

    #[must_use]
    pub const fn with_strobe(mut self, phase: Duration, repetitions: u8) -> Self {
        self.strobe_phase = phase;
        self.strobe_repetitions = repetitions;
        self
    }

    #[must_use]
    pub const fn with_recovery_bypass(mut self, enabled: bool) -> Self {
        self.recovery_bypass = enabled;
        self
    }

    /// Real time between the last release and the entry timeout.
    #[must_use]
    pub fn entry_timeout(&self) -> Duration {
        self.watchdog_period * u32::from(self.timeout_ticks)
    }

    /// Checks that every parameter is usable by the state machine.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_depth == 0 || self.debounce_depth > MAX_DEBOUNCE_DEPTH {
            return Err(ConfigError::DebounceDepth(self.debounce_depth));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.watchdog_period.is_zero() {
            return Err(ConfigError::ZeroWatchdogPeriod);
        }
        if self.timeout_ticks == 0 {
            return Err(ConfigError::ZeroTimeoutTicks);
        }
        if self.strobe_phase.is_zero() || self.strobe_repetitions == 0 {
            return Err(ConfigError::EmptyStrobe);
        }
        Ok(())
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons a [`LockConfig`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    DebounceDepth(u8),
    ZeroPollInterval,
    ZeroWatchdogPeriod,
    ZeroTimeoutTicks,
    EmptyStrobe,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DebounceDepth(depth) => write!(
                f,
                "debounce depth {depth} outside 1..={MAX_DEBOUNCE_DEPTH}"
            ),
            ConfigError::ZeroPollInterval => f.write_str("poll interval must be non-zero"),
            ConfigError::ZeroWatchdogPeriod => f.write_str("watchdog period must be non-zero"),
            ConfigError::ZeroTimeoutTicks => f.write_str("timeout ticks must be non-zero"),
            ConfigError::EmptyStrobe => {
                f.write_str("strobe needs a non-zero phase and at least one repetition")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_three_seconds() {
        let config = LockConfig::default();
        assert_eq!(config.entry_timeout(), Duration::from_secs(3));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_debounce_depth_outside_history() {
        let config = LockConfig::new().with_debounce_depth(9);
        assert_eq!(config.validate(), Err(ConfigError::DebounceDepth(9)));

        let config = LockConfig::new().with_debounce_depth(0);
        assert_eq!(config.validate(), Err(ConfigError::DebounceDepth(0)));
    }

    #[test]
    fn rejects_empty_strobe() {
        let config = LockConfig::new().with_strobe(Duration::from_millis(300), 0);
        assert_eq!(config.validate(), Err(ConfigError::EmptyStrobe));
    }
}
