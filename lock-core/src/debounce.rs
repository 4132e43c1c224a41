//! Shift-register debouncer for the two lock keys.
//!
//! Every polling tick pushes one "either key held" sample into an 8-bit
//! history. A press is confirmed once the newest `depth` samples are all held,
//! a release once they are all clear and a press had been confirmed.

use crate::code::KeyId;
use crate::config::{DEFAULT_DEBOUNCE_DEPTH, MAX_DEBOUNCE_DEPTH};

/// Raw key levels captured on a single polling tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySample {
    pub key_one: bool,
    pub key_two: bool,
}

impl KeySample {
    /// Sample with no key held.
    pub const RELEASED: KeySample = KeySample {
        key_one: false,
        key_two: false,
    };

    #[must_use]
    pub const fn new(key_one: bool, key_two: bool) -> Self {
        Self { key_one, key_two }
    }

    /// Sample with only `key` held.
    #[must_use]
    pub const fn holding(key: KeyId) -> Self {
        match key {
            KeyId::One => Self::new(true, false),
            KeyId::Two => Self::new(false, true),
        }
    }

    #[must_use]
    pub const fn any_held(self) -> bool {
        self.key_one || self.key_two
    }

    /// Key credited for this sample; key-1 takes priority when both are held.
    #[must_use]
    pub const fn key(self) -> Option<KeyId> {
        if self.key_one {
            Some(KeyId::One)
        } else if self.key_two {
            Some(KeyId::Two)
        } else {
            None
        }
    }
}

/// Edge reported by [`Debouncer::sample`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceEvent {
    PressConfirmed(KeyId),
    ReleaseConfirmed(KeyId),
}

#[derive(Copy, Clone, Debug)]
pub struct Debouncer {
    history: u8,
    mask: u8,
    pressed: Option<KeyId>,
}

impl Debouncer {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_depth(DEFAULT_DEBOUNCE_DEPTH)
    }

    /// Creates a debouncer confirming edges after `depth` consistent samples.
    ///
    /// `depth` is clamped to `1..=8`.
    #[must_use]
    pub const fn with_depth(depth: u8) -> Self {
        let depth = if depth == 0 {
            1
        } else if depth > MAX_DEBOUNCE_DEPTH {
            MAX_DEBOUNCE_DEPTH
        } else {
            depth
        };

        let mask = if depth == MAX_DEBOUNCE_DEPTH {
            u8::MAX
        } else {
            (1u8 << depth) - 1
        };

        Self {
            history: 0,
            mask,
            pressed: None,
        }
    }

    /// Pushes one sample and returns the confirmed edge, if any.
    pub fn sample(&mut self, sample: KeySample) -> Option<DebounceEvent> {
        self.history = (self.history << 1) | u8::from(sample.any_held());
        let window = self.history & self.mask;

        match self.pressed {
            None if window == self.mask => {
                let key = sample.key()?;
                self.pressed = Some(key);
                Some(DebounceEvent::PressConfirmed(key))
            }
            Some(key) if window == 0 => {
                self.pressed = None;
                Some(DebounceEvent::ReleaseConfirmed(key))
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed.is_some()
    }

    /// Returns `true` when the debounce window holds only released samples.
    #[must_use]
    pub const fn has_settled_released(&self) -> bool {
        self.history & self.mask == 0
    }

    /// Forgets any confirmed press and clears the history.
    pub fn reset(&mut self) {
        self.history = 0;
        self.pressed = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
