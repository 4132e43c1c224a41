#![cfg(target_os = "none")]

use embassy_stm32::gpio::Input;
use lock_core::debounce::KeySample;

/// The two lock keys, pulled up and shorted to ground when pressed.
pub struct KeyInputs<'d> {
    key_one: Input<'d>,
    key_two: Input<'d>,
}

impl<'d> KeyInputs<'d> {
    pub fn new(key_one: Input<'d>, key_two: Input<'d>) -> Self {
        Self { key_one, key_two }
    }

    /// Raw levels for one polling tick.
    pub fn sample(&self) -> KeySample {
        KeySample::new(self.key_one.is_low(), self.key_two.is_low())
    }
}
