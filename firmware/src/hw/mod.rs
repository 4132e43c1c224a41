//! Board peripherals backing the `lock-core` traits.
//!
//! Keys sit on PB3 (key-1) and PB4 (key-2) with internal pull-ups and read
//! active low. The indicator is a common-cathode RGB LED on PA0 (red), PA1
//! (green) and PA6 (blue).

pub mod flash;
pub mod keys;
pub mod leds;
