#![cfg(target_os = "none")]

use embassy_stm32::gpio::{Level, Output};
use lock_core::indicator::{IndicatorDriver, LedFrame};

pub struct LedBank<'d> {
    red: Output<'d>,
    green: Output<'d>,
    blue: Output<'d>,
    shown: Option<LedFrame>,
}

impl<'d> LedBank<'d> {
    pub fn new(red: Output<'d>, green: Output<'d>, blue: Output<'d>) -> Self {
        Self {
            red,
            green,
            blue,
            shown: None,
        }
    }
}

impl IndicatorDriver for LedBank<'_> {
    fn show(&mut self, frame: LedFrame) {
        if self.shown == Some(frame) {
            return;
        }

        self.red.set_level(Level::from(frame.red));
        self.green.set_level(Level::from(frame.green));
        self.blue.set_level(Level::from(frame.blue));
        self.shown = Some(frame);
    }
}
