#![no_std]

// Shared logic for the binary safe lock controller.
//
// Everything here avoids the Rust standard library so the same state machine
// runs inside the MCU firmware and the host-side emulator and tests.

pub mod code;
pub mod config;
pub mod debounce;
pub mod indicator;
pub mod machine;
pub mod store;
pub mod telemetry;
pub mod watchdog;
