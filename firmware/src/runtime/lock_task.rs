use embassy_time::{Instant, Ticker};
use lock_core::indicator::IndicatorDriver;

use super::BoardLock;
use crate::clock::{FirmwareInstant, core_duration_to_embassy};
use crate::hw::keys::KeyInputs;
use crate::hw::leds::LedBank;
use crate::status;
use crate::telemetry::TelemetryRecorder;

/// Polling loop: samples the keys, advances the machine and drives the LEDs.
#[embassy_executor::task]
pub async fn run(
    mut machine: BoardLock,
    keys: KeyInputs<'static>,
    mut leds: LedBank<'static>,
    mut telemetry: TelemetryRecorder,
) -> ! {
    let mut ticker = Ticker::every(core_duration_to_embassy(machine.config().poll_interval));
    loop {
        ticker.next().await;

        let now = Instant::now();
        let report = machine.tick(FirmwareInstant::from(now), keys.sample());
        leds.show(report.frame);

        let mut transitioned = false;
        for event in report.events {
            telemetry.record(event, now);
            status::record_event(event);
            transitioned |= event.is_transition();
        }
        status::record_tick(machine.mode(), machine.entries());

        if transitioned {
            defmt::info!("lock: {}", status::snapshot());
        }
    }
}
