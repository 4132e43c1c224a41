use embassy_time::Ticker;
use lock_core::watchdog::EntryWatchdog;

use crate::clock::core_duration_to_embassy;

/// Periodic timer body: counts ticks while entry is in progress and raises
/// the one-shot timeout once the threshold is reached.
#[embassy_executor::task]
pub async fn run(watchdog: &'static EntryWatchdog, period: core::time::Duration) -> ! {
    let mut ticker = Ticker::every(core_duration_to_embassy(period));
    loop {
        ticker.next().await;
        if watchdog.on_timer_tick() {
            defmt::debug!("watchdog: entry timeout raised");
        }
    }
}
