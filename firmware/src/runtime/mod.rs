use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_time::Timer;
use lock_core::config::LockConfig;
use lock_core::machine::LockMachine;
use lock_core::store::SlotStore;
use lock_core::watchdog::EntryWatchdog;

use crate::clock::FirmwareInstant;
use crate::hw::flash::FlashStorage;
use crate::hw::keys::KeyInputs;
use crate::hw::leds::LedBank;
use crate::telemetry::TelemetryRecorder;

mod lock_task;
mod watchdog_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Entry timeout cells shared by the timer task and the lock task.
pub(super) static WATCHDOG: EntryWatchdog = EntryWatchdog::with_threshold(LOCK_CONFIG.timeout_ticks);

pub(super) const LOCK_CONFIG: LockConfig = LockConfig::new();

/// Lock machine as wired on the board.
pub(super) type BoardLock =
    LockMachine<SlotStore<FlashStorage<'static>>, FirmwareInstant, &'static EntryWatchdog>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA6,
        PB3,
        PB4,
        FLASH,
        ..
    } = hal::init(config);

    let keys = KeyInputs::new(Input::new(PB3, Pull::Up), Input::new(PB4, Pull::Up));
    let leds = LedBank::new(
        Output::new(PA0, Level::Low, Speed::Low),
        Output::new(PA1, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
    );
    let storage = FlashStorage::new(Flash::new_blocking(FLASH));

    // Pull-ups need a moment before the power-on sample is meaningful.
    Timer::after_micros(100).await;
    let first_sample = keys.sample();
    let machine: BoardLock =
        LockMachine::boot(LOCK_CONFIG, SlotStore::new(storage), &WATCHDOG, first_sample);
    info!(
        "lock: power-on mode={} phase={} keys={}",
        machine.mode(),
        machine.phase(),
        first_sample
    );

    spawner
        .spawn(watchdog_task::run(&WATCHDOG, LOCK_CONFIG.watchdog_period))
        .expect("failed to spawn watchdog task");

    spawner
        .spawn(lock_task::run(machine, keys, leds, TelemetryRecorder::new()))
        .expect("failed to spawn lock task");

    core::future::pending::<()>().await;
}
