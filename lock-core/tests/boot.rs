mod common;

use core::time::Duration;

use common::{Bench, SCENARIO_CODE};
use lock_core::code::KeyId;
use lock_core::config::LockConfig;
use lock_core::debounce::KeySample;
use lock_core::indicator::Indicator;
use lock_core::machine::{Mode, Phase};
use lock_core::telemetry::LockEvent;
use lock_core::watchdog::EntryWatchdog;

#[test]
fn sentinel_boots_unlocked() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, 0);
    bench.step(KeySample::RELEASED);

    assert_eq!(bench.machine.mode(), Mode::Unlocked);
    assert_eq!(bench.events.as_slice(), &[LockEvent::Booted(Mode::Unlocked)]);
    assert_eq!(bench.indicator(), Some(Indicator::GreenYellow));
}

#[test]
fn stored_code_boots_locked() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, SCENARIO_CODE);
    bench.step(KeySample::RELEASED);

    assert_eq!(bench.machine.mode(), Mode::Locked);
    assert_eq!(bench.events.as_slice(), &[LockEvent::Booted(Mode::Locked)]);
    assert_eq!(bench.indicator(), Some(Indicator::Red));
    assert_eq!(bench.stored(), SCENARIO_CODE);
}

#[test]
fn value_without_marker_bits_boots_unlocked_and_is_rewritten() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, 0x3F);
    assert_eq!(bench.machine.mode(), Mode::Unlocked);
    assert_eq!(bench.stored(), 0);
}

#[test]
fn key_held_at_power_on_bypasses_the_lock() {
    let watchdog = EntryWatchdog::new();
    let held = KeySample::holding(KeyId::Two);
    let mut bench = Bench::boot_with(&watchdog, SCENARIO_CODE, LockConfig::default(), held);
    assert_eq!(bench.machine.phase(), Phase::RecoveryHold);
    assert_eq!(
        bench.machine.mode(),
        Mode::Unlocked,
        "bypass reports unlocked while the key is still held"
    );

    bench.hold(held, 250);
    assert_eq!(bench.machine.phase(), Phase::RecoveryHold);
    assert_eq!(bench.machine.mode(), Mode::Unlocked);
    assert_eq!(bench.indicator(), Some(Indicator::Blue));
    assert_eq!(bench.stored(), SCENARIO_CODE, "store is untouched while held");

    bench.hold(KeySample::RELEASED, 8);
    assert_eq!(bench.machine.phase(), Phase::Entry);
    assert_eq!(bench.machine.mode(), Mode::Unlocked);
    assert_eq!(bench.stored(), 0);
    assert_eq!(
        bench.events.as_slice(),
        &[LockEvent::RecoveryBypass, LockEvent::Booted(Mode::Unlocked)]
    );
    assert_eq!(
        bench.machine.entries(),
        0,
        "releasing the bypass key is not an entry"
    );
    assert!(!watchdog.is_armed());
}

#[test]
fn disabled_bypass_treats_held_key_as_entry() {
    let watchdog = EntryWatchdog::new();
    let held = KeySample::holding(KeyId::One);
    let config = LockConfig::default().with_recovery_bypass(false);
    let mut bench = Bench::boot_with(&watchdog, SCENARIO_CODE, config, held);

    assert_eq!(bench.machine.mode(), Mode::Locked);
    bench.hold(held, 20);
    bench.idle(Duration::from_millis(40));
    assert_eq!(bench.machine.mode(), Mode::Locked);
    assert_eq!(bench.machine.entries(), 1);
    assert_eq!(bench.count(LockEvent::RecoveryBypass), 0);
}
