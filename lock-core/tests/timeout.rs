mod common;

use core::time::Duration;

use common::{Bench, SCENARIO, SCENARIO_CODE};
use lock_core::code::KeyId;
use lock_core::debounce::KeySample;
use lock_core::indicator::{Indicator, LedFrame, StrobeKind};
use lock_core::machine::{Mode, Phase};
use lock_core::telemetry::LockEvent;
use lock_core::watchdog::EntryWatchdog;

#[test]
fn idle_entry_times_out_after_three_seconds() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, 0);

    bench.enter(&SCENARIO[..3]);
    bench.idle(Duration::from_millis(2_700));
    assert_eq!(bench.machine.entries(), 3, "no timeout before the window closes");
    assert_eq!(bench.machine.phase(), Phase::Entry);

    bench.idle(Duration::from_millis(400));
    assert_eq!(bench.count(LockEvent::EntryTimedOut(Mode::Unlocked)), 1);
    assert_eq!(bench.machine.phase(), Phase::TimeoutFeedback);
    assert_eq!(bench.machine.entries(), 0);
    assert_eq!(bench.machine.mode(), Mode::Unlocked);
    assert_eq!(bench.stored(), 0);
}

#[test]
fn timeout_strobe_flashes_yellow_over_dark() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, SCENARIO_CODE);
    bench.tap(KeyId::One);
    bench.idle(Duration::from_millis(3_100));
    assert_eq!(bench.machine.phase(), Phase::TimeoutFeedback);
    assert_eq!(bench.indicator(), Some(Indicator::YellowStrobeNoRed));

    let mut frames = std::vec::Vec::new();
    loop {
        bench.step(KeySample::RELEASED);
        if bench.machine.phase() != Phase::TimeoutFeedback {
            break;
        }
        frames.push(bench.frame());
    }
    assert!(frames.iter().all(|frame| !frame.red));
    assert!(frames.contains(&LedFrame::YELLOW));
    assert!(frames.contains(&LedFrame::OFF));

    assert_eq!(
        bench.count(LockEvent::FeedbackFinished(StrobeKind::NoRed)),
        1
    );
    assert_eq!(bench.machine.mode(), Mode::Locked, "timeout keeps the mode");
    assert_eq!(bench.frame(), LedFrame::RED);
}

#[test]
fn each_release_restarts_the_window() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, 0);

    for key in &SCENARIO[..5] {
        bench.tap(*key);
        bench.idle(Duration::from_millis(2_000));
    }
    assert_eq!(bench.count(LockEvent::EntryTimedOut(Mode::Unlocked)), 0);
    assert_eq!(bench.machine.entries(), 5);
}

#[test]
fn held_key_is_discarded_when_timeout_fires() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, 0);

    bench.tap(KeyId::Two);
    bench.hold(KeySample::holding(KeyId::One), 1_600);
    assert_eq!(bench.machine.phase(), Phase::TimeoutFeedback);
    assert_eq!(bench.machine.pending_key(), None);

    bench.idle(Duration::from_millis(2_500));
    assert_eq!(bench.machine.phase(), Phase::Entry);
    assert_eq!(bench.machine.entries(), 0);
    assert_eq!(bench.count(LockEvent::EntryAccepted(KeyId::One)), 0);
    assert!(!watchdog.is_armed());
}

#[test]
fn empty_entry_never_times_out() {
    let watchdog = EntryWatchdog::new();
    let mut bench = Bench::boot(&watchdog, SCENARIO_CODE);

    bench.idle(Duration::from_secs(10));
    assert_eq!(bench.count(LockEvent::EntryTimedOut(Mode::Locked)), 0);
    assert_eq!(bench.machine.phase(), Phase::Entry);
}
