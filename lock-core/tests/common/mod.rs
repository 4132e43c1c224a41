#![allow(dead_code)]

use core::ops::Add;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use lock_core::code::KeyId;
use lock_core::config::LockConfig;
use lock_core::debounce::KeySample;
use lock_core::indicator::{Indicator, LedFrame};
use lock_core::machine::{LockMachine, TickReport};
use lock_core::store::{ByteStorage, CODE_SLOT_ADDRESS, RamStorage, SlotStore};
use lock_core::telemetry::LockEvent;
use lock_core::watchdog::EntryWatchdog;

pub const POLL: Duration = Duration::from_millis(2);
pub const HOLD_TICKS: usize = 12;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(u64);

impl MockInstant {
    pub fn micros(value: u64) -> Self {
        Self(value)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.as_micros() as u64)
    }
}

pub type Storage = RamStorage<64>;
pub type Machine<'w> = LockMachine<SlotStore<Storage>, MockInstant, &'w EntryWatchdog>;

/// Drives a machine with a simulated clock and timer interrupt.
pub struct Bench<'w> {
    pub machine: Machine<'w>,
    watchdog: &'w EntryWatchdog,
    now: MockInstant,
    next_timer_tick: MockInstant,
    pub events: HeaplessVec<LockEvent, 64>,
    pub last: Option<TickReport>,
    pub indicators_seen: HeaplessVec<Indicator, 64>,
}

impl<'w> Bench<'w> {
    pub fn boot(watchdog: &'w EntryWatchdog, stored: u8) -> Self {
        Self::boot_with(watchdog, stored, LockConfig::default(), KeySample::RELEASED)
    }

    pub fn boot_with(
        watchdog: &'w EntryWatchdog,
        stored: u8,
        config: LockConfig,
        first_sample: KeySample,
    ) -> Self {
        let mut storage = Storage::new();
        storage.write_byte(CODE_SLOT_ADDRESS, stored);
        Self::boot_storage(watchdog, storage, config, first_sample)
    }

    pub fn boot_storage(
        watchdog: &'w EntryWatchdog,
        storage: Storage,
        config: LockConfig,
        first_sample: KeySample,
    ) -> Self {
        let machine = LockMachine::boot(config, SlotStore::new(storage), watchdog, first_sample);
        Self {
            machine,
            watchdog,
            now: MockInstant::micros(0),
            next_timer_tick: MockInstant::micros(0) + config.watchdog_period,
            events: HeaplessVec::new(),
            last: None,
            indicators_seen: HeaplessVec::new(),
        }
    }

    /// Powers off and returns the persistent bytes.
    pub fn power_off(self) -> Storage {
        self.machine.into_store().into_inner()
    }

    pub fn stored(&mut self) -> u8 {
        self.machine.store().storage().as_bytes()[usize::from(CODE_SLOT_ADDRESS)]
    }

    pub fn now(&self) -> MockInstant {
        self.now
    }

    /// Runs one polling tick, firing the timer interrupt whenever its period elapsed.
    pub fn step(&mut self, sample: KeySample) -> &TickReport {
        let period = self.machine.config().watchdog_period;
        while self.next_timer_tick <= self.now {
            self.watchdog.on_timer_tick();
            self.next_timer_tick = self.next_timer_tick + period;
        }

        let report = self.machine.tick(self.now, sample);
        for event in &report.events {
            let _ = self.events.push(*event);
        }
        if self.indicators_seen.last() != Some(&report.indicator) {
            let _ = self.indicators_seen.push(report.indicator);
        }
        self.last = Some(report);
        self.now = self.now + POLL;
        self.last.as_ref().expect("report stored")
    }

    /// Indicator frame produced by the most recent tick.
    pub fn frame(&self) -> LedFrame {
        self.last.as_ref().map_or(LedFrame::OFF, |report| report.frame)
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.last.as_ref().map(|report| report.indicator)
    }

    pub fn hold(&mut self, sample: KeySample, ticks: usize) {
        for _ in 0..ticks {
            self.step(sample);
        }
    }

    pub fn idle(&mut self, duration: Duration) {
        let ticks = duration.as_micros() / POLL.as_micros();
        self.hold(KeySample::RELEASED, ticks as usize);
    }

    /// Clean press and release of one key.
    pub fn tap(&mut self, key: KeyId) {
        self.hold(KeySample::holding(key), HOLD_TICKS);
        self.hold(KeySample::RELEASED, HOLD_TICKS);
    }

    pub fn enter(&mut self, keys: &[KeyId]) {
        for key in keys {
            self.tap(*key);
        }
    }

    pub fn count(&self, event: LockEvent) -> usize {
        self.events.iter().filter(|seen| **seen == event).count()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
        self.indicators_seen.clear();
    }
}

pub const SCENARIO: [KeyId; 6] = [
    KeyId::One,
    KeyId::Two,
    KeyId::One,
    KeyId::One,
    KeyId::Two,
    KeyId::One,
];

pub const SCENARIO_CODE: u8 = 0b1110_1101;
