//! Lock state machine.
//!
//! The machine owns the lock mode and the pending six-entry code. It is driven
//! by [`LockMachine::tick`] once per polling interval with the current
//! monotonic time and the raw key levels. Feedback strobes are timed
//! sub-states: while one plays, key sampling is suspended, matching the
//! behaviour of a blocking animation without blocking the caller.
//!
//! The timeout watchdog is shared with the timer interrupt; the machine re-arms
//! it on every confirmed release and consumes its one-shot timeout flag at the
//! start of each entry tick. A timeout that lands between that check and the
//! re-arm is picked up by [`EntryWatchdog::arm`]: the old code is aborted and
//! the release starts a fresh one.

use core::{fmt, ops::Add, ops::Deref, time::Duration};

use heapless::Vec;

use crate::code::{Code, KeyId, is_active_code};
use crate::config::LockConfig;
use crate::debounce::{DebounceEvent, Debouncer, KeySample};
use crate::indicator::{Indicator, LedFrame, StrobeKind, StrobePattern};
use crate::store::CodeStore;
use crate::telemetry::LockEvent;
use crate::watchdog::EntryWatchdog;

/// Upper bound on events raised during a single tick.
pub const MAX_TICK_EVENTS: usize = 6;

/// Lock mode; exactly one is active.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Unlocked,
    Locked,
}

impl Mode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Mode::Unlocked => "unlocked",
            Mode::Locked => "locked",
        }
    }

    /// Steady indicator shown while waiting for input in this mode.
    #[must_use]
    pub const fn background(self) -> Indicator {
        match self {
            Mode::Unlocked => Indicator::GreenYellow,
            Mode::Locked => Indicator::Red,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Externally visible sub-state of the machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// A key was held at power-on; waiting for it to be released.
    RecoveryHold,
    /// Accepting key entries.
    Entry,
    /// Playing the wrong-code strobe.
    ErrorFeedback,
    /// Playing the entry-timeout strobe.
    TimeoutFeedback,
}

impl Phase {
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Phase::Entry)
    }
}

#[derive(Copy, Clone, Debug)]
enum PhaseState<I> {
    RecoveryHold,
    Entry,
    Feedback { pattern: StrobePattern, started_at: I },
}

/// Result of a single [`LockMachine::tick`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    pub indicator: Indicator,
    pub frame: LedFrame,
    pub events: Vec<LockEvent, MAX_TICK_EVENTS>,
}

impl TickReport {
    fn new(indicator: Indicator, frame: LedFrame, events: Vec<LockEvent, MAX_TICK_EVENTS>) -> Self {
        Self {
            indicator,
            frame,
            events,
        }
    }
}

/// Six-entry lock controller.
///
/// `S` persists the code, `I` is the caller's monotonic instant and `W` is a
/// handle to the watchdog shared with the timer interrupt (`&EntryWatchdog`,
/// `Arc<EntryWatchdog>`, ...).
pub struct LockMachine<S, I, W> {
    config: LockConfig,
    store: S,
    watchdog: W,
    debouncer: Debouncer,
    mode: Mode,
    phase: PhaseState<I>,
    code: Code,
    pending_key: Option<KeyId>,
    events: Vec<LockEvent, MAX_TICK_EVENTS>,
}

impl<S, I, W> LockMachine<S, I, W>
where
    S: CodeStore,
    I: Copy + Ord + Add<Duration, Output = I>,
    W: Deref<Target = EntryWatchdog>,
{
    /// Powers the machine on.
    ///
    /// `first_sample` is the key state read before any debouncing has taken
    /// place. With the recovery bypass enabled, a key held at that point puts
    /// the machine in [`Phase::RecoveryHold`]; once the key is released it
    /// enters Unlocked regardless of the stored code. Otherwise the machine
    /// enters Locked when the store holds an active code, Unlocked when not.
    pub fn boot(config: LockConfig, mut store: S, watchdog: W, first_sample: KeySample) -> Self {
        watchdog.disarm();
        let stored = store.load();
        let mode = if is_active_code(stored) {
            Mode::Locked
        } else {
            Mode::Unlocked
        };

        let mut machine = Self {
            debouncer: Debouncer::with_depth(config.debounce_depth),
            config,
            store,
            watchdog,
            mode,
            phase: PhaseState::Entry,
            code: Code::EMPTY,
            pending_key: None,
            events: Vec::new(),
        };

        if machine.config.recovery_bypass && first_sample.any_held() {
            machine.debouncer.sample(first_sample);
            machine.mode = Mode::Unlocked;
            machine.phase = PhaseState::RecoveryHold;
            machine.emit(LockEvent::RecoveryBypass);
            return machine;
        }

        match mode {
            Mode::Locked => machine.enter_locked(),
            Mode::Unlocked => machine.enter_unlocked(),
        }
        machine.emit(LockEvent::Booted(mode));
        machine
    }

    /// Advances the machine by one polling interval.
    pub fn tick(&mut self, now: I, sample: KeySample) -> TickReport {
        let indicator = match self.phase {
            PhaseState::RecoveryHold => self.tick_recovery(sample),
            PhaseState::Feedback {
                pattern,
                started_at,
            } => match pattern.frame_at(started_at, now) {
                Some(frame) => {
                    let events = core::mem::take(&mut self.events);
                    return TickReport::new(pattern.kind.indicator(), frame, events);
                }
                None => {
                    self.phase = PhaseState::Entry;
                    if self.code.entries() > 0 {
                        // Entry counted while the timeout strobe played.
                        self.watchdog.arm();
                    }
                    self.emit(LockEvent::FeedbackFinished(pattern.kind));
                    self.tick_entry(now, sample)
                }
            },
            PhaseState::Entry => self.tick_entry(now, sample),
        };

        let frame = match self.phase {
            PhaseState::Feedback { pattern, .. } => pattern.kind.on_frame(),
            _ => indicator.frame(),
        };
        let events = core::mem::take(&mut self.events);
        TickReport::new(indicator, frame, events)
    }

    fn tick_recovery(&mut self, sample: KeySample) -> Indicator {
        self.debouncer.sample(sample);
        if !self.debouncer.has_settled_released() {
            return if self.debouncer.is_pressed() {
                Indicator::Blue
            } else {
                Indicator::Off
            };
        }

        self.debouncer.reset();
        self.enter_unlocked();
        self.emit(LockEvent::Booted(Mode::Unlocked));
        self.mode.background()
    }

    fn tick_entry(&mut self, now: I, sample: KeySample) -> Indicator {
        if self.watchdog.take_timeout() {
            self.abort_entry(now);
            return StrobeKind::NoRed.indicator();
        }

        match self.debouncer.sample(sample) {
            Some(DebounceEvent::PressConfirmed(key)) => {
                self.pending_key = Some(key);
                self.emit(LockEvent::KeyPressed(key));
            }
            Some(DebounceEvent::ReleaseConfirmed(_)) => {
                if let Some(key) = self.pending_key.take() {
                    self.accept_entry(key, now);
                }
            }
            None => {}
        }

        match self.phase {
            PhaseState::Feedback { pattern, .. } => pattern.kind.indicator(),
            _ if self.pending_key.is_some() => Indicator::Blue,
            _ => self.mode.background(),
        }
    }

    fn accept_entry(&mut self, key: KeyId, now: I) {
        if self.watchdog.arm() {
            self.watchdog.disarm();
            self.abort_entry(now);
            self.code.push(key);
            self.emit(LockEvent::EntryAccepted(key));
            return;
        }

        self.code.push(key);
        self.emit(LockEvent::EntryAccepted(key));

        if self.code.is_complete() {
            self.complete_code(now);
        }
    }

    fn complete_code(&mut self, now: I) {
        self.watchdog.disarm();
        match self.mode {
            Mode::Unlocked => {
                self.store.save(self.code.to_byte());
                self.emit(LockEvent::CodeSet);
                self.enter_locked();
            }
            Mode::Locked => {
                // Re-read rather than cache: the machine may have booted straight into Locked.
                let stored = self.store.load();
                if stored == self.code.to_byte() {
                    self.emit(LockEvent::Unlocked);
                    self.enter_unlocked();
                } else {
                    self.emit(LockEvent::CodeRejected);
                    self.code.reset();
                    self.start_feedback(StrobeKind::WithRed, now);
                }
            }
        }
    }

    fn abort_entry(&mut self, now: I) {
        self.code.reset();
        self.pending_key = None;
        self.emit(LockEvent::EntryTimedOut(self.mode));
        self.start_feedback(StrobeKind::NoRed, now);
    }

    fn start_feedback(&mut self, kind: StrobeKind, now: I) {
        self.phase = PhaseState::Feedback {
            pattern: StrobePattern::new(
                kind,
                self.config.strobe_phase,
                self.config.strobe_repetitions,
            ),
            started_at: now,
        };
    }

    fn enter_unlocked(&mut self) {
        self.mode = Mode::Unlocked;
        self.store.clear();
        self.reset_entry();
    }

    fn enter_locked(&mut self) {
        self.mode = Mode::Locked;
        self.reset_entry();
    }

    fn reset_entry(&mut self) {
        self.code.reset();
        self.pending_key = None;
        self.watchdog.disarm();
        self.phase = PhaseState::Entry;
    }

    fn emit(&mut self, event: LockEvent) {
        let pushed = self.events.push(event).is_ok();
        debug_assert!(pushed, "tick event buffer overflow");
    }
}

impl<S, I, W> LockMachine<S, I, W> {
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.phase {
            PhaseState::RecoveryHold => Phase::RecoveryHold,
            PhaseState::Entry => Phase::Entry,
            PhaseState::Feedback { pattern, .. } => match pattern.kind {
                StrobeKind::WithRed => Phase::ErrorFeedback,
                StrobeKind::NoRed => Phase::TimeoutFeedback,
            },
        }
    }

    /// Entries accumulated toward the current code.
    #[must_use]
    pub const fn entries(&self) -> u8 {
        self.code.entries()
    }

    /// Partial code being entered (lock code when Unlocked, attempt when Locked).
    #[must_use]
    pub const fn pending_code(&self) -> Code {
        self.code
    }

    /// Key of the confirmed press that has not been released yet.
    #[must_use]
    pub const fn pending_key(&self) -> Option<KeyId> {
        self.pending_key
    }

    #[must_use]
    pub const fn config(&self) -> &LockConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Powers the machine off, returning the persistent store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}
