#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror the lock mode, the pending entry count and the
//! most recent lock event so diagnostics can read a [`StatusSnapshot`]
//! without borrowing the state machine owned by the lock task.

use lock_core::machine::Mode;
use lock_core::telemetry::LockEvent;
use portable_atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

const MODE_UNKNOWN: u8 = 0;
const MODE_UNLOCKED: u8 = 1;
const MODE_LOCKED: u8 = 2;

/// Current lock mode (0 == not booted yet).
static MODE: AtomicU8 = AtomicU8::new(MODE_UNKNOWN);
/// Entries accumulated toward the pending code.
static ENTRIES: AtomicU8 = AtomicU8::new(0);
/// Raw code (+1) of the last lock event; 0 means none yet.
static LAST_EVENT: AtomicU16 = AtomicU16::new(0);
/// Number of entry attempts aborted by the watchdog since boot.
static TIMEOUTS: AtomicU32 = AtomicU32::new(0);
/// Number of codes rejected since boot.
static REJECTIONS: AtomicU32 = AtomicU32::new(0);

/// Point-in-time copy of the status cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub mode: Option<Mode>,
    pub entries: u8,
    pub last_event: Option<LockEvent>,
    pub timeouts: u32,
    pub rejections: u32,
}

/// Publishes the machine state observed after a polling tick.
pub fn record_tick(mode: Mode, entries: u8) {
    let raw = match mode {
        Mode::Unlocked => MODE_UNLOCKED,
        Mode::Locked => MODE_LOCKED,
    };
    MODE.store(raw, Ordering::Relaxed);
    ENTRIES.store(entries, Ordering::Relaxed);
}

/// Records a lock event and bumps the matching counters.
pub fn record_event(event: LockEvent) {
    LAST_EVENT.store(event.to_raw().wrapping_add(1), Ordering::Relaxed);
    match event {
        LockEvent::EntryTimedOut(_) => {
            TIMEOUTS.fetch_add(1, Ordering::Relaxed);
        }
        LockEvent::CodeRejected => {
            REJECTIONS.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

pub fn snapshot() -> StatusSnapshot {
    let mode = match MODE.load(Ordering::Relaxed) {
        MODE_UNLOCKED => Some(Mode::Unlocked),
        MODE_LOCKED => Some(Mode::Locked),
        _ => None,
    };
    let last_event = match LAST_EVENT.load(Ordering::Relaxed) {
        0 => None,
        raw => Some(LockEvent::from_raw(raw.wrapping_sub(1))),
    };

    StatusSnapshot {
        mode,
        entries: ENTRIES.load(Ordering::Relaxed),
        last_event,
        timeouts: TIMEOUTS.load(Ordering::Relaxed),
        rejections: REJECTIONS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_state() {
        assert_eq!(snapshot().mode, None);

        record_tick(Mode::Locked, 4);
        record_event(LockEvent::EntryTimedOut(Mode::Locked));
        record_event(LockEvent::CodeRejected);
        record_event(LockEvent::Booted(Mode::Unlocked));

        let status = snapshot();
        assert_eq!(status.mode, Some(Mode::Locked));
        assert_eq!(status.entries, 4);
        assert_eq!(status.last_event, Some(LockEvent::Booted(Mode::Unlocked)));
        assert_eq!(status.timeouts, 1);
        assert_eq!(status.rejections, 1);
    }
}
