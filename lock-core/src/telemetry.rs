//! Lock event catalog shared by firmware and host targets.
//!
//! The state machine raises these events instead of logging so the same core
//! runs on targets with very different log sinks (defmt on the MCU, stdout and
//! transcript files on the host). Events map to compact numeric codes for
//! storage in fixed-size telemetry rings.

use core::fmt;

use crate::code::KeyId;
use crate::indicator::StrobeKind;
use crate::machine::Mode;

/// Discriminated events raised by [`LockMachine`](crate::machine::LockMachine).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockEvent {
    /// The machine settled into its initial mode after power-on.
    Booted(Mode),
    /// A key was held at power-on; the machine waits for release and unlocks.
    RecoveryBypass,
    KeyPressed(KeyId),
    /// A press/release pair was shifted into the pending code.
    EntryAccepted(KeyId),
    /// Six entries were persisted as the new lock code.
    CodeSet,
    /// The attempt matched the stored code and the store was cleared.
    Unlocked,
    /// The attempt did not match the stored code.
    CodeRejected,
    /// The watchdog aborted in-progress entry in the given mode.
    EntryTimedOut(Mode),
    FeedbackFinished(StrobeKind),
    Custom(u16),
}

impl fmt::Display for LockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockEvent::Booted(mode) => write!(f, "booted {mode}"),
            LockEvent::RecoveryBypass => f.write_str("recovery-bypass"),
            LockEvent::KeyPressed(key) => write!(f, "key-pressed {key}"),
            LockEvent::EntryAccepted(key) => write!(f, "entry-accepted {key}"),
            LockEvent::CodeSet => f.write_str("code-set"),
            LockEvent::Unlocked => f.write_str("unlocked"),
            LockEvent::CodeRejected => f.write_str("code-rejected"),
            LockEvent::EntryTimedOut(mode) => write!(f, "entry-timed-out {mode}"),
            LockEvent::FeedbackFinished(kind) => {
                write!(f, "feedback-finished {}", strobe_label(*kind))
            }
            LockEvent::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl LockEvent {
    const BOOTED_BASE: u16 = 0x0000;
    const RECOVERY_BYPASS_CODE: u16 = 0x0002;
    const KEY_PRESSED_BASE: u16 = 0x0004;
    const ENTRY_ACCEPTED_BASE: u16 = 0x0006;
    const CODE_SET_CODE: u16 = 0x0008;
    const UNLOCKED_CODE: u16 = 0x0009;
    const CODE_REJECTED_CODE: u16 = 0x000A;
    const TIMED_OUT_BASE: u16 = 0x000C;
    const FEEDBACK_FINISHED_BASE: u16 = 0x000E;
    const CATALOG_END: u16 = 0x0010;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            LockEvent::Booted(mode) => Self::BOOTED_BASE + mode_index(mode),
            LockEvent::RecoveryBypass => Self::RECOVERY_BYPASS_CODE,
            LockEvent::KeyPressed(key) => Self::KEY_PRESSED_BASE + key_index(key),
            LockEvent::EntryAccepted(key) => Self::ENTRY_ACCEPTED_BASE + key_index(key),
            LockEvent::CodeSet => Self::CODE_SET_CODE,
            LockEvent::Unlocked => Self::UNLOCKED_CODE,
            LockEvent::CodeRejected => Self::CODE_REJECTED_CODE,
            LockEvent::EntryTimedOut(mode) => Self::TIMED_OUT_BASE + mode_index(mode),
            LockEvent::FeedbackFinished(kind) => Self::FEEDBACK_FINISHED_BASE + strobe_index(kind),
            LockEvent::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`LockEvent::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::RECOVERY_BYPASS_CODE => LockEvent::RecoveryBypass,
            Self::CODE_SET_CODE => LockEvent::CodeSet,
            Self::UNLOCKED_CODE => LockEvent::Unlocked,
            Self::CODE_REJECTED_CODE => LockEvent::CodeRejected,
            value if (Self::BOOTED_BASE..Self::RECOVERY_BYPASS_CODE).contains(&value) => {
                mode_from_index(value - Self::BOOTED_BASE)
                    .map_or(LockEvent::Custom(value), LockEvent::Booted)
            }
            value if (Self::KEY_PRESSED_BASE..Self::ENTRY_ACCEPTED_BASE).contains(&value) => {
                key_from_index(value - Self::KEY_PRESSED_BASE)
                    .map_or(LockEvent::Custom(value), LockEvent::KeyPressed)
            }
            value if (Self::ENTRY_ACCEPTED_BASE..Self::CODE_SET_CODE).contains(&value) => {
                key_from_index(value - Self::ENTRY_ACCEPTED_BASE)
                    .map_or(LockEvent::Custom(value), LockEvent::EntryAccepted)
            }
            value if (Self::TIMED_OUT_BASE..Self::FEEDBACK_FINISHED_BASE).contains(&value) => {
                mode_from_index(value - Self::TIMED_OUT_BASE)
                    .map_or(LockEvent::Custom(value), LockEvent::EntryTimedOut)
            }
            value if (Self::FEEDBACK_FINISHED_BASE..Self::CATALOG_END).contains(&value) => {
                strobe_from_index(value - Self::FEEDBACK_FINISHED_BASE)
                    .map_or(LockEvent::Custom(value), LockEvent::FeedbackFinished)
            }
            other => LockEvent::Custom(other),
        }
    }

    /// Returns `true` for events that change the lock mode.
    #[must_use]
    pub const fn is_transition(self) -> bool {
        matches!(self, LockEvent::CodeSet | LockEvent::Unlocked)
    }
}

const fn mode_index(mode: Mode) -> u16 {
    match mode {
        Mode::Unlocked => 0,
        Mode::Locked => 1,
    }
}

fn mode_from_index(index: u16) -> Option<Mode> {
    match index {
        0 => Some(Mode::Unlocked),
        1 => Some(Mode::Locked),
        _ => None,
    }
}

const fn key_index(key: KeyId) -> u16 {
    match key {
        KeyId::One => 0,
        KeyId::Two => 1,
    }
}

fn key_from_index(index: u16) -> Option<KeyId> {
    match index {
        0 => Some(KeyId::One),
        1 => Some(KeyId::Two),
        _ => None,
    }
}

const fn strobe_index(kind: StrobeKind) -> u16 {
    match kind {
        StrobeKind::WithRed => 0,
        StrobeKind::NoRed => 1,
    }
}

fn strobe_from_index(index: u16) -> Option<StrobeKind> {
    match index {
        0 => Some(StrobeKind::WithRed),
        1 => Some(StrobeKind::NoRed),
        _ => None,
    }
}

const fn strobe_label(kind: StrobeKind) -> &'static str {
    match kind {
        StrobeKind::WithRed => "error-strobe",
        StrobeKind::NoRed => "timeout-strobe",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_events_offset_from_their_base() {
        assert_eq!(LockEvent::Booted(Mode::Locked).to_raw(), 0x0001);
        assert_eq!(LockEvent::EntryAccepted(KeyId::Two).to_raw(), 0x0007);
        assert_eq!(
            LockEvent::from_raw(0x000D),
            LockEvent::EntryTimedOut(Mode::Locked)
        );
        assert_eq!(
            LockEvent::from_raw(0x000F),
            LockEvent::FeedbackFinished(StrobeKind::NoRed)
        );
    }

    #[test]
    fn display_names_match_transcript_vocabulary() {
        use core::fmt::Write;

        let mut line: heapless::String<32> = heapless::String::new();
        write!(line, "{}", LockEvent::EntryTimedOut(Mode::Locked)).expect("fits");
        assert_eq!(line.as_str(), "entry-timed-out locked");
    }

    #[test]
    fn gaps_and_unknown_codes_fall_back_to_custom() {
        assert_eq!(LockEvent::from_raw(0x0003), LockEvent::Custom(0x0003));
        assert_eq!(LockEvent::from_raw(0x000B), LockEvent::Custom(0x000B));
        assert_eq!(LockEvent::from_raw(0x0100), LockEvent::Custom(0x0100));
    }
}
