//! Lock code representation shared by firmware and host targets.
//!
//! A code is six binary entries packed into a byte. Accumulation starts from a
//! two-bit marker (`0b11`) so that leading zero entries still shift into a
//! distinguishable value: after six entries every complete code has the form
//! `0b11xx_xxxx`.

use core::fmt;

/// Number of key entries that make up a complete code.
pub const CODE_LENGTH: u8 = 6;

/// Seed value loaded into the accumulator before the first entry.
pub const CODE_MARKER: u8 = 0b0000_0011;

/// Marker bits as they appear once all six entries have been shifted in.
pub const COMPLETE_MARKER_MASK: u8 = CODE_MARKER << CODE_LENGTH;

/// Persisted value that means "no active lock code".
pub const SENTINEL: u8 = 0;

/// Identity of the physical key that produced an entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyId {
    /// First key; contributes a `1` bit and wins when both keys read as held.
    One,
    /// Second key; contributes a `0` bit.
    Two,
}

impl KeyId {
    /// Bit shifted into the code for this key.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            KeyId::One => 1,
            KeyId::Two => 0,
        }
    }

    /// Short label used by logs and the emulator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            KeyId::One => "key-1",
            KeyId::Two => "key-2",
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Six-entry code accumulator.
///
/// The value is only meaningful as a lock code once [`Code::is_complete`]
/// reports `true`; partial codes are kept so observers can display progress.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Code {
    bits: u8,
    entries: u8,
}

impl Code {
    /// Accumulator in its reset state.
    pub const EMPTY: Code = Code {
        bits: CODE_MARKER,
        entries: 0,
    };

    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Shifts one key entry into the code.
    ///
    /// Entries beyond [`CODE_LENGTH`] are ignored; the caller is expected to
    /// consume a complete code before accepting more input.
    pub fn push(&mut self, key: KeyId) -> bool {
        if self.is_complete() {
            return false;
        }

        self.bits = (self.bits << 1) | key.bit();
        self.entries += 1;
        true
    }

    /// Returns the accumulator to its marker seed.
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }

    /// Number of entries shifted in since the last reset.
    #[must_use]
    pub const fn entries(&self) -> u8 {
        self.entries
    }

    /// Returns `true` once exactly [`CODE_LENGTH`] entries were accumulated.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.entries == CODE_LENGTH
    }

    /// Raw accumulator byte, including the marker bits.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.bits
    }

    /// Iterates the recorded entries, oldest first.
    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        (0..self.entries).rev().map(move |shift| {
            if (self.bits >> shift) & 1 == 1 {
                KeyId::One
            } else {
                KeyId::Two
            }
        })
    }
}

impl Default for Code {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in self.keys() {
            let digit = match key {
                KeyId::One => '1',
                KeyId::Two => '2',
            };
            write!(f, "{digit}")?;
        }
        for _ in self.entries..CODE_LENGTH {
            f.write_str("_")?;
        }
        Ok(())
    }
}

/// Returns `true` when a persisted byte holds an active lock code.
#[must_use]
pub const fn is_active_code(value: u8) -> bool {
    value != SENTINEL && value & COMPLETE_MARKER_MASK == COMPLETE_MARKER_MASK
}
