//! Persistent code slot.
//!
//! The lock keeps exactly one byte across power loss: the active lock code, or
//! [`SENTINEL`] when unlocked. Targets supply byte-addressable persistent
//! memory through [`ByteStorage`]; [`SlotStore`] pins the code to its slot.

use crate::code::SENTINEL;

/// Address of the code slot inside the persistent store.
pub const CODE_SLOT_ADDRESS: u16 = 23;

/// Byte-addressable persistent memory (EEPROM or an emulation of it).
///
/// Writes are synchronous and durable before the call returns. Implementations
/// that can fail must resolve the failure internally; the lock has no recovery
/// path for storage faults.
pub trait ByteStorage {
    fn read_byte(&mut self, address: u16) -> u8;

    fn write_byte(&mut self, address: u16, value: u8);
}

impl<T: ByteStorage + ?Sized> ByteStorage for &mut T {
    fn read_byte(&mut self, address: u16) -> u8 {
        (**self).read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        (**self).write_byte(address, value);
    }
}

/// Persistent lock code slot consumed by the state machine.
pub trait CodeStore {
    /// Reads the persisted value.
    fn load(&mut self) -> u8;

    /// Persists `value`.
    fn save(&mut self, value: u8);

    /// Persists the sentinel.
    fn clear(&mut self) {
        self.save(SENTINEL);
    }
}

/// [`CodeStore`] backed by one byte of a [`ByteStorage`].
#[derive(Debug)]
pub struct SlotStore<S> {
    storage: S,
    address: u16,
}

impl<S: ByteStorage> SlotStore<S> {
    /// Uses the standard slot at [`CODE_SLOT_ADDRESS`].
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self::at(storage, CODE_SLOT_ADDRESS)
    }

    #[must_use]
    pub const fn at(storage: S, address: u16) -> Self {
        Self { storage, address }
    }

    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: ByteStorage> CodeStore for SlotStore<S> {
    fn load(&mut self) -> u8 {
        self.storage.read_byte(self.address)
    }

    fn save(&mut self, value: u8) {
        self.storage.write_byte(self.address, value);
    }
}

/// Volatile [`ByteStorage`] used by tests and as a mirror for page-based
/// persistence. Out-of-range reads return `0xFF` (erased) and out-of-range
/// writes are dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RamStorage<const N: usize> {
    bytes: [u8; N],
    writes: u32,
}

impl<const N: usize> RamStorage<N> {
    /// Creates zero-filled storage.
    #[must_use]
    pub const fn new() -> Self {
        Self::from_bytes([0; N])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes, writes: 0 }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Number of accepted writes since creation.
    #[must_use]
    pub const fn write_count(&self) -> u32 {
        self.writes
    }
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteStorage for RamStorage<N> {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.bytes
            .get(usize::from(address))
            .copied()
            .unwrap_or(u8::MAX)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        if let Some(slot) = self.bytes.get_mut(usize::from(address)) {
            *slot = value;
            self.writes = self.writes.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_complete_code_survives_save_and_clear() {
        let mut store = SlotStore::new(RamStorage::<64>::new());
        for code in 0xC0..=0xFF_u8 {
            store.save(code);
            assert_eq!(store.load(), code, "code {code:#010b}");
            assert_eq!(store.storage().as_bytes()[23], code);

            store.clear();
            assert_eq!(store.load(), SENTINEL, "clear after {code:#010b}");
        }
        assert_eq!(store.storage().write_count(), 128);
    }

    #[test]
    fn slot_outside_storage_reads_erased() {
        let mut store = SlotStore::at(RamStorage::<8>::new(), 40);
        store.save(0xC3);
        assert_eq!(store.load(), 0xFF);
        assert_eq!(store.storage().write_count(), 0);
    }

    #[test]
    fn borrowed_storage_survives_store_drop() {
        let mut backing = RamStorage::<32>::new();
        {
            let mut store = SlotStore::new(&mut backing);
            store.save(0xC1);
        }
        assert_eq!(backing.read_byte(CODE_SLOT_ADDRESS), 0xC1);
    }
}
