//! Flash-page emulation of the lock's byte-addressable EEPROM.
//!
//! The STM32G0 has no EEPROM, so the code slot lives in a RAM mirror that is
//! persisted to the last 2 KiB flash page on every change. The page holds a
//! magic header followed by the image; a page without the header (erased or
//! never written) is treated as an all-zero image, which boots unlocked.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use lock_core::store::{ByteStorage, RamStorage};

/// Bytes of emulated EEPROM.
pub const IMAGE_LEN: usize = 64;

/// Header marking a page written by this firmware.
pub const PAGE_MAGIC: [u8; 8] = *b"BSAFE\x00\x01\x00";

/// Header plus image; a multiple of the 8-byte flash write granule.
pub const RECORD_LEN: usize = PAGE_MAGIC.len() + IMAGE_LEN;

/// Total flash on the STM32G0B1KE.
pub const FLASH_SIZE: u32 = 512 * 1024;

pub const PAGE_SIZE: u32 = 2 * 1024;

/// Offset of the storage page from the start of flash.
pub const STORAGE_PAGE_OFFSET: u32 = FLASH_SIZE - PAGE_SIZE;

/// RAM copy of the persisted image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageImage {
    mirror: RamStorage<IMAGE_LEN>,
}

impl PageImage {
    /// Image used when the page is unreadable or was never written.
    pub const fn blank() -> Self {
        Self {
            mirror: RamStorage::new(),
        }
    }

    /// Rebuilds the image from a raw record read out of flash.
    pub fn from_record(record: &[u8; RECORD_LEN]) -> Self {
        let (header, body) = record.split_at(PAGE_MAGIC.len());
        if header != PAGE_MAGIC {
            return Self::blank();
        }

        let mut bytes = [0u8; IMAGE_LEN];
        bytes.copy_from_slice(body);
        Self {
            mirror: RamStorage::from_bytes(bytes),
        }
    }

    /// Serializes the image into the on-flash record layout.
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        record[..PAGE_MAGIC.len()].copy_from_slice(&PAGE_MAGIC);
        record[PAGE_MAGIC.len()..].copy_from_slice(self.mirror.as_bytes());
        record
    }

    pub fn read(&mut self, address: u16) -> u8 {
        self.mirror.read_byte(address)
    }

    /// Updates the mirror; returns `true` when flash must be rewritten.
    pub fn update(&mut self, address: u16, value: u8) -> bool {
        if usize::from(address) >= IMAGE_LEN || self.mirror.read_byte(address) == value {
            return false;
        }
        self.mirror.write_byte(address, value);
        true
    }
}

#[cfg(target_os = "none")]
pub use target::FlashStorage;

#[cfg(target_os = "none")]
mod target {
    use defmt::{Debug2Format, error, info};
    use embassy_stm32::flash::{Blocking, Flash};
    use lock_core::store::ByteStorage;

    use super::{PageImage, RECORD_LEN, PAGE_SIZE, STORAGE_PAGE_OFFSET};

    /// [`ByteStorage`] persisted to the last flash page.
    pub struct FlashStorage<'d> {
        flash: Flash<'d, Blocking>,
        image: PageImage,
    }

    impl<'d> FlashStorage<'d> {
        /// Loads the image from flash, falling back to a blank image on error.
        pub fn new(mut flash: Flash<'d, Blocking>) -> Self {
            let mut record = [0u8; RECORD_LEN];
            let image = match flash.blocking_read(STORAGE_PAGE_OFFSET, &mut record) {
                Ok(()) => PageImage::from_record(&record),
                Err(err) => {
                    error!("flash: storage page read failed: {}", Debug2Format(&err));
                    PageImage::blank()
                }
            };
            info!("flash: storage page loaded at offset {=u32:#x}", STORAGE_PAGE_OFFSET);

            Self { flash, image }
        }

        fn persist(&mut self) {
            let record = self.image.to_record();
            if let Err(err) = self
                .flash
                .blocking_erase(STORAGE_PAGE_OFFSET, STORAGE_PAGE_OFFSET + PAGE_SIZE)
            {
                error!("flash: storage page erase failed: {}", Debug2Format(&err));
                return;
            }
            if let Err(err) = self.flash.blocking_write(STORAGE_PAGE_OFFSET, &record) {
                error!("flash: storage page write failed: {}", Debug2Format(&err));
            }
        }
    }

    impl ByteStorage for FlashStorage<'_> {
        fn read_byte(&mut self, address: u16) -> u8 {
            self.image.read(address)
        }

        fn write_byte(&mut self, address: u16, value: u8) {
            if self.image.update(address, value) {
                self.persist();
            }
        }
    }
}
