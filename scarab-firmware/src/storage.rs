//! Flash-backed persistence
//!
//! The top 832KB of the 4MB flash is kept out of the code region by
//! memory.x and split into five partitions:
//!
//! ```text
//! 0x32_0000  slot 0 image   (192KB)
//! 0x35_0000  slot 1 image   (192KB)
//! 0x38_0000  slot 2 image   (192KB)
//! 0x3B_0000  slot 3 image   (192KB)
//! 0x3E_0000  settings       (64KB, sequential-storage map)
//! ```
//!
//! Settings records (theme, identity) go through the wear-levelled
//! sequential-storage map as postcard values. Image slots are written
//! raw so a load is a header check plus one contiguous read.

use core::ops::Range;

use alloc::vec::Vec;
use embassy_futures::block_on;
use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE, PAGE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;
use serde::de::DeserializeOwned;
use serde::Serialize;

use scarab_core::identity::HwIdentity;
use scarab_core::theme::Theme;
use scarab_core::traits::store::{SettingsStore, SlotStore, StoreError};
use scarab_protocol::image::{Slot, HEADER_SIZE, IMG_MAGIC, MAX_PIXEL_BYTES};

/// Total flash size, used by the embassy-rp flash driver
pub const FLASH_SIZE: usize = 4 * 1024 * 1024;

/// Size of each raw image slot partition
const SLOT_PARTITION_SIZE: usize = 192 * 1024;

/// Size of the sequential-storage settings partition
const SETTINGS_PARTITION_SIZE: usize = 64 * 1024;

/// Flash offset of the first image slot partition
const SLOTS_BASE: usize = FLASH_SIZE - SETTINGS_PARTITION_SIZE - Slot::COUNT * SLOT_PARTITION_SIZE;

/// Flash range of the settings partition
const SETTINGS_RANGE: Range<u32> =
    (FLASH_SIZE - SETTINGS_PARTITION_SIZE) as u32..FLASH_SIZE as u32;

/// Scratch size for postcard-encoded settings records
const SETTINGS_BUF: usize = 256;

// A slot partition must hold the largest accepted image
const _: () = assert!(SLOT_PARTITION_SIZE >= HEADER_SIZE + MAX_PIXEL_BYTES);

/// Keys for the settings map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum StorageKey {
    Theme = 0,
    Identity = 1,
}

impl map::Key for StorageKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, map::SerializationError> {
        if buffer.is_empty() {
            return Err(map::SerializationError::BufferTooSmall);
        }
        buffer[0] = *self as u8;
        Ok(1)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), map::SerializationError> {
        match buffer.first() {
            Some(0) => Ok((StorageKey::Theme, 1)),
            Some(1) => Ok((StorageKey::Identity, 1)),
            Some(_) => Err(map::SerializationError::InvalidFormat),
            None => Err(map::SerializationError::BufferTooSmall),
        }
    }
}

/// Persistence over the RP2350's QSPI flash
pub struct FlashStore {
    flash: Flash<'static, FLASH, Async, FLASH_SIZE>,
}

impl FlashStore {
    pub fn new(flash: Peri<'static, FLASH>, dma: Peri<'static, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }

    fn save_record<T: Serialize>(&mut self, key: StorageKey, value: &T) -> Result<(), StoreError> {
        let mut buf = [0u8; SETTINGS_BUF];
        let data: &[u8] =
            postcard::to_slice(value, &mut buf).map_err(|_| StoreError::TooLarge)?;
        let mut scratch = [0u8; SETTINGS_BUF + 32];
        block_on(map::store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut scratch,
            &key,
            &data,
        ))
        .map_err(|_| StoreError::Io)
    }

    fn load_record<T: DeserializeOwned>(
        &mut self,
        key: StorageKey,
    ) -> Result<Option<T>, StoreError> {
        let mut scratch = [0u8; SETTINGS_BUF + 32];
        match block_on(map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut scratch,
            &key,
        )) {
            Ok(Some(data)) => postcard::from_bytes(data)
                .map(Some)
                .map_err(|_| StoreError::Corrupt),
            Ok(None) => Ok(None),
            Err(_) => Err(StoreError::Io),
        }
    }

    fn slot_offset(slot: Slot) -> u32 {
        (SLOTS_BASE + slot.index() * SLOT_PARTITION_SIZE) as u32
    }
}

impl SettingsStore for FlashStore {
    fn save_theme(&mut self, theme: &Theme) -> Result<(), StoreError> {
        self.save_record(StorageKey::Theme, theme)
    }

    fn load_theme(&mut self) -> Result<Option<Theme>, StoreError> {
        let theme: Option<Theme> = self.load_record(StorageKey::Theme)?;
        Ok(theme.filter(Theme::is_valid))
    }

    fn save_identity(&mut self, identity: &HwIdentity) -> Result<(), StoreError> {
        self.save_record(StorageKey::Identity, identity)
    }

    fn load_identity(&mut self) -> Result<Option<HwIdentity>, StoreError> {
        self.load_record(StorageKey::Identity)
    }
}

impl SlotStore for FlashStore {
    fn save(&mut self, slot: Slot, blob: &[u8]) -> Result<(), StoreError> {
        if blob.len() > SLOT_PARTITION_SIZE {
            return Err(StoreError::TooLarge);
        }
        let base = Self::slot_offset(slot);
        let erase_len = blob.len().div_ceil(ERASE_SIZE) * ERASE_SIZE;
        self.flash
            .blocking_erase(base, base + erase_len as u32)
            .map_err(|_| StoreError::Io)?;
        for (i, chunk) in blob.chunks(PAGE_SIZE).enumerate() {
            let addr = base + (i * PAGE_SIZE) as u32;
            if chunk.len() == PAGE_SIZE {
                self.flash
                    .blocking_write(addr, chunk)
                    .map_err(|_| StoreError::Io)?;
            } else {
                let mut page = [0xFFu8; PAGE_SIZE];
                page[..chunk.len()].copy_from_slice(chunk);
                self.flash
                    .blocking_write(addr, &page)
                    .map_err(|_| StoreError::Io)?;
            }
        }
        Ok(())
    }

    fn load(&mut self, slot: Slot) -> Result<Option<Vec<u8>>, StoreError> {
        let base = Self::slot_offset(slot);
        let mut header = [0u8; HEADER_SIZE];
        self.flash
            .blocking_read(base, &mut header)
            .map_err(|_| StoreError::Io)?;
        // Erased flash reads back 0xFF, which fails the magic check
        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != IMG_MAGIC {
            return Ok(None);
        }
        let data_size =
            u32::from_le_bytes([header[12], header[13], header[14], header[15]]) as usize;
        if data_size > MAX_PIXEL_BYTES {
            return Err(StoreError::Corrupt);
        }
        let total = HEADER_SIZE + data_size;
        let mut blob = Vec::new();
        blob.try_reserve_exact(total).map_err(|_| StoreError::NoMem)?;
        blob.resize(total, 0);
        self.flash
            .blocking_read(base, &mut blob)
            .map_err(|_| StoreError::Io)?;
        Ok(Some(blob))
    }

    fn delete(&mut self, slot: Slot) -> Result<(), StoreError> {
        // Erasing the first sector destroys the header magic, which is
        // all a load looks at
        let base = Self::slot_offset(slot);
        self.flash
            .blocking_erase(base, base + ERASE_SIZE as u32)
            .map_err(|_| StoreError::Io)
    }
}
