//! Persistence traits implemented by the firmware's flash layer
//!
//! Two concerns, two traits: small serialized settings records (theme,
//! hardware identity) and large raw image blobs, one per slot. Both are
//! synchronous from the caller's point of view; the firmware side decides
//! how to reach its storage.

use alloc::vec::Vec;

use scarab_protocol::image::Slot;

use crate::identity::HwIdentity;
use crate::theme::Theme;

/// Errors from the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Underlying flash read/write/erase failed
    Io,
    /// Stored record failed validation (magic, version, or decode)
    Corrupt,
    /// Record does not fit the space reserved for it
    TooLarge,
    /// Out of memory while reading a blob back
    NoMem,
}

/// Storage for per-slot image blobs (header + pixel data)
pub trait SlotStore {
    /// Persist a complete image blob into a slot, replacing any previous one
    fn save(&mut self, slot: Slot, blob: &[u8]) -> Result<(), StoreError>;

    /// Read back the blob stored in a slot, or `None` if the slot is empty
    fn load(&mut self, slot: Slot) -> Result<Option<Vec<u8>>, StoreError>;

    /// Erase a slot; erasing an already-empty slot is not an error
    fn delete(&mut self, slot: Slot) -> Result<(), StoreError>;
}

/// Storage for small serialized settings records
pub trait SettingsStore {
    fn save_theme(&mut self, theme: &Theme) -> Result<(), StoreError>;

    /// `None` means nothing stored yet; the caller falls back to defaults
    fn load_theme(&mut self) -> Result<Option<Theme>, StoreError>;

    fn save_identity(&mut self, identity: &HwIdentity) -> Result<(), StoreError>;

    /// `None` means nothing stored yet; the caller falls back to defaults
    fn load_identity(&mut self) -> Result<Option<HwIdentity>, StoreError>;
}

/// Combined storage access, implemented by the firmware's flash layer and
/// passed to command handlers as a single object
pub trait Store: SettingsStore + SlotStore {}

impl<T: SettingsStore + SlotStore> Store for T {}
