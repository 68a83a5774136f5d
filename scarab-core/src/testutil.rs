//! In-memory doubles for the firmware-side traits, shared by handler tests

use alloc::vec::Vec;

use scarab_protocol::image::Slot;

use crate::dispatch::{Context, IntentSink, ResponseSink, UiIntent};
use crate::identity::HwIdentity;
use crate::theme::Theme;
use crate::traits::store::{SettingsStore, SlotStore, StoreError};

/// Collects response lines
#[derive(Default)]
pub struct RecordingSink {
    pub lines: std::vec::Vec<std::string::String>,
}

impl ResponseSink for RecordingSink {
    fn send(&mut self, line: &str) {
        self.lines.push(std::string::String::from(line));
    }
}

/// Collects published intents
#[derive(Default)]
pub struct IntentLog {
    pub intents: std::vec::Vec<UiIntent>,
}

impl IntentSink for IntentLog {
    fn publish(&mut self, intent: UiIntent) {
        self.intents.push(intent);
    }
}

/// In-memory settings + slot storage
#[derive(Default)]
pub struct MemStore {
    pub theme: Option<Theme>,
    pub identity: Option<HwIdentity>,
    pub slots: [Option<Vec<u8>>; Slot::COUNT],
    /// Force every save to fail, for error-path tests
    pub fail_saves: bool,
}

impl SlotStore for MemStore {
    fn save(&mut self, slot: Slot, blob: &[u8]) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io);
        }
        self.slots[slot.index()] = Some(Vec::from(blob));
        Ok(())
    }

    fn load(&mut self, slot: Slot) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.slots[slot.index()].clone())
    }

    fn delete(&mut self, slot: Slot) -> Result<(), StoreError> {
        self.slots[slot.index()] = None;
        Ok(())
    }
}

impl SettingsStore for MemStore {
    fn save_theme(&mut self, theme: &Theme) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io);
        }
        self.theme = Some(*theme);
        Ok(())
    }

    fn load_theme(&mut self) -> Result<Option<Theme>, StoreError> {
        Ok(self.theme)
    }

    fn save_identity(&mut self, identity: &HwIdentity) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io);
        }
        self.identity = Some(identity.clone());
        Ok(())
    }

    fn load_identity(&mut self) -> Result<Option<HwIdentity>, StoreError> {
        Ok(self.identity.clone())
    }
}

/// One bundle of sinks and storage, borrowed out as a [`Context`]
#[derive(Default)]
pub struct Harness {
    pub responses: RecordingSink,
    pub intents: IntentLog,
    pub store: MemStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context {
            responses: &mut self.responses,
            intents: &mut self.intents,
            store: &mut self.store,
        }
    }
}
