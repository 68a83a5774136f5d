//! Live image table for the screensaver
//!
//! Uploaded images are persisted per slot; at boot and after each upload
//! the blob is loaded into RAM here so the render loop can blit without
//! touching storage. The table is owned by the render side and only
//! changed through explicit install/clear calls.

use alloc::vec::Vec;

use scarab_protocol::image::{HeaderError, ImageHeader, Slot, HEADER_SIZE};

/// A validated image blob resident in RAM
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    header: ImageHeader,
    blob: Vec<u8>,
}

impl LoadedImage {
    /// Validate a raw blob (header + pixel data) and take ownership of it
    pub fn from_blob(blob: Vec<u8>) -> Result<Self, HeaderError> {
        let header = ImageHeader::parse(&blob)?;
        Ok(Self { header, blob })
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// Pixel data without the header
    pub fn pixels(&self) -> &[u8] {
        &self.blob[HEADER_SIZE..]
    }

    /// Total stored size including the header
    pub fn byte_size(&self) -> usize {
        self.blob.len()
    }
}

/// One optional custom image per slot
#[derive(Debug, Default)]
pub struct ImageTable {
    entries: [Option<LoadedImage>; Slot::COUNT],
}

impl ImageTable {
    pub const fn new() -> Self {
        Self {
            entries: [None, None, None, None],
        }
    }

    /// Install a custom image, replacing (and freeing) any previous one
    pub fn install(&mut self, slot: Slot, image: LoadedImage) {
        self.entries[slot.index()] = Some(image);
    }

    /// Drop the custom image for a slot; the render falls back to the
    /// built-in screensaver for it
    pub fn clear(&mut self, slot: Slot) {
        self.entries[slot.index()] = None;
    }

    pub fn get(&self, slot: Slot) -> Option<&LoadedImage> {
        self.entries[slot.index()].as_ref()
    }

    /// Whether a custom image (as opposed to the built-in fallback) is loaded
    pub fn is_custom(&self, slot: Slot) -> bool {
        self.entries[slot.index()].is_some()
    }
}
