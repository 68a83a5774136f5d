//! Board-agnostic engine for the Scarab monitor firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Command dispatcher and handler registry
//! - Handshake and hardware identity commands
//! - Theme (color) commands and persisted settings
//! - Chunked image upload session state machine
//! - Staleness / screensaver mode tracking
//! - Bounded-wait lock discipline for shared state
//! - Storage and render traits implemented by the firmware
//!
//! Allocation is confined to image buffers: upload scratch space and the
//! live image table own `alloc::vec::Vec` blobs, everything else is
//! fixed-capacity `heapless`.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod testutil;

pub mod assets;
pub mod dispatch;
pub mod identity;
pub mod locks;
pub mod staleness;
pub mod theme;
pub mod traits;
pub mod upload;

pub use assets::{ImageTable, LoadedImage};
pub use dispatch::{
    CommandHandler, Context, DispatchOutcome, Dispatcher, Outcome, UiIntent, RESPONSE_LEN,
};
pub use identity::{HwIdentity, IdentityHandler, HANDSHAKE_QUERY};
pub use locks::{lock_bounded, LOCK_TIMEOUT};
pub use staleness::{ModeTracker, StaleThresholds, UiMode};
pub use theme::{Theme, ThemeHandler};
pub use upload::{ImageUploadHandler, UploadSession};
