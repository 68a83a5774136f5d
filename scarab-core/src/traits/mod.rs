//! Hardware and platform abstraction traits

pub mod render;
pub mod store;

pub use render::RenderSurface;
pub use store::{SettingsStore, SlotStore, Store, StoreError};
