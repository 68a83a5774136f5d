//! Embassy async tasks
//!
//! Each task runs independently and communicates via the shared state and
//! channels in [`crate::channels`].

pub mod gfx_tick;
pub mod host_rx;
pub mod host_tx;
pub mod render;

pub use gfx_tick::gfx_tick_task;
pub use host_rx::host_rx_task;
pub use host_tx::host_tx_task;
pub use render::render_task;
