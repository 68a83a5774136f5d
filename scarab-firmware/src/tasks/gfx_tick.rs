//! Graphics tick task: advances the engine clock at 100Hz
//!
//! Animations and redraw scheduling run off this clock. The elapsed time
//! is measured, not assumed, so a cycle lost to a lock timeout shows up
//! as a larger step on the next tick instead of a slowed-down clock.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use scarab_core::locks::lock_bounded;
use scarab_core::traits::render::RenderSurface;

use crate::channels::{LOCK_TIMEOUT, RENDER};

/// Graphics engine tick period
const TICK_INTERVAL: Duration = Duration::from_millis(10);

#[embassy_executor::task]
pub async fn gfx_tick_task() {
    info!("Gfx tick task started");

    let mut ticker = Ticker::every(TICK_INTERVAL);
    let mut last = Instant::now();

    loop {
        ticker.next().await;
        if let Some(mut render) = lock_bounded(&RENDER, LOCK_TIMEOUT).await {
            let now = Instant::now();
            render.screens.tick((now - last).as_millis() as u32);
            last = now;
        }
        // On timeout the clock catches up on the next successful tick
    }
}
