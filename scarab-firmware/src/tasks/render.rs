//! Render task: 1Hz UI refresh, staleness tracking, watchdog
//!
//! Every second this task drains pending render intents, snapshots the
//! shared telemetry, classifies how stale it is and pushes the result
//! onto the panels. Either lock can time out; a timed-out cycle is
//! skipped and the pending intents are retried next cycle, so a
//! screensaver enter/exit edge is never lost to a skipped cycle.

use defmt::*;
use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Instant, Ticker};
use heapless::Vec;

use scarab_core::dispatch::UiIntent;
use scarab_core::locks::lock_bounded;
use scarab_core::staleness::{ModeTracker, StaleThresholds, UiMode};
use scarab_core::traits::render::RenderSurface;

use crate::channels::{LOCK_TIMEOUT, RENDER, TELEMETRY, UI_INTENTS};
use crate::display::RenderState;

/// UI refresh period
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Intents carried across skipped cycles
const PENDING_INTENTS: usize = 8;

#[embassy_executor::task]
pub async fn render_task(mut watchdog: Watchdog) {
    info!("Render task started");

    let mut ticker = Ticker::every(RENDER_INTERVAL);
    let mut tracker = ModeTracker::new();
    let mut pending: Vec<UiIntent, PENDING_INTENTS> = Vec::new();

    loop {
        ticker.next().await;
        // The loop turning over is what the watchdog certifies; skipped
        // cycles from lock timeouts still feed it
        watchdog.feed();

        while !pending.is_full() {
            match UI_INTENTS.try_receive() {
                Ok(intent) => {
                    let _ = pending.push(intent);
                }
                Err(_) => break,
            }
        }

        let (frame, last_commit) = match lock_bounded(&TELEMETRY, LOCK_TIMEOUT).await {
            Some(snapshot) => (snapshot.frame.clone(), snapshot.last_commit),
            None => {
                warn!("telemetry lock timeout, render cycle skipped");
                continue;
            }
        };

        let elapsed_ms = (Instant::now() - last_commit).as_millis();
        let mode = UiMode::classify(elapsed_ms, &StaleThresholds::DEFAULT);

        match lock_bounded(&RENDER, LOCK_TIMEOUT).await {
            Some(mut render) => {
                for intent in core::mem::take(&mut pending) {
                    render.apply_intent(intent);
                }

                // The mode edge is latched only once the lock is held, so
                // an enter/exit transition survives skipped cycles
                if let Some(edge) = tracker.observe(mode) {
                    let RenderState { screens, images } = &mut *render;
                    match edge {
                        UiMode::Screensaver => {
                            info!("host quiet for {}ms, entering screensaver", elapsed_ms);
                            screens.enter_screensaver(images);
                        }
                        UiMode::Stale => {
                            info!("telemetry stale ({}ms since last frame)", elapsed_ms);
                        }
                        UiMode::Live => {
                            info!("telemetry live again");
                            screens.exit_screensaver();
                        }
                    }
                }

                if tracker.current() != UiMode::Screensaver {
                    render
                        .screens
                        .apply_snapshot(&frame, tracker.current() == UiMode::Stale);
                }
            }
            None => {
                // Pending intents stay queued for the next cycle
                warn!("render lock timeout, render cycle skipped");
            }
        }
    }
}
