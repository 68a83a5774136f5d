//! Host RX task: UART bytes in, commands and telemetry out
//!
//! Owns the receive half of the host UART, the line framer, the command
//! handlers and the flash store. Command side effects leave through the
//! response and intent channels; telemetry frames are committed to the
//! shared snapshot afterwards, under the bounded lock wait, so the
//! dispatch itself never blocks on a lock.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::Instant;
use embedded_io_async::Read;
use heapless::{String, Vec};

use scarab_core::dispatch::{
    Context, DispatchOutcome, Dispatcher, IntentSink, ResponseSink, UiIntent, RESPONSE_LEN,
};
use scarab_core::identity::{HwIdentity, IdentityHandler};
use scarab_core::locks::lock_bounded;
use scarab_core::theme::{Theme, ThemeHandler};
use scarab_core::upload::ImageUploadHandler;
use scarab_protocol::framer::LineFramer;
use scarab_protocol::image::Slot;
use scarab_protocol::telemetry::TelemetryFrame;

use crate::channels::{LOCK_TIMEOUT, RESPONSES, TELEMETRY, UI_INTENTS};
use crate::storage::FlashStore;

/// UART read chunk size
const RX_CHUNK: usize = 64;

/// Telemetry frames that can arrive in one RX chunk
const PENDING_FRAMES: usize = 4;

/// Queues response lines on the TX channel
struct ChannelResponses {
    dropped: u32,
}

impl ResponseSink for ChannelResponses {
    fn send(&mut self, line: &str) {
        let mut out: String<RESPONSE_LEN> = String::new();
        let _ = out.push_str(line);
        if RESPONSES.try_send(out).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("response channel full, line dropped ({} total)", self.dropped);
        }
    }
}

/// Queues render-side intents
struct ChannelIntents;

impl IntentSink for ChannelIntents {
    fn publish(&mut self, intent: UiIntent) {
        if UI_INTENTS.try_send(intent).is_err() {
            warn!("intent channel full, render update dropped");
        }
    }
}

#[embassy_executor::task]
pub async fn host_rx_task(
    mut rx: BufferedUartRx,
    mut store: FlashStore,
    identity: HwIdentity,
    theme: Theme,
    slot_sizes: [Option<u32>; Slot::COUNT],
) {
    info!("Host RX task started");

    let mut identity_handler = IdentityHandler::new(identity);
    let mut upload_handler = ImageUploadHandler::new(slot_sizes);
    let mut theme_handler = ThemeHandler::new(theme);

    // Registration order is match order: handshake and name pushes are the
    // most frequent short commands, upload data lines the hottest bulk path
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(&mut identity_handler).unwrap();
    dispatcher.register(&mut upload_handler).unwrap();
    dispatcher.register(&mut theme_handler).unwrap();

    let mut responses = ChannelResponses { dropped: 0 };
    let mut intents = ChannelIntents;
    let mut framer: LineFramer = LineFramer::new();
    let mut buf = [0u8; RX_CHUNK];

    loop {
        match rx.read(&mut buf).await {
            Ok(0) => {}
            Ok(n) => {
                let mut frames: Vec<TelemetryFrame, PENDING_FRAMES> = Vec::new();
                {
                    let mut ctx = Context {
                        responses: &mut responses,
                        intents: &mut intents,
                        store: &mut store,
                    };
                    framer.feed(&buf[..n], |line| {
                        match dispatcher.dispatch(line, &mut ctx) {
                            DispatchOutcome::Handled => {}
                            DispatchOutcome::Telemetry(frame) => {
                                // Only the newest frame matters if more than
                                // PENDING_FRAMES arrive in one chunk
                                if frames.is_full() {
                                    frames.remove(0);
                                }
                                let _ = frames.push(frame);
                            }
                            DispatchOutcome::Incomplete { recognized } => {
                                debug!(
                                    "dropped incomplete telemetry line ({} fields)",
                                    recognized
                                );
                            }
                        }
                    });
                }
                for frame in frames {
                    commit_telemetry(frame).await;
                }
            }
            Err(e) => {
                warn!("host UART read error: {}", e);
            }
        }
    }
}

/// Commit one complete frame to the shared snapshot, or skip it if the
/// render side holds the lock for longer than the bounded wait
async fn commit_telemetry(frame: TelemetryFrame) {
    match lock_bounded(&TELEMETRY, LOCK_TIMEOUT).await {
        Some(mut snapshot) => {
            snapshot.frame = frame;
            snapshot.last_commit = Instant::now();
        }
        None => {
            warn!("telemetry lock timeout, frame skipped");
        }
    }
}
