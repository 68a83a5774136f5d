//! Shared state and inter-task channels
//!
//! Two mutex-guarded shared states and two queues connect the Embassy
//! tasks. Both mutexes are only ever taken with [`LOCK_TIMEOUT`]; a task
//! that cannot get a lock in time skips its work unit instead of stalling.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::Instant;
use heapless::String;

use scarab_core::dispatch::{UiIntent, RESPONSE_LEN};
use scarab_protocol::telemetry::TelemetryFrame;

use crate::display::RenderState;

pub use scarab_core::locks::LOCK_TIMEOUT;

/// Channel capacity for response lines to the host
const RESPONSE_CHANNEL_SIZE: usize = 8;

/// Channel capacity for render-side intents
const INTENT_CHANNEL_SIZE: usize = 8;

/// Latest committed telemetry and when it arrived
pub struct TelemetrySnapshot {
    pub frame: TelemetryFrame,
    /// Instant of the last commit; starts at boot so host silence from
    /// power-on also ages into the screensaver
    pub last_commit: Instant,
}

impl TelemetrySnapshot {
    pub const fn new() -> Self {
        Self {
            frame: TelemetryFrame::new(),
            last_commit: Instant::from_ticks(0),
        }
    }
}

/// Telemetry shared between the host RX task (writer) and render task
pub static TELEMETRY: Mutex<CriticalSectionRawMutex, TelemetrySnapshot> =
    Mutex::new(TelemetrySnapshot::new());

/// Render state shared between the render task and the graphics tick task
pub static RENDER: Mutex<CriticalSectionRawMutex, RenderState> = Mutex::new(RenderState::new());

/// Intents from command handlers to the render task
pub static UI_INTENTS: Channel<CriticalSectionRawMutex, UiIntent, INTENT_CHANNEL_SIZE> =
    Channel::new();

/// Response lines queued for the host TX task
pub static RESPONSES: Channel<CriticalSectionRawMutex, String<RESPONSE_LEN>, RESPONSE_CHANNEL_SIZE> =
    Channel::new();
