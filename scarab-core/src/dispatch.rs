//! Command dispatcher
//!
//! Every complete line from the host is offered to a fixed chain of
//! handlers in registration order. The first handler to claim the line
//! wins. A line nobody claims is assumed to be a telemetry frame and fed
//! to the telemetry decoder.
//!
//! Handlers are synchronous and run entirely on the caller's stack; side
//! effects leave through the [`Context`]: response lines for the host,
//! [`UiIntent`]s for the render side, and the storage object. The caller
//! (the firmware's host RX task) decides how those reach the real world,
//! which keeps everything here host-testable.

use heapless::{String, Vec};

use scarab_protocol::image::Slot;
use scarab_protocol::telemetry::{self, TelemetryError, TelemetryFrame};

use crate::assets::LoadedImage;
use crate::identity::NAME_LEN;
use crate::theme::Theme;
use crate::traits::store::Store;

/// Maximum registered command handlers
pub const MAX_HANDLERS: usize = 8;

/// Maximum length of a single response line (without the trailing newline)
pub const RESPONSE_LEN: usize = 160;

/// A handler's verdict on one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The line belonged to this handler; stop the chain
    Claimed,
    /// Not this handler's command; try the next one
    NotClaimed,
}

/// Result of dispatching one complete line
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A handler claimed the line; responses/intents already emitted
    Handled,
    /// The line decoded as a complete telemetry frame; the caller commits
    /// it to shared state under its own locking rules
    Telemetry(TelemetryFrame),
    /// Unclaimed and not enough recognized telemetry fields; dropped
    Incomplete { recognized: usize },
}

/// State changes the render side must pick up.
///
/// Handlers never touch render state directly; they publish intents and
/// the render task applies them under its own lock.
#[derive(Debug, Clone, PartialEq)]
pub enum UiIntent {
    /// Hardware names for the title labels changed
    NamesChanged {
        cpu: String<NAME_LEN>,
        gpu: String<NAME_LEN>,
    },
    /// The whole theme changed (including RESET_THEME)
    ThemeChanged(Theme),
    /// A new custom image was uploaded and loaded for a slot
    SlotLoaded { slot: Slot, image: LoadedImage },
    /// A slot's custom image was deleted
    SlotCleared(Slot),
}

/// Where response lines to the host go
pub trait ResponseSink {
    /// Queue one response line; the transport adds the newline
    fn send(&mut self, line: &str);
}

/// Where [`UiIntent`]s go
pub trait IntentSink {
    fn publish(&mut self, intent: UiIntent);
}

/// Everything a handler may touch while processing one line
pub struct Context<'a> {
    pub responses: &'a mut dyn ResponseSink,
    pub intents: &'a mut dyn IntentSink,
    pub store: &'a mut dyn Store,
}

impl Context<'_> {
    /// Format and queue one response line
    pub fn reply(&mut self, args: core::fmt::Arguments<'_>) {
        let mut line: String<RESPONSE_LEN> = String::new();
        // Responses are short by construction; an oversized one is truncated
        let _ = core::fmt::write(&mut line, args);
        self.responses.send(&line);
    }
}

/// One command family (handshake, theme, image upload, ...)
pub trait CommandHandler {
    fn handle(&mut self, line: &str, ctx: &mut Context<'_>) -> Outcome;
}

/// Dispatcher registration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// All [`MAX_HANDLERS`] handler slots are taken
    Full,
}

/// Ordered handler chain with telemetry fallback
pub struct Dispatcher<'h> {
    handlers: Vec<&'h mut dyn CommandHandler, MAX_HANDLERS>,
}

impl<'h> Dispatcher<'h> {
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler to the chain. Registration order is match order,
    /// so the cheapest / most frequent matchers go first.
    pub fn register(&mut self, handler: &'h mut dyn CommandHandler) -> Result<(), RegisterError> {
        self.handlers.push(handler).map_err(|_| RegisterError::Full)
    }

    /// Offer one complete line to the chain
    pub fn dispatch(&mut self, line: &str, ctx: &mut Context<'_>) -> DispatchOutcome {
        for handler in self.handlers.iter_mut() {
            if let Outcome::Claimed = handler.handle(line, ctx) {
                return DispatchOutcome::Handled;
            }
        }

        match telemetry::parse(line) {
            Ok(frame) => DispatchOutcome::Telemetry(frame),
            Err(TelemetryError::Incomplete { recognized }) => {
                DispatchOutcome::Incomplete { recognized }
            }
        }
    }
}

impl Default for Dispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Harness;

    /// Claims any line starting with its prefix and records the hit
    struct PrefixHandler {
        prefix: &'static str,
        hits: usize,
    }

    impl PrefixHandler {
        fn new(prefix: &'static str) -> Self {
            Self { prefix, hits: 0 }
        }
    }

    impl CommandHandler for PrefixHandler {
        fn handle(&mut self, line: &str, ctx: &mut Context<'_>) -> Outcome {
            if line.starts_with(self.prefix) {
                self.hits += 1;
                ctx.reply(format_args!("{}:OK", self.prefix));
                Outcome::Claimed
            } else {
                Outcome::NotClaimed
            }
        }
    }

    #[test]
    fn test_first_claim_wins() {
        let mut a = PrefixHandler::new("AAA");
        let mut b = PrefixHandler::new("AA");
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&mut a).unwrap();
        dispatcher.register(&mut b).unwrap();

        let mut h = Harness::new();
        let outcome = dispatcher.dispatch("AAA_CMD", &mut h.ctx());
        assert_eq!(outcome, DispatchOutcome::Handled);

        drop(dispatcher);
        assert_eq!(a.hits, 1);
        assert_eq!(b.hits, 0);
        assert_eq!(h.responses.lines, ["AAA:OK"]);
    }

    #[test]
    fn test_unclaimed_falls_through_to_telemetry() {
        let mut a = PrefixHandler::new("IMG_");
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&mut a).unwrap();

        let mut h = Harness::new();
        let outcome = dispatcher.dispatch(
            "CPU:42,CPUT:55.5,GPU:31,GPUT:48.0,RAM:12.1/32.0",
            &mut h.ctx(),
        );
        match outcome {
            DispatchOutcome::Telemetry(frame) => assert_eq!(frame.cpu_percent, 42),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_incomplete() {
        let mut dispatcher = Dispatcher::new();
        let mut h = Harness::new();
        let outcome = dispatcher.dispatch("CPU:42", &mut h.ctx());
        assert_eq!(outcome, DispatchOutcome::Incomplete { recognized: 1 });
    }

    #[test]
    fn test_registration_capacity() {
        let mut handlers: std::vec::Vec<PrefixHandler> =
            (0..=MAX_HANDLERS).map(|_| PrefixHandler::new("X")).collect();
        let mut dispatcher = Dispatcher::new();
        let mut iter = handlers.iter_mut();
        for _ in 0..MAX_HANDLERS {
            dispatcher.register(iter.next().unwrap()).unwrap();
        }
        assert_eq!(
            dispatcher.register(iter.next().unwrap()),
            Err(RegisterError::Full)
        );
    }

    #[test]
    fn test_oversized_reply_truncated() {
        struct Chatty;
        impl CommandHandler for Chatty {
            fn handle(&mut self, _line: &str, ctx: &mut Context<'_>) -> Outcome {
                ctx.reply(format_args!("{:X<300}", "Y"));
                Outcome::Claimed
            }
        }

        let mut chatty = Chatty;
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&mut chatty).unwrap();

        let mut h = Harness::new();
        dispatcher.dispatch("anything", &mut h.ctx());
        assert_eq!(h.responses.lines[0].len(), RESPONSE_LEN);
    }
}
