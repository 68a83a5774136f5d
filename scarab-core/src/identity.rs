//! Handshake and hardware identity
//!
//! The PC client probes the serial port with `WHO_ARE_YOU?`; the reply
//! carries a hash of the names the client last pushed, so it can skip
//! re-sending them when nothing changed. Names and hash are persisted and
//! survive reboots.

use heapless::String;

use crate::dispatch::{CommandHandler, Context, Outcome, UiIntent};

/// Probe line sent by the client while scanning serial ports
pub const HANDSHAKE_QUERY: &str = "WHO_ARE_YOU?";

/// Maximum stored hardware name length
pub const NAME_LEN: usize = 32;

/// Identity hash is exactly 8 hex chars
pub const HASH_LEN: usize = 8;

/// Persisted hardware identity pushed by the client
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HwIdentity {
    pub cpu_name: String<NAME_LEN>,
    pub gpu_name: String<NAME_LEN>,
    /// Hash of the client's hardware config, echoed back in the handshake
    pub config_hash: String<HASH_LEN>,
}

impl HwIdentity {
    /// Placeholder identity used until the client pushes real names
    pub fn new() -> Self {
        Self {
            cpu_name: fit("CPU"),
            gpu_name: fit("GPU"),
            config_hash: fit("00000000"),
        }
    }
}

impl Default for HwIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy as many whole characters as fit into a bounded string
fn fit<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for c in value.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Handles `WHO_ARE_YOU?` and the `NAME_*=` family.
///
/// Registered first in the chain: the handshake is the hottest command
/// while the client is scanning ports.
pub struct IdentityHandler {
    identity: HwIdentity,
}

impl IdentityHandler {
    pub fn new(identity: HwIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &HwIdentity {
        &self.identity
    }

    fn publish_names(&self, ctx: &mut Context<'_>) {
        ctx.intents.publish(UiIntent::NamesChanged {
            cpu: self.identity.cpu_name.clone(),
            gpu: self.identity.gpu_name.clone(),
        });
    }
}

impl CommandHandler for IdentityHandler {
    fn handle(&mut self, line: &str, ctx: &mut Context<'_>) -> Outcome {
        if line == HANDSHAKE_QUERY {
            ctx.reply(format_args!(
                "SCARAB_CLIENT_OK|H:{}",
                self.identity.config_hash
            ));
            return Outcome::Claimed;
        }

        if let Some(name) = line.strip_prefix("NAME_CPU=") {
            self.identity.cpu_name = fit(name);
            // Best-effort persist; the RAM copy stays authoritative
            let _ = ctx.store.save_identity(&self.identity);
            self.publish_names(ctx);
            return Outcome::Claimed;
        }

        if let Some(name) = line.strip_prefix("NAME_GPU=") {
            self.identity.gpu_name = fit(name);
            let _ = ctx.store.save_identity(&self.identity);
            self.publish_names(ctx);
            return Outcome::Claimed;
        }

        if let Some(hash) = line.strip_prefix("NAME_HASH=") {
            // Shorter hashes are ignored, longer ones truncated
            if hash.len() >= HASH_LEN {
                self.identity.config_hash = fit(hash);
                let _ = ctx.store.save_identity(&self.identity);
            }
            return Outcome::Claimed;
        }

        Outcome::NotClaimed
    }
}
