//! Per-connection message dispatch.
//!
//! A [`PeerHandler`] is created for each accepted connection with the shared
//! [`Registry`], the peer's own identifier, and its [`PeerSink`]. It maps the
//! connection lifecycle onto registry operations and answers each inbound frame.
//!
//! # Dispatch Table
//!
//! | Inbound | Reply to sender | Registry | Broadcast |
//! |---------|-----------------|----------|-----------|
//! | [`Inbound::Ping`] | pong | - | - |
//! | [`Inbound::Echo`] | echo | - | - |
//! | [`Inbound::EmptyEcho`] | - | - | - |
//! | [`Inbound::Negotiate`] | - | update | yes |
//! | decode error | error | - | - |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::{RelayConfig, RelayMode};
use crate::identifiers::PeerId;
use crate::protocol::{Inbound, Outbound};
use crate::registry::Registry;
use crate::transport::PeerSink;

// ============================================================================
// DispatchOptions
// ============================================================================

/// Per-connection behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Which inbound shapes are decoded.
    pub mode: RelayMode,
    /// Whether pongs carry a timestamp.
    pub pong_timestamp: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for DispatchOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            mode: config.mode,
            pong_timestamp: config.pong_timestamp,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of handling one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Answered a ping.
    Pong,
    /// Echoed content back.
    Echoed,
    /// Echo request without content; nothing sent.
    Ignored,
    /// Negotiation update committed. `applied` is `false` if the peer was
    /// already unregistered.
    Updated {
        /// Whether the peer's record existed.
        applied: bool,
    },
    /// Frame could not be decoded; an error reply carried `message`.
    Rejected {
        /// Text of the error reply.
        message: String,
    },
}

// ============================================================================
// PeerHandler
// ============================================================================

/// Dispatcher bound to one connection.
pub struct PeerHandler {
    id: PeerId,
    sink: PeerSink,
    registry: Arc<Registry>,
    options: DispatchOptions,
}

impl PeerHandler {
    /// Creates a handler for the connection behind `sink`.
    #[must_use]
    pub fn new(sink: PeerSink, registry: Arc<Registry>, options: DispatchOptions) -> Self {
        Self {
            id: sink.peer_id(),
            sink,
            registry,
            options,
        }
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Registers the connection. Every peer, including this one, receives
    /// the resulting broadcast.
    pub fn open(&self) {
        self.registry.register(self.id, self.sink.clone());
        info!(peer_id = %self.id, "Socket connected");
    }

    /// Handles one inbound text frame.
    pub fn handle_text(&self, text: &str) -> Dispatch {
        let inbound = match Inbound::decode(text, self.options.mode) {
            Ok(inbound) => inbound,
            Err(e) => {
                debug!(peer_id = %self.id, error = %e, "Rejected inbound message");
                self.reply(&Outbound::error(&e));
                return Dispatch::Rejected {
                    message: e.to_string(),
                };
            }
        };

        match inbound {
            Inbound::Ping => {
                self.reply(&Outbound::pong(self.options.pong_timestamp));
                Dispatch::Pong
            }

            Inbound::Echo { content } => {
                self.reply(&Outbound::echo(content, self.id));
                Dispatch::Echoed
            }

            Inbound::EmptyEcho => Dispatch::Ignored,

            Inbound::Negotiate(update) => {
                let applied = self.registry.update(self.id, update);
                Dispatch::Updated { applied }
            }
        }
    }

    /// Unregisters the connection. Safe to call more than once.
    pub fn close(&self) {
        self.registry.unregister(self.id);
        info!(peer_id = %self.id, "Socket disconnected");
    }

    /// Sends a direct reply. A closed connection drops it.
    fn reply(&self, message: &Outbound) {
        if let Err(e) = self.sink.send(message) {
            trace!(peer_id = %self.id, error = %e, "Reply dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
