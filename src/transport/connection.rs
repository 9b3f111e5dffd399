//! WebSocket connection and event loop.
//!
//! Each accepted socket runs one task that:
//!
//! - Registers the peer on start and unregisters it on exit
//! - Feeds inbound text frames to the [`PeerHandler`]
//! - Writes frames queued on the peer's [`PeerOutbox`]
//!
//! The task ends on a close frame, a socket error, end of stream, or an
//! [`Outgoing::Close`] request.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::dispatcher::{DispatchOptions, PeerHandler};
use crate::identifiers::PeerId;
use crate::registry::Registry;

use super::sink::{Outgoing, PeerOutbox, PeerSink};

// ============================================================================
// Connection
// ============================================================================

/// One relay connection, not yet running.
///
/// Holds the peer's handler and the receiving half of its outbound queue.
pub struct Connection {
    handler: PeerHandler,
    outbox: PeerOutbox,
}

impl Connection {
    /// Creates a connection with a fresh [`PeerId`].
    #[must_use]
    pub fn new(registry: Arc<Registry>, options: DispatchOptions) -> Self {
        let (sink, outbox) = PeerSink::channel(PeerId::generate());
        Self {
            handler: PeerHandler::new(sink, registry, options),
            outbox,
        }
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.handler.id()
    }

    /// Runs the event loop until the socket closes.
    pub async fn run<S>(self, ws_stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Self {
            handler,
            mut outbox,
        } = self;
        let peer_id = handler.id();
        let (mut ws_write, mut ws_read) = ws_stream.split();

        handler.open();

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            let outcome = handler.handle_text(text.as_str());
                            trace!(peer_id = %peer_id, ?outcome, "Message dispatched");
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(peer_id = %peer_id, "WebSocket closed by peer");
                            // Flushes the queued close reply
                            let _ = ws_write.close().await;
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(peer_id = %peer_id, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(peer_id = %peer_id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Frames queued by replies and broadcasts
                outgoing = outbox.recv() => {
                    match outgoing {
                        Some(Outgoing::Text(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(peer_id = %peer_id, error = %e, "Failed to send frame");
                                break;
                            }
                        }

                        Some(Outgoing::Close) => {
                            debug!(peer_id = %peer_id, "Close requested");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!(peer_id = %peer_id, "Outbound queue closed");
                            break;
                        }
                    }
                }
            }
        }

        handler.close();

        debug!(peer_id = %peer_id, "Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
