//! Per-connection outbound queue.
//!
//! Every open connection owns an unbounded channel. The [`PeerSink`] half is
//! cloned into the registry and the dispatcher; the [`PeerOutbox`] half is
//! drained by the connection's event loop, which writes to the socket.
//! Enqueueing never blocks, so fan-out can run under the registry lock.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::PeerId;
use crate::protocol::Outbound;

// ============================================================================
// Outgoing
// ============================================================================

/// Item queued for a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Text frame to send.
    Text(String),
    /// Close the socket and end the connection task.
    Close,
}

// ============================================================================
// PeerSink
// ============================================================================

/// Sending half of a connection's outbound queue.
#[derive(Debug, Clone)]
pub struct PeerSink {
    peer_id: PeerId,
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl PeerSink {
    /// Creates a connected sink/outbox pair for `peer_id`.
    #[must_use]
    pub fn channel(peer_id: PeerId) -> (Self, PeerOutbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { peer_id, tx }, PeerOutbox { rx })
    }

    /// Returns the peer this sink delivers to.
    #[inline]
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection task has ended.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(Outgoing::Text(text.into()))
            .map_err(|_| Error::connection_closed(self.peer_id))
    }

    /// Serializes and queues a message.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if serialization fails
    /// - [`Error::ConnectionClosed`] if the connection task has ended
    pub fn send(&self, message: &Outbound) -> Result<()> {
        self.send_text(message.to_json()?)
    }

    /// Asks the connection task to close the socket.
    pub fn close(&self) {
        let _ = self.tx.send(Outgoing::Close);
    }

    /// Returns `true` if the connection task has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// PeerOutbox
// ============================================================================

/// Receiving half of a connection's outbound queue.
#[derive(Debug)]
pub struct PeerOutbox {
    rx: mpsc::UnboundedReceiver<Outgoing>,
}

impl PeerOutbox {
    /// Waits for the next queued item.
    ///
    /// Returns `None` once every [`PeerSink`] is dropped.
    pub async fn recv(&mut self) -> Option<Outgoing> {
        self.rx.recv().await
    }

    /// Takes the next queued item without waiting.
    pub fn try_recv(&mut self) -> Option<Outgoing> {
        self.rx.try_recv().ok()
    }

    /// Takes every text frame queued so far without waiting.
    ///
    /// Queued [`Outgoing::Close`] requests are consumed and discarded. Use
    /// [`PeerOutbox::try_recv`] to observe them.
    pub fn drain_text(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(item) = self.try_recv() {
            if let Outgoing::Text(text) = item {
                frames.push(text);
            }
        }
        frames
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_text_is_queued() {
        let (sink, mut outbox) = PeerSink::channel(PeerId::generate());
        sink.send_text("one").expect("open");
        sink.send_text("two").expect("open");
        assert_eq!(outbox.drain_text(), vec!["one", "two"]);
    }

    #[test]
    fn test_send_serializes_message() {
        let (sink, mut outbox) = PeerSink::channel(PeerId::generate());
        sink.send(&Outbound::pong(false)).expect("open");
        assert_eq!(outbox.drain_text(), vec![r#"{"type":"pong"}"#]);
    }

    #[test]
    fn test_send_after_outbox_dropped() {
        let peer_id = PeerId::generate();
        let (sink, outbox) = PeerSink::channel(peer_id);
        drop(outbox);

        assert!(sink.is_closed());
        let err = sink.send_text("lost").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed { peer_id: id } if id == peer_id));
    }

    #[tokio::test]
    async fn test_close_is_delivered() {
        let (sink, mut outbox) = PeerSink::channel(PeerId::generate());
        sink.close();
        assert_eq!(outbox.recv().await, Some(Outgoing::Close));
    }

    #[test]
    fn test_drain_text_discards_close() {
        let (sink, mut outbox) = PeerSink::channel(PeerId::generate());
        sink.send_text("one").expect("open");
        sink.close();
        sink.send_text("two").expect("open");

        assert_eq!(outbox.drain_text(), vec!["one", "two"]);
        assert_eq!(outbox.try_recv(), None);
    }
}
