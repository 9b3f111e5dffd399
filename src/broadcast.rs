//! Full-state fan-out to every open connection.
//!
//! The [`Broadcaster`] is the registry's [`MutationObserver`]. After every
//! commit it renders the snapshot once and queues the same frame for every
//! recipient in that snapshot.
//!
//! | Mode | Frame |
//! |------|-------|
//! | [`RelayMode::Presence`] | [`Outbound::Connections`] |
//! | [`RelayMode::Negotiation`] | [`SocketTable`] |

// ============================================================================
// Imports
// ============================================================================

use tracing::{error, trace};

use crate::config::RelayMode;
use crate::error::Result;
use crate::protocol::{Outbound, SocketEntry, SocketTable};
use crate::registry::{MutationObserver, PeerState, Snapshot};

// ============================================================================
// Broadcaster
// ============================================================================

/// Renders registry snapshots and sends them to every peer.
#[derive(Debug, Clone, Copy)]
pub struct Broadcaster {
    mode: RelayMode,
}

impl Broadcaster {
    /// Creates a broadcaster for `mode`.
    #[inline]
    #[must_use]
    pub const fn new(mode: RelayMode) -> Self {
        Self { mode }
    }

    /// Returns the relay mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> RelayMode {
        self.mode
    }

    /// Serializes `snapshot` into one wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn render(&self, snapshot: &Snapshot) -> Result<String> {
        match self.mode {
            RelayMode::Presence => Outbound::connections(snapshot.ids().collect()).to_json(),
            RelayMode::Negotiation => SocketTable::from(snapshot).to_json(),
        }
    }

    /// Sends the rendered snapshot to every recipient.
    ///
    /// Delivery failures are skipped. Returns the number of peers the frame
    /// was queued for.
    pub fn broadcast(&self, snapshot: &Snapshot) -> usize {
        let frame = match self.render(snapshot) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to render broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for sink in snapshot.recipients() {
            match sink.send_text(frame.as_str()) {
                Ok(()) => delivered += 1,
                Err(e) => trace!(error = %e, "Broadcast skipped closed peer"),
            }
        }

        trace!(
            delivered,
            recipients = snapshot.recipients().len(),
            "Broadcast sent"
        );
        delivered
    }
}

impl MutationObserver for Broadcaster {
    fn on_commit(&self, snapshot: &Snapshot) {
        self.broadcast(snapshot);
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&PeerState> for SocketEntry {
    fn from(state: &PeerState) -> Self {
        Self {
            socket_guid: state.id,
            offer: state.offer.clone(),
            answer: state.answer.clone(),
            target_socket_guid: state.target.clone(),
        }
    }
}

impl From<&Snapshot> for SocketTable {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            sockets: snapshot.peers().iter().map(SocketEntry::from).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
