//! Relay-to-peer message shapes.
//!
//! Direct replies and the presence broadcast are [`Outbound`] variants tagged by
//! `type`. The negotiation broadcast is an untagged [`SocketTable`].

// ============================================================================
// Imports
// ============================================================================

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::PeerId;

// ============================================================================
// Outbound
// ============================================================================

/// A message the relay sends to peers.
///
/// # Format
///
/// ```json
/// { "type": "pong", "timestamp": "2026-01-01T00:00:00.000000Z" }
/// { "type": "echo", "originalMessage": "hi", "socketId": "uuid" }
/// { "type": "error", "message": "Unknown message type: foo" }
/// { "type": "connections", "connectedIds": ["uuid"], "count": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// Reply to a ping.
    Pong {
        /// RFC 3339 UTC send time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },

    /// Reply to an echo request.
    #[serde(rename_all = "camelCase")]
    Echo {
        /// The `content` the peer sent, `null` if it sent `null`.
        original_message: Option<String>,
        /// Identifier of the requesting peer.
        socket_id: PeerId,
    },

    /// Reply to an undecodable message.
    Error {
        /// Human-readable reason.
        message: String,
    },

    /// Presence broadcast.
    #[serde(rename_all = "camelCase")]
    Connections {
        /// Every open connection.
        connected_ids: Vec<PeerId>,
        /// Number of open connections.
        count: usize,
    },
}

impl Outbound {
    /// Creates a pong, stamped with the current time if `timestamped`.
    #[must_use]
    pub fn pong(timestamped: bool) -> Self {
        let timestamp =
            timestamped.then(|| Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
        Self::Pong { timestamp }
    }

    /// Creates an echo reply.
    #[inline]
    #[must_use]
    pub fn echo(original_message: Option<String>, socket_id: PeerId) -> Self {
        Self::Echo {
            original_message,
            socket_id,
        }
    }

    /// Creates an error reply carrying the error's display text.
    #[inline]
    #[must_use]
    pub fn error(err: &Error) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    /// Creates a presence broadcast.
    #[must_use]
    pub fn connections(connected_ids: Vec<PeerId>) -> Self {
        let count = connected_ids.len();
        Self::Connections {
            connected_ids,
            count,
        }
    }

    /// Serializes to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// SocketTable
// ============================================================================

/// Negotiation broadcast: the full per-connection table.
///
/// # Format
///
/// ```json
/// {
///   "sockets": [
///     { "socketGuid": "uuid", "offer": "", "answer": "", "targetSocketGuid": "" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketTable {
    /// One entry per open connection.
    pub sockets: Vec<SocketEntry>,
}

/// One row of the [`SocketTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketEntry {
    /// Connection identifier.
    pub socket_guid: PeerId,
    /// Last offer, empty until set.
    pub offer: String,
    /// Last answer, empty until set.
    pub answer: String,
    /// Negotiation target, empty until set.
    pub target_socket_guid: String,
}

impl SocketTable {
    /// Serializes to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
