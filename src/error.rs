//! Error types for the signaling relay.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use signal_relay::{RelayConfig, RelayServer, Result};
//!
//! async fn example() -> Result<()> {
//!     let server = RelayServer::bind(RelayConfig::default()).await?;
//!     println!("listening on {}", server.ws_url());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Decode | [`Error::InvalidJson`], [`Error::InvalidMessage`], [`Error::MissingType`], [`Error::UnknownType`] |
//! | Delivery | [`Error::ConnectionClosed`], [`Error::HandshakeTimeout`] |
//! | Setup | [`Error::Config`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Decode errors are never fatal. Their `Display` text is sent verbatim to the
//! peer as the `message` of an `error` reply.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::PeerId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// Inbound text is not valid JSON.
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Parser error description.
        message: String,
    },

    /// Inbound JSON does not have the shape of a message.
    ///
    /// Returned for non-object payloads and for known fields carrying
    /// the wrong JSON type.
    #[error("Invalid message: {message}")]
    InvalidMessage {
        /// Description of the shape mismatch.
        message: String,
    },

    /// Inbound message has no `type` discriminator.
    #[error("Message must have a 'type' property")]
    MissingType,

    /// Inbound message carries an unrecognized `type`.
    #[error("Unknown message type: {kind}")]
    UnknownType {
        /// The unrecognized discriminator, as text.
        kind: String,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// The peer's connection task has already terminated.
    #[error("Connection closed: {peer_id}")]
    ConnectionClosed {
        /// Peer whose outbound queue is gone.
        peer_id: PeerId,
    },

    /// The WebSocket upgrade did not finish in time.
    #[error("WebSocket handshake timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Invalid relay configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid JSON error.
    #[inline]
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    /// Creates an invalid message error.
    #[inline]
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Creates an unknown message type error.
    #[inline]
    pub fn unknown_type(kind: impl Into<String>) -> Self {
        Self::UnknownType { kind: kind.into() }
    }

    /// Creates a connection closed error.
    #[inline]
    pub fn connection_closed(peer_id: PeerId) -> Self {
        Self::ConnectionClosed { peer_id }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn handshake_timeout(timeout_ms: u64) -> Self {
        Self::HandshakeTimeout { timeout_ms }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from decoding an inbound message.
    ///
    /// These are reported to the sender and never end the connection.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson { .. }
                | Self::InvalidMessage { .. }
                | Self::MissingType
                | Self::UnknownType { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed { .. } | Self::HandshakeTimeout { .. } | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
