//! Relay wire protocol.
//!
//! Every frame is a single UTF-8 JSON object sent as a WebSocket text message.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | Ping | Peer → Relay | `{"type":"ping"}` |
//! | Echo request | Peer → Relay | `{"type":"message","content":"..."}` |
//! | Negotiation update | Peer → Relay | `{"offer"?,"answer"?,"targetSocketGuid"?}` |
//! | Pong | Relay → Peer | `{"type":"pong","timestamp"?}` |
//! | Echo | Relay → Peer | `{"type":"echo","originalMessage","socketId"}` |
//! | Error | Relay → Peer | `{"type":"error","message"}` |
//! | Connections | Relay → All | `{"type":"connections","connectedIds","count"}` |
//! | Socket table | Relay → All | `{"sockets":[{socketGuid,offer,answer,targetSocketGuid}]}` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Decoding of peer messages into [`Inbound`] |
//! | `outbound` | Relay replies and broadcast payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Peer-to-relay message decoding.
pub mod inbound;

/// Relay-to-peer message shapes.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{Inbound, NegotiationUpdate};
pub use outbound::{Outbound, SocketEntry, SocketTable};
