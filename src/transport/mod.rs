//! WebSocket transport layer.
//!
//! Accepts peer connections and moves text frames between sockets and the
//! dispatcher.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Peer (browser) │         WebSocket            │  RelayServer    │
//! │                 │◄────────────────────────────►│  → Connection   │
//! │  WebSocket      │        0.0.0.0:8181          │  → PeerHandler  │
//! │  Client         │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `RelayServer::bind` - Bind listener and spawn accept loop
//! 2. Accept TCP, upgrade to WebSocket, assign a `PeerId`
//! 3. `Connection::run` - Register, dispatch frames, write queued frames
//! 4. Close frame or error - Unregister and end the task
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-connection event loop |
//! | `server` | Listener and accept loop |
//! | `sink` | Per-connection outbound queue |

// ============================================================================
// Submodules
// ============================================================================

/// Per-connection event loop.
pub mod connection;

/// WebSocket listener and accept loop.
pub mod server;

/// Per-connection outbound queue.
pub mod sink;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use server::RelayServer;
pub use sink::{Outgoing, PeerOutbox, PeerSink};
