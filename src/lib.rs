//! Signal Relay - WebSocket signaling hub for peer-to-peer negotiation.
//!
//! Peers connect over WebSocket, exchange session-description payloads
//! (offers/answers) and liveness pings. The relay keeps every connected
//! peer's negotiation state in one table and pushes the whole table to every
//! peer after each change. Payloads are never interpreted.
//!
//! # Architecture
//!
//! ```text
//! Transport ──► Dispatcher ──► Registry ──► Broadcaster ──► Transport
//!  (socket)     (per frame)    (commit)     (fan-out)       (every peer)
//! ```
//!
//! Key design principles:
//!
//! - One [`Registry`] per process, guarded by a single lock
//! - Every registry mutation is followed by a full-state broadcast
//! - Inbound frames decode into a closed set of [`protocol::Inbound`] shapes
//! - Pings and echoes never touch shared state
//!
//! # Quick Start
//!
//! ```no_run
//! use signal_relay::{RelayConfig, RelayMode, RelayServer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RelayConfig::builder()
//!         .port(8181)
//!         .mode(RelayMode::Negotiation)
//!         .build()?;
//!
//!     let server = RelayServer::bind(config).await?;
//!     println!("WebSocket server started on {}", server.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`broadcast`] | Snapshot rendering and fan-out |
//! | [`config`] | [`RelayConfig`] and [`RelayMode`] |
//! | [`dispatcher`] | Per-connection message handling |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`PeerId`] |
//! | [`protocol`] | Wire message types |
//! | [`registry`] | Connection table |
//! | [`transport`] | WebSocket server and connections |

// ============================================================================
// Modules
// ============================================================================

/// Snapshot rendering and fan-out.
pub mod broadcast;

/// Relay configuration.
pub mod config;

/// Per-connection message dispatch.
pub mod dispatcher;

/// Error types and result aliases.
pub mod error;

/// Connection identifiers.
pub mod identifiers;

/// Wire message types.
pub mod protocol;

/// Connection registry.
pub mod registry;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use broadcast::Broadcaster;
pub use config::{RelayConfig, RelayConfigBuilder, RelayMode};
pub use dispatcher::{Dispatch, DispatchOptions, PeerHandler};
pub use error::{Error, Result};
pub use identifiers::PeerId;
pub use registry::{Field, MutationObserver, PeerState, Registry, Snapshot};
pub use transport::{PeerSink, RelayServer};
