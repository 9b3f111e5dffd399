//! WebSocket relay server.
//!
//! Binds one listener, accepts WebSocket upgrades, and runs a
//! [`Connection`] task per peer. All connections share one [`Registry`]
//! whose observer is the mode's [`Broadcaster`].
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               RelayServer                 │
//! │              (single port)                │
//! │                                           │
//! │  accept loop ──► Connection task (peer a) │
//! │              ──► Connection task (peer b) │
//! │                        │                  │
//! │                        ▼                  │
//! │          Registry ──► Broadcaster         │
//! └───────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::{RelayConfig, RelayMode};
use crate::dispatcher::DispatchOptions;
use crate::error::{Error, Result};
use crate::registry::Registry;

use super::Connection;

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest time a client may take to complete the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// RelayServer
// ============================================================================

/// A running relay.
///
/// # Example
///
/// ```ignore
/// let server = RelayServer::bind(RelayConfig::default()).await?;
/// println!("WebSocket server started on {}", server.ws_url());
///
/// tokio::signal::ctrl_c().await?;
/// server.shutdown();
/// ```
pub struct RelayServer {
    /// Address the listener is bound to.
    local_addr: SocketAddr,

    /// Shared connection table.
    registry: Arc<Registry>,

    /// Behavior handed to every connection.
    options: DispatchOptions,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// RelayServer - Constructor
// ============================================================================

impl RelayServer {
    /// Binds the listener and starts the accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if binding fails.
    pub async fn bind(config: RelayConfig) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        let broadcaster = Broadcaster::new(config.mode);
        let server = Arc::new(Self {
            local_addr,
            registry: Arc::new(Registry::with_observer(Arc::new(broadcaster))),
            options: DispatchOptions::from(&config),
            shutdown: AtomicBool::new(false),
        });

        let server_clone = Arc::clone(&server);
        tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });

        info!(
            url = %server.ws_url(),
            mode = %config.mode,
            "WebSocket server started"
        );

        Ok(server)
    }
}

// ============================================================================
// RelayServer - Public API
// ============================================================================

impl RelayServer {
    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the relay mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RelayMode {
        self.options.mode
    }

    /// Returns the shared registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Stops accepting and closes every open connection.
    pub fn shutdown(&self) {
        info!("Relay shutting down");

        self.shutdown.store(true, Ordering::SeqCst);
        self.registry.disconnect_all();
    }
}

// ============================================================================
// RelayServer - Accept Loop
// ============================================================================

impl RelayServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Upgrades one TCP stream and runs it to completion.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let mut ws_stream = timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream))
            .await
            .map_err(|_| Error::handshake_timeout(HANDSHAKE_TIMEOUT.as_millis() as u64))??;

        if self.shutdown.load(Ordering::SeqCst) {
            debug!(?addr, "Upgrade finished after shutdown, closing");
            let _ = ws_stream.close(None).await;
            return Ok(());
        }

        let connection = Connection::new(Arc::clone(&self.registry), self.options);
        debug!(peer_id = %connection.peer_id(), ?addr, "WebSocket connection established");

        connection.run(ws_stream).await;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
