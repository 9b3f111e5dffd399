//! Relay configuration.
//!
//! Provides [`RelayConfig`] and a fluent [`RelayConfigBuilder`].
//!
//! # Example
//!
//! ```no_run
//! use signal_relay::{RelayConfig, RelayMode};
//!
//! # fn example() -> signal_relay::Result<()> {
//! let config = RelayConfig::builder()
//!     .bind("127.0.0.1")
//!     .port(9000)
//!     .mode(RelayMode::Presence)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (all interfaces).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8181;

// ============================================================================
// RelayMode
// ============================================================================

/// Selects which state the relay tracks and broadcasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum RelayMode {
    /// Track presence only. Broadcasts `connections` summaries.
    Presence,

    /// Track offer/answer/target per connection. Broadcasts the `sockets` table.
    #[default]
    Negotiation,
}

impl RelayMode {
    /// Returns `true` if inbound negotiation fields are decoded.
    #[inline]
    #[must_use]
    pub const fn accepts_negotiation(self) -> bool {
        matches!(self, Self::Negotiation)
    }

    /// Returns the mode name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Presence => "presence",
            Self::Negotiation => "negotiation",
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RelayConfig
// ============================================================================

/// Runtime configuration for a relay server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address to listen on.
    pub bind_ip: IpAddr,
    /// Port to listen on (0 for random).
    pub port: u16,
    /// What state is tracked and broadcast.
    pub mode: RelayMode,
    /// Whether pong replies carry a timestamp.
    pub pong_timestamp: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_ip: DEFAULT_BIND_IP,
            port: DEFAULT_PORT,
            mode: RelayMode::default(),
            pong_timestamp: true,
        }
    }
}

impl RelayConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::new()
    }

    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

// ============================================================================
// RelayConfigBuilder
// ============================================================================

/// Builder for [`RelayConfig`].
///
/// Unset fields fall back to [`RelayConfig::default`].
#[derive(Debug, Default, Clone)]
pub struct RelayConfigBuilder {
    /// Raw bind address, parsed on build.
    bind: Option<String>,
    port: Option<u16>,
    mode: Option<RelayMode>,
    pong_timestamp: Option<bool>,
}

impl RelayConfigBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address (e.g. `"0.0.0.0"`, `"::1"`).
    #[inline]
    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = Some(addr.into());
        self
    }

    /// Sets the listening port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the relay mode.
    #[inline]
    #[must_use]
    pub fn mode(mut self, mode: RelayMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Enables or disables pong timestamps.
    #[inline]
    #[must_use]
    pub fn pong_timestamp(mut self, enabled: bool) -> Self {
        self.pong_timestamp = Some(enabled);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the bind address is not an IP address.
    pub fn build(self) -> Result<RelayConfig> {
        let defaults = RelayConfig::default();
        let bind_ip = self.validate_bind()?.unwrap_or(defaults.bind_ip);

        Ok(RelayConfig {
            bind_ip,
            port: self.port.unwrap_or(defaults.port),
            mode: self.mode.unwrap_or(defaults.mode),
            pong_timestamp: self.pong_timestamp.unwrap_or(defaults.pong_timestamp),
        })
    }

    fn validate_bind(&self) -> Result<Option<IpAddr>> {
        let Some(raw) = self.bind.as_deref() else {
            return Ok(None);
        };

        raw.trim()
            .parse::<IpAddr>()
            .map(Some)
            .map_err(|e| Error::config(format!("Invalid bind address '{raw}': {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8181");
        assert_eq!(config.mode, RelayMode::Negotiation);
        assert!(config.pong_timestamp);
    }

    #[test]
    fn test_empty_builder_matches_default() {
        let config = RelayConfig::builder().build().expect("build");
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = RelayConfig::builder()
            .bind("127.0.0.1")
            .port(0)
            .mode(RelayMode::Presence)
            .pong_timestamp(false)
            .build()
            .expect("build");

        assert_eq!(config.bind_ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 0);
        assert_eq!(config.mode, RelayMode::Presence);
        assert!(!config.pong_timestamp);
    }

    #[test]
    fn test_builder_accepts_ipv6() {
        let config = RelayConfig::builder().bind("::1").build().expect("build");
        assert!(config.bind_ip.is_ipv6());
    }

    #[test]
    fn test_builder_rejects_hostname() {
        let err = RelayConfig::builder().bind("localhost").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("localhost"));
    }

    #[test]
    fn test_mode_display_matches_cli_names() {
        use clap::ValueEnum;

        for mode in RelayMode::value_variants() {
            let value = mode.to_possible_value().expect("not skipped");
            assert_eq!(value.get_name(), mode.to_string());
            assert_eq!(RelayMode::from_str(mode.as_str(), false).unwrap(), *mode);
        }
        assert!(RelayMode::from_str("chat", false).is_err());
    }
}
