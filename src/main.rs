//! Signal relay binary entry point.
//!
//! # Usage
//!
//! ```bash
//! # Negotiation relay on the default address (0.0.0.0:8181)
//! signal-relay
//!
//! # Presence-only relay on localhost
//! signal-relay --bind 127.0.0.1 --port 9000 --mode presence
//!
//! # Verbose logging
//! signal-relay --debug
//! RUST_LOG=signal_relay=trace signal-relay
//! ```

use clap::Parser;
use signal_relay::config::{DEFAULT_PORT, RelayMode};
use signal_relay::{RelayConfig, RelayServer, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebSocket signaling relay
///
/// Broadcasts every connected peer's negotiation state to all peers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_BIND")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RELAY_PORT")]
    port: u16,

    /// What state is tracked and broadcast
    #[arg(short, long, value_enum, default_value_t = RelayMode::Negotiation, env = "RELAY_MODE")]
    mode: RelayMode,

    /// Omit the timestamp from pong replies
    #[arg(long)]
    no_pong_timestamp: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = RelayConfig::builder()
        .bind(args.bind)
        .port(args.port)
        .mode(args.mode)
        .pong_timestamp(!args.no_pong_timestamp)
        .build()?;

    let server = RelayServer::bind(config).await?;

    tokio::signal::ctrl_c().await?;
    info!(connections = server.connection_count(), "Ctrl+C received");
    server.shutdown();

    Ok(())
}

/// Installs the tracing subscriber. `RUST_LOG` overrides `--debug`.
fn init_logging(debug: bool) {
    let fallback = if debug {
        "signal_relay=debug"
    } else {
        "signal_relay=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
