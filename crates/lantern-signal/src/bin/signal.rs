//! Lantern Signal Relay
//!
//! Lightweight WebSocket signaling relay for browser peer-to-peer calls.
//!
//! # Usage
//!
//! ```bash
//! # Static STUN only (default)
//! lantern-signal --port 8080
//!
//! # With ephemeral TURN credentials from Twilio
//! TWILIO_ACCOUNT_SID=AC... TWILIO_AUTH_TOKEN=... lantern-signal
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lantern_signal::{IceProvider, SignalServer, TwilioConfig, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "lantern-signal")]
#[command(about = "Signaling relay for browser peer-to-peer calls")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Twilio account SID for ephemeral TURN credentials
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    twilio_account_sid: Option<String>,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    twilio_auth_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    let twilio = match (args.twilio_account_sid, args.twilio_auth_token) {
        (Some(account_sid), Some(auth_token)) => Some(TwilioConfig {
            account_sid,
            auth_token,
        }),
        _ => None,
    };

    info!("Starting Lantern Signal Relay");
    if twilio.is_some() {
        info!("TURN credentials configured, fetching ICE servers per connection");
    } else {
        info!("No TURN credentials, serving static STUN configuration");
    }

    let server = SignalServer::new(IceProvider::from_config(twilio));
    server.serve(addr).await?;

    Ok(())
}
