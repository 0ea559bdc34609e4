//! Lantern Signal Relay
//!
//! Lightweight WebSocket signaling relay for establishing browser-to-browser
//! media sessions. Clients connect, receive an identifier and ICE
//! configuration, then exchange session descriptions and candidates through
//! the relay until a direct peer connection is up.
//!
//! # Protocol
//!
//! 1. Client connects and receives `hello{id}` followed by `iceServers{...}`
//! 2. Caller sends `offer{id: callee}`; the relay rewrites `id` to the caller
//!    and forwards it
//! 3. Callee replies with `answer`; both sides now owe each other a hangup
//!    notification
//! 4. ICE candidates flow the same way until the direct session is up
//! 5. When a connection drops, every peer it completed an answer exchange
//!    with receives `bye{id}`

pub mod ice;
pub mod registry;
pub mod router;
pub mod server;

pub use ice::{IceProvider, TwilioConfig};
pub use registry::{Peer, Registry};
pub use server::SignalServer;

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8080;
