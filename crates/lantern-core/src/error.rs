//! Error types for the signaling relay

use thiserror::Error;

/// Why an inbound frame was not routed
///
/// None of these terminate the sender's connection. The relay drops the
/// frame and logs; the protocol has no negative-acknowledgement frame
/// (a `bye` carrying an `error` field is the planned extension).
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame has no target id")]
    MissingTarget,

    #[error("peer not found: {0}")]
    PeerNotFound(String),

    #[error("delivery to {0} failed: connection closing")]
    Delivery(String),
}
