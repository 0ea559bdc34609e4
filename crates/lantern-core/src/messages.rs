//! Signaling protocol messages
//!
//! Two frame families share one wire shape (`{"type": ..., "id": ..., ...}`).
//! Frames the relay forwards between peers are open-ended envelopes: `id`
//! names the destination on the way in and is rewritten to the origin on
//! the way out. Frames the relay originates (greeting, ICE configuration,
//! hangup notification) are a closed enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frame type that establishes a notify-on-close obligation when routed
pub const TYPE_ANSWER: &str = "answer";

/// Frame type that clears a notify-on-close obligation when routed
pub const TYPE_BYE: &str = "bye";

/// A client frame relayed between peers
///
/// The relay forwards any well-formed envelope regardless of type.
/// Browser clients exchange `offer`, `answer`, `candidate`, and `bye`,
/// but only `answer` and `bye` change relay state; everything else
/// passes through untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Frame type
    #[serde(rename = "type")]
    pub kind: String,

    /// Destination peer (client to server) or origin peer (server to client)
    #[serde(default)]
    pub id: String,

    /// Type-specific payload (`sdp`, `candidate`, ...), forwarded as-is
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Frames originated by the relay itself
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Greeting that assigns the client its identifier
    Hello { id: String },

    /// ICE configuration to use for all peer connections
    #[serde(rename_all = "camelCase")]
    IceServers { ice_servers: Vec<IceServer> },

    /// A peer this client was in a call with went away
    Bye { id: String },
}

/// One ICE server descriptor, shaped like the browser's `RTCIceServer`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: String,

    /// TURN username, absent for plain STUN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// TURN credential, absent for plain STUN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl Envelope {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerFrame {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
