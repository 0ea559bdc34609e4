//! ICE server configuration for connecting clients
//!
//! The static strategy hands out a fixed public STUN list with no I/O.
//! The dynamic strategy fetches short-lived TURN credentials from the
//! Twilio token endpoint and falls back to the static list if the call
//! fails, so a client is never left without ICE configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use lantern_core::messages::IceServer;

/// Public STUN server used by the static strategy and as fallback
pub const STATIC_STUN_URL: &str = "stun:stun.l.google.com:19302";

/// Timeout for the TURN credential round trip
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Twilio API credentials, taken from the environment at startup
#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
}

/// ICE configuration strategy, selected once at startup
pub enum IceProvider {
    /// Fixed public STUN list, no I/O
    Static,

    /// Short-lived TURN credentials from Twilio
    Twilio {
        client: reqwest::Client,
        config: TwilioConfig,
    },
}

/// Subset of the Twilio token response we care about
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    ice_servers: Vec<IceServer>,
}

/// Why a TURN credential fetch failed
#[derive(Debug)]
pub enum IceError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl IceProvider {
    /// Pick a strategy based on whether TURN credentials are configured
    pub fn from_config(twilio: Option<TwilioConfig>) -> Self {
        match twilio {
            Some(config) => Self::Twilio {
                client: reqwest::Client::builder()
                    .user_agent(format!("lantern/{}", env!("CARGO_PKG_VERSION")))
                    .timeout(TOKEN_TIMEOUT)
                    .build()
                    .expect("Failed to create HTTP client"),
                config,
            },
            None => Self::Static,
        }
    }

    /// Produce the ICE server list for one connection
    ///
    /// Never fails: provider errors degrade to the static list. May
    /// suspend for a network round trip, so callers must keep it off the
    /// message-loop critical path.
    pub async fn provide(&self) -> Vec<IceServer> {
        match self {
            Self::Static => static_servers(),
            Self::Twilio { client, config } => {
                match fetch_twilio_servers(client, config).await {
                    Ok(servers) if !servers.is_empty() => servers,
                    Ok(_) => {
                        warn!("Twilio returned no ICE servers, using static STUN");
                        static_servers()
                    }
                    Err(e) => {
                        warn!("TURN credential fetch failed, using static STUN: {:?}", e);
                        static_servers()
                    }
                }
            }
        }
    }
}

/// The fixed STUN-only server list
pub fn static_servers() -> Vec<IceServer> {
    vec![IceServer {
        urls: STATIC_STUN_URL.into(),
        username: None,
        credential: None,
    }]
}

/// Request ephemeral TURN credentials from the Twilio token endpoint
async fn fetch_twilio_servers(
    client: &reqwest::Client,
    config: &TwilioConfig,
) -> Result<Vec<IceServer>, IceError> {
    let url = format!(
        "https://api.twilio.com/2010-04-01/Accounts/{}/Tokens.json",
        config.account_sid
    );

    let response = client
        .post(&url)
        .basic_auth(&config.account_sid, Some(&config.auth_token))
        .send()
        .await
        .map_err(IceError::Http)?;

    if !response.status().is_success() {
        return Err(IceError::Status(response.status()));
    }

    let token: TokenResponse = response.json().await.map_err(IceError::Http)?;
    Ok(token.ice_servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_servers() {
        let servers = static_servers();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].urls, STATIC_STUN_URL);
        assert!(servers[0].username.is_none());
        assert!(servers[0].credential.is_none());
    }

    #[test]
    fn test_strategy_selection() {
        assert!(matches!(IceProvider::from_config(None), IceProvider::Static));

        let provider = IceProvider::from_config(Some(TwilioConfig {
            account_sid: "AC0000".into(),
            auth_token: "secret".into(),
        }));
        assert!(matches!(provider, IceProvider::Twilio { .. }));
    }

    #[test]
    fn test_static_provide() {
        let servers = tokio_test::block_on(IceProvider::Static.provide());
        assert_eq!(servers, static_servers());
    }

    #[test]
    fn test_token_response_parsing() {
        let json = r#"{
            "username": "ignored-top-level",
            "ice_servers": [
                {"url": "stun:global.stun.twilio.com:3478", "urls": "stun:global.stun.twilio.com:3478"},
                {"urls": "turn:global.turn.twilio.com:3478?transport=udp",
                 "username": "user", "credential": "secret"}
            ],
            "ttl": "86400"
        }"#;

        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.ice_servers.len(), 2);
        assert_eq!(token.ice_servers[1].username.as_deref(), Some("user"));
    }

    #[test]
    fn test_token_response_without_servers() {
        let token: TokenResponse = serde_json::from_str("{}").unwrap();
        assert!(token.ice_servers.is_empty());
    }
}
