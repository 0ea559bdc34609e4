//! WebSocket relay server and per-connection lifecycle
//!
//! One task per connection drives the inbound message loop; a companion
//! writer task drains the connection's send channel so frames addressed
//! to it from any origin keep their order.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use lantern_core::ident::allocate_client_id;
use lantern_core::messages::{ServerFrame, TYPE_BYE};

use crate::ice::IceProvider;
use crate::registry::{Peer, Registry};
use crate::router;

/// Signal relay state shared across connections
pub struct SignalServer {
    registry: Arc<Registry>,
    ice: Arc<IceProvider>,
}

impl SignalServer {
    pub fn new(ice: IceProvider) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            ice: Arc::new(ice),
        }
    }

    /// Bind and serve until the process exits
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signal relay listening on {}", listener.local_addr()?);
        self.run(listener).await
    }

    /// Serve connections from an already-bound listener
    pub async fn run(&self, listener: TcpListener) -> Result<(), std::io::Error> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let registry = self.registry.clone();
            let ice = self.ice.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, registry, ice).await {
                    debug!("Connection error from {}: {:?}", peer_addr, e);
                }
            });
        }
    }

    /// Number of registered connections (for monitoring)
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for SignalServer {
    fn default() -> Self {
        Self::new(IceProvider::Static)
    }
}

/// Drive one connection from accept to teardown
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<Registry>,
    ice: Arc<IceProvider>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Peek at the request line to pick off plain HTTP monitoring probes;
    // WebSocket upgrades also start with GET, so match on the path.
    let mut peek_buf = [0u8; 16];
    let n = stream.peek(&mut peek_buf).await?;
    let head = &peek_buf[..n];
    if head.starts_with(b"GET /health") || head.starts_with(b"GET /stats") {
        return handle_http_request(&mut stream, registry.len()).await;
    }

    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign an id to the client. The alternative is letting clients pick
    // their own, but that needs authentication to be safe.
    let id = allocate_client_id();
    debug!("{} Received new connection from {}", id, peer_addr);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let peer = Arc::new(Peer::new(tx));

    if !registry.register(&id, peer.clone()) {
        warn!("{} Duplicate id detected, closing", id);
        let _ = ws_sender.close().await;
        return Ok(());
    }

    // Writer task: the only place that touches the socket's sink, fed by
    // the peer's channel so per-origin delivery order is preserved.
    let writer_id = id.clone();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                debug!("{} failed to send to socket: {:?}", writer_id, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Greeting with the assigned id, then ICE configuration. The TURN
    // strategy needs a network round trip, so it runs detached; if this
    // connection closes first the send fails and the result is discarded.
    let _ = peer.send_text(ServerFrame::Hello { id: id.clone() }.to_json()?);

    {
        let ice = ice.clone();
        let peer = peer.clone();
        let ice_id = id.clone();
        tokio::spawn(async move {
            let ice_servers = ice.provide().await;
            match (ServerFrame::IceServers { ice_servers }).to_json() {
                Ok(json) => {
                    if peer.send_text(json).is_err() {
                        debug!("{} closed before ICE config arrived, discarding", ice_id);
                    }
                }
                Err(e) => warn!("{} failed to encode ICE config: {}", ice_id, e),
            }
        });
    }

    // Message loop. Routing errors drop the frame and leave the
    // connection open; only transport-level events end the loop.
    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                let _ = peer.send(Message::Pong(data));
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!("{} WebSocket error: {:?}", id, e);
                break;
            }
        };

        debug!("{} received {}", id, text);
        if let Err(e) = router::route(&registry, &id, &text) {
            debug!("{} dropped frame: {}", id, e);
        }
    }

    close_connection(&id, &peer, &registry);
    Ok(())
}

/// Deregister a connection and notify everyone it answered
///
/// Best effort: a peer that is itself mid-teardown is skipped, not
/// retried. Delivering the `bye` also clears this id from the remote's
/// notify set so it will not try to reach a dead connection later.
fn close_connection(id: &str, peer: &Peer, registry: &Registry) {
    registry.remove(id);

    for remote_id in peer.notify_set() {
        let remote = match registry.lookup(&remote_id) {
            Some(r) => r,
            None => continue,
        };

        remote.track_call(TYPE_BYE, id);
        match (ServerFrame::Bye { id: id.to_string() }).to_json() {
            Ok(json) => {
                if remote.send_text(json).is_err() {
                    debug!("{} failed to notify {}", id, remote_id);
                }
            }
            Err(e) => warn!("{} failed to encode bye frame: {}", id, e),
        }
    }

    debug!("{} Connection closed", id);
}

/// Answer an HTTP monitoring probe on the WebSocket listener
async fn handle_http_request(
    stream: &mut TcpStream,
    peer_count: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, body) = match path {
        "/health" => (
            "200 OK",
            format!(r#"{{"status":"healthy","peers":{}}}"#, peer_count),
        ),
        "/stats" => ("200 OK", format!(r#"{{"peers":{}}}"#, peer_count)),
        _ => ("404 Not Found", r#"{"error":"not found"}"#.to_string()),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_peer(registry: &Registry, id: &str) -> (Arc<Peer>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Arc::new(Peer::new(tx));
        assert!(registry.register(id, peer.clone()));
        (peer, rx)
    }

    fn recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_server_creation() {
        let server = SignalServer::default();
        assert_eq!(server.peer_count(), 0);
    }

    #[test]
    fn test_close_notifies_answered_peers_once() {
        let registry = Registry::new();
        let (a, _a_rx) = add_peer(&registry, "a");
        let (_b, mut b_rx) = add_peer(&registry, "b");
        let (_c, mut c_rx) = add_peer(&registry, "c");
        let (_d, mut d_rx) = add_peer(&registry, "d");

        a.track_call("answer", "b");
        a.track_call("answer", "c");

        close_connection("a", &a, &registry);

        for rx in [&mut b_rx, &mut c_rx] {
            let frame = recv_json(rx);
            assert_eq!(frame["type"], "bye");
            assert_eq!(frame["id"], "a");
            assert!(rx.try_recv().is_err(), "exactly one bye per peer");
        }
        assert!(d_rx.try_recv().is_err(), "uninvolved peer gets nothing");
    }

    #[test]
    fn test_close_clears_remote_notify_sets() {
        let registry = Registry::new();
        let (a, _a_rx) = add_peer(&registry, "a");
        let (b, _b_rx) = add_peer(&registry, "b");

        a.track_call("answer", "b");
        b.track_call("answer", "a");

        close_connection("a", &a, &registry);

        // b no longer owes the dead connection a notification
        assert!(b.notify_set().is_empty());
    }

    #[test]
    fn test_close_skips_departed_peers() {
        let registry = Registry::new();
        let (a, _a_rx) = add_peer(&registry, "a");

        a.track_call("answer", "gone");
        close_connection("a", &a, &registry);

        assert!(registry.is_empty());
    }
}
