//! Connection registry and per-connection call state

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use lantern_core::messages::{TYPE_ANSWER, TYPE_BYE};

/// One registered connection
///
/// Holds the outbound send channel (consumed by the connection's writer
/// task) and the set of peers to notify if this connection goes away.
/// Other components reference a peer only through the registry, never by
/// raw socket handle.
pub struct Peer {
    tx: mpsc::UnboundedSender<Message>,

    /// Peers that completed an answer exchange with this connection,
    /// in insertion order
    notify_on_close: Mutex<Vec<String>>,
}

impl Peer {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            tx,
            notify_on_close: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw WebSocket frame for the writer task
    ///
    /// Fails once the connection is closing and its receiver is gone.
    pub fn send(&self, msg: Message) -> Result<(), mpsc::error::SendError<Message>> {
        self.tx.send(msg)
    }

    /// Queue a JSON text frame for the writer task
    pub fn send_text(&self, json: String) -> Result<(), mpsc::error::SendError<Message>> {
        self.tx.send(Message::Text(json))
    }

    /// Update call state for a frame routed through this connection
    ///
    /// `peer_id` is the other end of the exchange: the target for frames
    /// this connection sent, the origin for frames delivered to it. An
    /// `answer` in either direction records the obligation to notify that
    /// peer on close; a `bye` clears it. Duplicate inserts and absent
    /// removals are no-ops. Other frame types leave the state untouched.
    pub fn track_call(&self, kind: &str, peer_id: &str) {
        match kind {
            TYPE_ANSWER => {
                let mut set = self.notify_on_close.lock();
                if !set.iter().any(|id| id == peer_id) {
                    set.push(peer_id.to_string());
                }
            }
            TYPE_BYE => {
                self.notify_on_close.lock().retain(|id| id != peer_id);
            }
            _ => {}
        }
    }

    /// Snapshot of the notify-on-close set, in insertion order
    pub fn notify_set(&self) -> Vec<String> {
        self.notify_on_close.lock().clone()
    }
}

/// Shared map of live connections by client id
///
/// The only long-lived shared mutable state in the relay. An entry is
/// inserted exactly once per connection and removed exactly once at
/// teardown; an id never denotes two live connections at the same time.
pub struct Registry {
    peers: DashMap<String, Arc<Peer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Register a connection under `id`
    ///
    /// Returns false if the id is already taken, in which case the caller
    /// must close the new connection instead of overwriting the live one.
    pub fn register(&self, id: &str, peer: Arc<Peer>) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.peers.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(peer);
                true
            }
        }
    }

    /// Look up a live connection by id
    pub fn lookup(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a connection, making its id available again
    pub fn remove(&self, id: &str) {
        self.peers.remove(id);
    }

    /// Number of registered connections (for monitoring)
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
