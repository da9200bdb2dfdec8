//! Real-time fan-out to connected clients.
//!
//! The hub only holds the sending half of each client's frame channel.
//! The transport task owns the socket and the receiving half; when it goes
//! away the next delivery fails and the hub drops the member.

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;


/// Opaque identity of one connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery capability for one client
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Create a connection and the receiver its transport task drains.
    pub fn open() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn deliver(&self, frame: &str) -> bool {
        self.tx.send(frame.to_string()).is_ok()
    }
}

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the frame was handed to
    pub delivered: usize,
    /// Members whose delivery failed and were unregistered
    pub dropped: usize,
}

/// Registry of live connections
pub struct BroadcastHub {
    connections: DashMap<ConnectionId, Connection>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a connection. Registering an id that is already present keeps
    /// the existing entry.
    pub fn register(&self, connection: Connection) {
        let id = connection.id();
        let mut inserted = false;
        self.connections.entry(id).or_insert_with(|| {
            inserted = true;
            connection
        });

        if inserted {
            info!(connection_id = %id, total = self.connections.len(), "Client connected");
        }
    }

    /// Remove a connection if present. Returns whether it was a member.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            info!(connection_id = %id, total = self.connections.len(), "Client disconnected");
        }
        removed
    }

    /// Serialize `message` once and hand it to every current member.
    ///
    /// Members are snapshotted before sending so no map shard lock is held
    /// during delivery. A failed delivery unregisters that member and does
    /// not affect the others. Only a serialization failure is returned.
    pub fn broadcast<T: Serialize>(
        &self,
        message: &T,
    ) -> Result<BroadcastReport, serde_json::Error> {
        let frame = serde_json::to_string(message)?;

        let members: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        debug!(client_count = members.len(), "Broadcasting frame");

        let mut report = BroadcastReport::default();
        for member in members {
            if member.deliver(&frame) {
                report.delivered += 1;
            } else {
                warn!(connection_id = %member.id(), "Delivery failed, dropping client");
                self.unregister(member.id());
                report.dropped += 1;
            }
        }

        Ok(report)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
