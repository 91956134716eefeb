/// Connection registry — the single source of truth for who is connected.
///
/// Tracks live connections keyed by peer address and username→address
/// bindings learned from traffic. Shared across every connection task behind
/// an async `RwLock`; callers hold the lock for one routing decision at most.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use super::codec::Outbound;

/// Reserved broadcast destination. Never stored as a binding.
pub const BROADCAST_NAME: &str = "home";

/// Handle to write frames to a connected client.
///
/// The socket writer stays inside the connection's own task; everyone else
/// queues outbound frames through this sender.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub addr: SocketAddr,
    pub tx: mpsc::UnboundedSender<Outbound>,
}

#[derive(Debug, Default)]
pub struct Registry {
    /// Live connections: peer address → write handle.
    connections: HashMap<SocketAddr, ConnectionHandle>,
    /// Username bindings, last-write-wins: name → peer address.
    usernames: HashMap<String, SocketAddr>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the connection for its address. Stale username
    /// bindings pointing elsewhere are left alone.
    pub fn register(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.addr, handle);
    }

    /// Remove a connection and prune every username binding to it.
    /// Idempotent: unknown addresses are a no-op.
    pub fn unregister(&mut self, addr: SocketAddr) {
        self.connections.remove(&addr);
        self.usernames.retain(|_, bound| *bound != addr);
    }

    /// Bind a username to an address, overwriting any previous binding.
    /// The reserved broadcast name and empty names are never stored.
    pub fn bind_username(&mut self, username: &str, addr: SocketAddr) {
        if username == BROADCAST_NAME || username.is_empty() {
            return;
        }
        self.usernames.insert(username.to_owned(), addr);
    }

    pub fn resolve_username(&self, username: &str) -> Option<SocketAddr> {
        self.usernames.get(username).copied()
    }

    pub fn connection(&self, addr: SocketAddr) -> Option<&ConnectionHandle> {
        self.connections.get(&addr)
    }

    /// Snapshot of every connected address.
    pub fn all_addresses(&self) -> Vec<SocketAddr> {
        self.connections.keys().copied().collect()
    }

    pub fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.connections.values()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Shared, thread-safe registry.
pub type SharedRegistry = Arc<RwLock<Registry>>;

pub fn shared() -> SharedRegistry {
    Arc::new(RwLock::new(Registry::new()))
}
