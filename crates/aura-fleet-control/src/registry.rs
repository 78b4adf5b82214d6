//! Live connection registry.
//!
//! One registry exists per transport kind. It maps a node to the send handle
//! of its current connection so the dispatch path can hand messages to the
//! connection's writer task without touching the network itself.

use std::collections::HashMap;
use std::sync::Arc;

use aura_fleet_core::{ConnectionId, NodeId, TransportKind};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::DispatchError;

/// The send side of one live connection.
#[derive(Debug)]
pub struct ConnectionEntry<M> {
    connection_id: ConnectionId,
    node_id: NodeId,
    transport: TransportKind,
    sender: mpsc::Sender<M>,
}

impl<M> ConnectionEntry<M> {
    /// Create an entry for a freshly accepted connection.
    #[must_use]
    pub fn new(node_id: NodeId, transport: TransportKind, sender: mpsc::Sender<M>) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            node_id,
            transport,
            sender,
        }
    }

    /// Identity of the underlying connection.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// The node this connection belongs to.
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The transport that owns the connection.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Returns true once the connection's writer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Unavailable` if the queue is full and
    /// `DispatchError::NotConnected` if the writer has already exited.
    pub fn try_send(&self, message: M) -> Result<(), DispatchError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::Unavailable(self.node_id),
            TrySendError::Closed(_) => DispatchError::NotConnected(self.node_id),
        })
    }
}

/// Node to live-connection map for one transport.
///
/// Lookups take a read lock, registration and removal a write lock. No
/// operation performs I/O while holding the lock.
#[derive(Debug)]
pub struct ConnectionRegistry<M> {
    transport: TransportKind,
    entries: RwLock<HashMap<NodeId, Arc<ConnectionEntry<M>>>>,
}

impl<M> ConnectionRegistry<M> {
    /// Create an empty registry for a transport.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The transport this registry tracks.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Install the entry for a node, replacing any previous one.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn register(
        &self,
        node_id: NodeId,
        entry: Arc<ConnectionEntry<M>>,
    ) -> Option<Arc<ConnectionEntry<M>>> {
        let previous = self.entries.write().insert(node_id, entry);
        if let Some(previous) = &previous {
            tracing::debug!(
                node_id = %node_id,
                transport = %self.transport,
                connection_id = %previous.connection_id,
                "Replaced live connection"
            );
        }
        previous
    }

    /// Remove the node's entry if it is still `entry`.
    ///
    /// A connection that has already been replaced leaves the newer entry in
    /// place. Returns true if an entry was removed.
    pub fn unregister(&self, node_id: &NodeId, entry: &ConnectionEntry<M>) -> bool {
        let mut entries = self.entries.write();
        match entries.get(node_id) {
            Some(current) if current.connection_id == entry.connection_id => {
                entries.remove(node_id);
                true
            }
            _ => false,
        }
    }

    /// Get the live entry for a node.
    #[must_use]
    pub fn lookup(&self, node_id: &NodeId) -> Option<Arc<ConnectionEntry<M>>> {
        self.entries.read().get(node_id).cloned()
    }

    /// Check if a node has a live entry.
    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.read().contains_key(node_id)
    }

    /// Get the number of connected nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no node is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get all connected node IDs.
    #[must_use]
    pub fn connected_nodes(&self) -> Vec<NodeId> {
        self.entries.read().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(node_id: NodeId, capacity: usize) -> (Arc<ConnectionEntry<u32>>, mpsc::Receiver<u32>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Arc::new(ConnectionEntry::new(node_id, TransportKind::WebSocket, tx)),
            rx,
        )
    }

    #[test]
    fn register_and_lookup() {
        let registry = ConnectionRegistry::new(TransportKind::WebSocket);
        let node_id = NodeId::generate();
        let (first, _rx) = entry(node_id, 1);

        assert!(registry.lookup(&node_id).is_none());
        assert!(registry.register(node_id, Arc::clone(&first)).is_none());

        let found = registry.lookup(&node_id).unwrap();
        assert_eq!(found.connection_id(), first.connection_id());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connected_nodes(), vec![node_id]);
    }

    #[test]
    fn register_replaces_previous() {
        let registry = ConnectionRegistry::new(TransportKind::Stream);
        let node_id = NodeId::generate();
        let (first, _rx1) = entry(node_id, 1);
        let (second, _rx2) = entry(node_id, 1);

        registry.register(node_id, Arc::clone(&first));
        let replaced = registry.register(node_id, Arc::clone(&second)).unwrap();

        assert_eq!(replaced.connection_id(), first.connection_id());
        assert_eq!(
            registry.lookup(&node_id).unwrap().connection_id(),
            second.connection_id()
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_unregister_keeps_newer_entry() {
        let registry = ConnectionRegistry::new(TransportKind::WebSocket);
        let node_id = NodeId::generate();
        let (old, _rx1) = entry(node_id, 1);
        let (new, _rx2) = entry(node_id, 1);

        registry.register(node_id, Arc::clone(&old));
        registry.register(node_id, Arc::clone(&new));

        // The old connection's read loop exits after the new one registered.
        assert!(!registry.unregister(&node_id, &old));
        assert_eq!(
            registry.lookup(&node_id).unwrap().connection_id(),
            new.connection_id()
        );

        assert!(registry.unregister(&node_id, &new));
        assert!(registry.is_empty());
    }

    #[test]
    fn try_send_maps_queue_state() {
        let node_id = NodeId::generate();
        let (entry, mut rx) = entry(node_id, 1);

        assert!(entry.try_send(1).is_ok());
        assert_eq!(entry.try_send(2), Err(DispatchError::Unavailable(node_id)));
        assert_eq!(rx.try_recv().unwrap(), 1);

        drop(rx);
        assert!(entry.is_closed());
        assert_eq!(entry.try_send(3), Err(DispatchError::NotConnected(node_id)));
    }
}
