// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the tree.

use uuid::Uuid;

use crate::node::NodeId;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source output index
    pub from_socket: usize,
    /// Target node ID
    pub to_node: NodeId,
    /// Target input index
    pub to_socket: usize,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_node: NodeId, from_socket: usize, to_node: NodeId, to_socket: usize) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node,
            from_socket,
            to_node,
            to_socket,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this connection ends at an input
    pub fn ends_at(&self, node_id: NodeId, input: usize) -> bool {
        self.to_node == node_id && self.to_socket == input
    }
}
