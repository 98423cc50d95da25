// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tree data structure containing nodes, connections and interface items.

use indexmap::IndexMap;
use nodeshare_graph::{SinkError, Value};
use uuid::Uuid;

use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeBehavior, NodeId};
use crate::socket::{Socket, SocketKind};

/// Unique identifier for a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub Uuid);

impl TreeId {
    /// Create a new random tree ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Side of the tree interface an item is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InOut {
    /// Input of the group
    Input,
    /// Output of the group
    Output,
}

impl InOut {
    /// Host identifier
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
        }
    }

    /// Parse a host identifier
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "INPUT" => Some(Self::Input),
            "OUTPUT" => Some(Self::Output),
            _ => None,
        }
    }
}

/// One socket of a tree's interface
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceItem {
    /// Socket name
    pub name: String,
    /// Side
    pub in_out: InOut,
    /// Data type
    pub kind: SocketKind,
    /// Tooltip
    pub description: String,
    /// Default for group node inputs
    pub default_value: Option<Value>,
    /// Soft minimum
    pub min_value: f64,
    /// Soft maximum
    pub max_value: f64,
    /// Whether the value field is hidden
    pub hide_value: bool,
}

impl InterfaceItem {
    /// Create an item with the kind's defaults
    pub fn new(name: impl Into<String>, in_out: InOut, kind: SocketKind) -> Self {
        Self {
            name: name.into(),
            in_out,
            kind,
            description: String::new(),
            default_value: kind_default(kind),
            min_value: f32::MIN as f64,
            max_value: f32::MAX as f64,
            hide_value: false,
        }
    }

    /// Socket a group node shows for this item
    pub fn socket(&self) -> Socket {
        let socket = match self.in_out {
            InOut::Input => Socket::input(self.name.clone(), self.kind),
            InOut::Output => Socket::output(self.name.clone(), self.kind),
        };
        match &self.default_value {
            Some(value) if self.in_out == InOut::Input => socket.with_default(value.clone()),
            _ => socket,
        }
    }
}

/// Zero value of a socket kind.
pub fn kind_default(kind: SocketKind) -> Option<Value> {
    match kind {
        SocketKind::Bool => Some(Value::Bool(false)),
        SocketKind::Int => Some(Value::Int(0)),
        SocketKind::Float => Some(Value::Float(0.0)),
        SocketKind::Vector => Some(Value::floats([0.0, 0.0, 0.0])),
        SocketKind::Color => Some(Value::floats([0.0, 0.0, 0.0, 1.0])),
        SocketKind::String => Some(Value::from("")),
        SocketKind::Shader | SocketKind::Geometry => None,
    }
}

/// A node tree
#[derive(Debug, Clone)]
pub struct MemoryTree {
    /// Tree ID
    pub id: TreeId,
    /// Tree name
    pub name: String,
    /// Tree type identifier
    pub kind: String,
    /// Whether the tree belongs to a material
    pub is_material: bool,
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    interface: Vec<InterfaceItem>,
}

impl MemoryTree {
    /// Create a new empty tree
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: TreeId::new(),
            name: name.into(),
            kind: kind.into(),
            is_material: false,
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            interface: Vec::new(),
        }
    }

    /// Add a node, renaming it if its name is taken
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.name = self.unique_name(&node.name, None);
        let id = node.id;
        self.nodes.insert(id, node);
        self.sync_group_sockets();
        id
    }

    /// `name`, or `name.001`, `name.002`, ... if another node has it
    pub fn unique_name(&self, name: &str, exclude: Option<NodeId>) -> String {
        let taken = |candidate: &str| {
            self.nodes
                .values()
                .any(|n| n.name == candidate && Some(n.id) != exclude)
        };
        if !taken(name) {
            return name.to_string();
        }
        let stem = match name.rsplit_once('.') {
            Some((stem, suffix)) if suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit()) => stem,
            _ => name,
        };
        (1..)
            .map(|n| format!("{stem}.{n:03}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| stem.to_string())
    }

    /// Rename a node; returns the name it got
    pub fn rename_node(&mut self, node_id: NodeId, name: &str) -> Result<String, TreeError> {
        let name = self.unique_name(name, Some(node_id));
        let node = self.nodes.get_mut(&node_id).ok_or(TreeError::NodeNotFound(node_id))?;
        node.name = name.clone();
        Ok(name)
    }

    /// Remove a node, its connections and its children's parent pointers
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(node_id));
        for node in self.nodes.values_mut() {
            if node.parent == Some(node_id) {
                node.parent = None;
            }
        }
        self.nodes.shift_remove(&node_id)
    }

    /// Remove every node and connection; the interface stays
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get a node by name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect an output to an input. An input takes one link; an
    /// existing link into it is replaced.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_socket: usize,
        to_node: NodeId,
        to_socket: usize,
    ) -> Result<ConnectionId, TreeError> {
        let source_node = self.nodes.get(&from_node).ok_or(TreeError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node).ok_or(TreeError::NodeNotFound(to_node))?;

        let source = source_node.output(from_socket).ok_or(TreeError::SocketNotFound(from_socket))?;
        let target = target_node.input(to_socket).ok_or(TreeError::SocketNotFound(to_socket))?;

        if !source.can_connect(target) {
            return Err(TreeError::IncompatibleSockets {
                from: source.kind,
                to: target.kind,
            });
        }

        if from_node == to_node {
            return Err(TreeError::SelfLoop);
        }

        self.connections.retain(|_, c| !c.ends_at(to_node, to_socket));
        let connection = Connection::new(from_node, from_socket, to_node, to_socket);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections leaving one output
    pub fn connections_from(&self, node_id: NodeId, output: usize) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.from_node == node_id && c.from_socket == output)
    }

    /// Get the connection into one input
    pub fn connection_to(&self, node_id: NodeId, input: usize) -> Option<&Connection> {
        self.connections.values().find(|c| c.ends_at(node_id, input))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Put `child` inside the frame `parent`
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), TreeError> {
        let frame = self.nodes.get(&parent).ok_or(TreeError::NodeNotFound(parent))?;
        if frame.behavior() != NodeBehavior::Frame {
            return Err(TreeError::NotAFrame(frame.name.clone()));
        }
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::NodeNotFound(child));
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(TreeError::ParentCycle);
            }
            ancestor = self.nodes.get(&id).and_then(|n| n.parent);
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Interface items in order
    pub fn interface(&self) -> &[InterfaceItem] {
        &self.interface
    }

    /// Position of an interface item
    pub fn interface_position(&self, name: &str, in_out: InOut) -> Option<usize> {
        self.interface
            .iter()
            .position(|item| item.name == name && item.in_out == in_out)
    }

    /// Get a mutable interface item by position
    pub fn interface_item_mut(&mut self, position: usize) -> Option<&mut InterfaceItem> {
        self.interface.get_mut(position)
    }

    /// Append an interface item; returns its position
    pub fn add_interface_item(&mut self, item: InterfaceItem) -> usize {
        self.interface.push(item);
        self.interface.len() - 1
    }

    /// Move an interface item; positions past the end clamp to the end
    pub fn move_interface_item(&mut self, from: usize, to: usize) {
        if from >= self.interface.len() {
            return;
        }
        let item = self.interface.remove(from);
        let to = to.min(self.interface.len());
        self.interface.insert(to, item);
    }

    /// Sockets for one side of the interface
    pub fn interface_sockets(&self, in_out: InOut) -> Vec<Socket> {
        self.interface
            .iter()
            .filter(|item| item.in_out == in_out)
            .map(InterfaceItem::socket)
            .collect()
    }

    /// Replace a node's sockets, keeping defaults of sockets that survive
    /// and dropping connections that no longer fit.
    pub fn replace_sockets(&mut self, node_id: NodeId, inputs: Vec<Socket>, outputs: Vec<Socket>) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        node.inputs = carry_defaults(&node.inputs, inputs);
        node.outputs = carry_defaults(&node.outputs, outputs);

        let nodes = &self.nodes;
        self.connections.retain(|_, c| {
            let source = nodes.get(&c.from_node).and_then(|n| n.output(c.from_socket));
            let target = nodes.get(&c.to_node).and_then(|n| n.input(c.to_socket));
            matches!((source, target), (Some(s), Some(t)) if s.can_connect(t))
        });
    }

    /// Bring Group Input and Group Output nodes in line with the interface
    pub fn sync_group_sockets(&mut self) {
        let inputs = self.interface_sockets(InOut::Input);
        let outputs = self.interface_sockets(InOut::Output);
        let targets: Vec<(NodeId, NodeBehavior)> = self
            .nodes
            .values()
            .filter(|n| matches!(n.behavior(), NodeBehavior::GroupInput | NodeBehavior::GroupOutput))
            .map(|n| (n.id, n.behavior()))
            .collect();

        for (id, behavior) in targets {
            // Group Input shows the tree's inputs as outputs, and vice versa
            let (node_inputs, node_outputs) = if behavior == NodeBehavior::GroupInput {
                (Vec::new(), flip(&inputs))
            } else {
                (flip(&outputs), Vec::new())
            };
            self.replace_sockets(id, node_inputs, node_outputs);
        }
    }
}

fn flip(sockets: &[Socket]) -> Vec<Socket> {
    sockets
        .iter()
        .map(|s| match s.direction {
            crate::socket::SocketDirection::Input => Socket::output(s.name.clone(), s.kind),
            crate::socket::SocketDirection::Output => Socket::input(s.name.clone(), s.kind),
        })
        .collect()
}

fn carry_defaults(old: &[Socket], new: Vec<Socket>) -> Vec<Socket> {
    new.into_iter()
        .map(|mut socket| {
            if let Some(previous) = old.iter().find(|s| s.name == socket.name && s.kind == socket.kind) {
                if previous.default_value.is_some() {
                    socket.default_value = previous.default_value.clone();
                }
            }
            socket
        })
        .collect()
}

/// Error when editing a tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Socket not found
    #[error("Socket not found: {0}")]
    SocketNotFound(usize),

    /// Incompatible socket kinds
    #[error("Cannot link {from:?} to {to:?}")]
    IncompatibleSockets {
        /// Output kind
        from: SocketKind,
        /// Input kind
        to: SocketKind,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Parent is not a frame
    #[error("{0:?} is not a frame")]
    NotAFrame(String),

    /// Parent chain would loop
    #[error("Frame would contain itself")]
    ParentCycle,
}

impl From<TreeError> for SinkError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::SocketNotFound(index) => SinkError::NoSuchSocket(index),
            TreeError::IncompatibleSockets { .. } => SinkError::TypeMismatch(err.to_string()),
            other => SinkError::Rejected(other.to_string()),
        }
    }
}
