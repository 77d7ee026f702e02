// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::connection::{Connection, ConnectionId};
use crate::dsl::Fragment;
use crate::node::{Node, NodeId};
use crate::operation::OperationKind;
use crate::socket::{SocketRef, INPUT, OUTPUT};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// First and last node of a linked sub-chain.
///
/// The sub-chain is entered through `first`'s `input` and left through
/// `last`'s `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Entry node
    pub first: NodeId,
    /// Exit node
    pub last: NodeId,
}

impl Bounds {
    /// Bounds of a single node
    pub fn single(node: NodeId) -> Self {
        Self {
            first: node,
            last: node,
        }
    }
}

/// A node graph with input and output proxies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Pass-through standing for the graph's external input
    input_proxy: NodeId,
    /// Pass-through standing for the graph's external output
    output_proxy: NodeId,
    /// Topology is frozen once attached
    attached: bool,
}

impl Graph {
    /// Create a graph containing only its `input` and `output` proxies
    pub fn new(name: impl Into<String>) -> Self {
        let input = Node::from_kind(INPUT, OperationKind::Nop);
        let output = Node::from_kind(OUTPUT, OperationKind::Nop);
        let input_proxy = input.id;
        let output_proxy = output.id;

        let mut nodes = IndexMap::new();
        nodes.insert(input_proxy, input);
        nodes.insert(output_proxy, output);

        Self {
            name: name.into(),
            nodes,
            connections: IndexMap::new(),
            input_proxy,
            output_proxy,
            attached: false,
        }
    }

    /// The input proxy
    pub fn input_proxy(&self) -> NodeId {
        self.input_proxy
    }

    /// The output proxy
    pub fn output_proxy(&self) -> NodeId {
        self.output_proxy
    }

    /// Whether the node is one of the two proxies
    pub fn is_proxy(&self, node_id: NodeId) -> bool {
        node_id == self.input_proxy || node_id == self.output_proxy
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, ConnectionError> {
        if self.attached {
            return Err(ConnectionError::GraphAttached);
        }
        let id = node.id;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get the first node with the given name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes, proxies included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect `from_socket` of one node to `to_socket` of another.
    ///
    /// The edge set is left untouched when an error is returned.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_socket: &str,
        to_node: NodeId,
        to_socket: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        if self.attached {
            return Err(ConnectionError::GraphAttached);
        }

        // Validate nodes exist
        let source = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        // Validate sockets are declared by the operation types
        if source.output_socket(from_socket).is_none() {
            return Err(ConnectionError::DanglingSocket(SocketRef::new(source, from_socket)));
        }
        if target.input_socket(to_socket).is_none() {
            return Err(ConnectionError::DanglingSocket(SocketRef::new(target, to_socket)));
        }

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop(source.name.clone()));
        }

        // Inputs have a single producer
        if self.producer(to_node, to_socket).is_some() {
            return Err(ConnectionError::DuplicateConnection(SocketRef::new(target, to_socket)));
        }

        tracing::trace!(
            from = %source.name,
            to = %target.name,
            socket = to_socket,
            "Connecting nodes"
        );

        let connection = Connection::new(from_node, from_socket, to_node, to_socket);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Connect the `output` of one node to the `input` of the next
    pub fn link(&mut self, from_node: NodeId, to_node: NodeId) -> Result<ConnectionId, ConnectionError> {
        self.connect(from_node, OUTPUT, to_node, INPUT)
    }

    /// Link every node to the next one, in order.
    ///
    /// Either all links are made or none are.
    pub fn link_chain(&mut self, nodes: &[NodeId]) -> Result<Vec<ConnectionId>, ConnectionError> {
        let mut created = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            match self.link(pair[0], pair[1]) {
                Ok(id) => created.push(id),
                Err(err) => {
                    for id in created {
                        self.connections.shift_remove(&id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    /// Add the operations of a fragment as a linked chain
    pub fn splice(&mut self, fragment: &Fragment) -> Result<Bounds, ConnectionError> {
        if self.attached {
            return Err(ConnectionError::GraphAttached);
        }

        let ids: Vec<NodeId> = fragment
            .operations()
            .iter()
            .map(|op| {
                let node = Node::new(op.kind().identifier(), op.clone());
                let id = node.id;
                self.nodes.insert(id, node);
                id
            })
            .collect();

        if let Err(err) = self.link_chain(&ids) {
            for id in &ids {
                self.nodes.shift_remove(id);
            }
            return Err(err);
        }

        match (ids.first(), ids.last()) {
            (Some(&first), Some(&last)) => Ok(Bounds { first, last }),
            _ => Err(ConnectionError::EmptyChain),
        }
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Result<Connection, ConnectionError> {
        if self.attached {
            return Err(ConnectionError::GraphAttached);
        }
        self.connections
            .shift_remove(&connection_id)
            .ok_or(ConnectionError::ConnectionNotFound(connection_id))
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// The connection feeding an input socket
    pub fn producer(&self, node_id: NodeId, socket: &str) -> Option<&Connection> {
        self.connections.values().find(|c| c.feeds(node_id, socket))
    }

    /// Connections leaving a node
    pub fn consumers(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_node == node_id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether `to` can be reached from `from` by following connections
    pub fn is_reachable(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node_id) = queue.pop_front() {
            if node_id == to {
                return true;
            }
            if seen.insert(node_id) {
                queue.extend(self.consumers(node_id).map(|c| c.to_node));
            }
        }
        false
    }

    /// Nodes `node_id` depends on, nearest first, including itself
    pub fn upstream(&self, node_id: NodeId) -> IndexSet<NodeId> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::from([node_id]);
        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                queue.extend(
                    self.connections
                        .values()
                        .filter(|c| c.to_node == current)
                        .map(|c| c.from_node),
                );
            }
        }
        seen
    }

    /// Get nodes in topological order (for evaluation)
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            let name = self.nodes.get(&node_id).map(|n| n.name.clone()).unwrap_or_default();
            return Err(CycleError(name));
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit all nodes that this node depends on
        for connection in self.connections_for_node(node_id) {
            if connection.to_node == node_id {
                self.visit(connection.from_node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    /// Check that the graph is acyclic and that every required socket has a
    /// producer. The input proxy stands for the external input and is exempt.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.topological_order()?;

        for node in self.nodes.values() {
            if node.id == self.input_proxy {
                continue;
            }
            for socket in node.sockets().iter().filter(|s| s.is_input() && s.required) {
                if self.producer(node.id, socket.name).is_none() {
                    return Err(ValidationError::UnconnectedRequiredSocket(SocketRef::new(
                        node,
                        socket.name,
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate and freeze the topology. Property values stay mutable.
    pub fn attach(&mut self) -> Result<(), ValidationError> {
        self.validate()?;
        self.attached = true;
        Ok(())
    }

    /// Whether the topology is frozen
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when changing the graph's topology
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Connection not found
    #[error("Connection not found: {0:?}")]
    ConnectionNotFound(ConnectionId),

    /// Socket not declared by the node's operation type
    #[error("Dangling socket: {0}")]
    DanglingSocket(SocketRef),

    /// Input socket already has a producer
    #[error("Socket already connected: {0}")]
    DuplicateConnection(SocketRef),

    /// Self-loop not allowed
    #[error("Self-loop not allowed on `{0}`")]
    SelfLoop(String),

    /// Nothing to link
    #[error("Empty chain")]
    EmptyChain,

    /// Topology is frozen
    #[error("Graph is attached; its topology can no longer change")]
    GraphAttached,
}

/// Error when graph contains a cycle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Graph contains a cycle through `{0}`")]
pub struct CycleError(pub String);

/// Error when a graph is not ready for evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Feedback loop
    #[error(transparent)]
    Cyclic(#[from] CycleError),

    /// A required input has no producer
    #[error("Required socket not connected: {0}")]
    UnconnectedRequiredSocket(SocketRef),
}
