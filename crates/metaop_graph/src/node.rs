// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph engine.

use crate::operation::{Operation, OperationKind};
use crate::socket::Socket;
use crate::value::{PropertyError, PropertyValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node instance in the graph.
///
/// The operation type is fixed at creation; only property values change
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Name used by recipes and diagnostics
    pub name: String,
    /// Operation and its property values
    operation: Operation,
}

impl Node {
    /// Create a new node running the given operation
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            operation,
        }
    }

    /// Create a node with default properties
    pub fn from_kind(name: impl Into<String>, kind: OperationKind) -> Self {
        Self::new(name, kind.default_operation())
    }

    /// Create a node and apply initial properties on top of the defaults
    pub fn with_properties<I, S>(
        name: impl Into<String>,
        kind: OperationKind,
        properties: I,
    ) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = (S, PropertyValue)>,
        S: AsRef<str>,
    {
        let mut operation = kind.default_operation();
        for (property, value) in properties {
            operation.set(property.as_ref(), &value)?;
        }
        Ok(Self::new(name, operation))
    }

    /// Operation type
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Operation and its current properties
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Read a property
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.operation.get(name)
    }

    /// Write a property, checking its type against the operation
    pub fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        self.operation.set(name, value)
    }

    /// Sockets declared by the operation type
    pub fn sockets(&self) -> &'static [Socket] {
        self.kind().sockets()
    }

    /// Get an input socket by name
    pub fn input_socket(&self, name: &str) -> Option<&'static Socket> {
        self.kind().socket(name).filter(|s| s.is_input())
    }

    /// Get an output socket by name
    pub fn output_socket(&self, name: &str) -> Option<&'static Socket> {
        self.kind().socket(name).filter(|s| s.is_output())
    }

    /// Swap in a staged copy of the operation. The kind must not change.
    pub(crate) fn replace_operation(&mut self, operation: Operation) {
        debug_assert_eq!(operation.kind(), self.kind());
        if operation.kind() == self.kind() {
            self.operation = operation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sockets() {
        let node = Node::from_kind("divide", OperationKind::LayerMode);
        assert!(node.input_socket("aux").is_some());
        assert!(node.input_socket("output").is_none());
        assert!(node.output_socket("output").is_some());
    }

    #[test]
    fn test_kind_is_stable() {
        let mut node = Node::from_kind("noise", OperationKind::CellNoise);
        node.set_property("scale", &PropertyValue::Double(0.5)).unwrap();
        node.replace_operation(OperationKind::CellNoise.default_operation());
        assert_eq!(node.kind(), OperationKind::CellNoise);
        assert_eq!(node.property("scale"), Some(PropertyValue::Double(1.0)));
    }
}
