// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::node::Node;
use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the primary input socket
pub const INPUT: &str = "input";
/// Name of the auxiliary input socket
pub const AUX: &str = "aux";
/// Name of the output socket
pub const OUTPUT: &str = "output";

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketDirection {
    /// Input socket
    Input,
    /// Output socket
    Output,
}

/// A socket declared by an operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socket {
    /// Socket name
    pub name: &'static str,
    /// Socket direction
    pub direction: SocketDirection,
    /// Whether the socket must be connected before evaluation (inputs only)
    pub required: bool,
}

impl Socket {
    /// Primary `input`, required
    pub const INPUT: Socket = Socket::input(INPUT);
    /// Primary `input` for operations that also render without one
    pub const OPTIONAL_INPUT: Socket = Socket::input(INPUT).optional();
    /// Auxiliary `aux`, optional
    pub const AUX: Socket = Socket::input(AUX).optional();
    /// The `output`
    pub const OUTPUT: Socket = Socket::output(OUTPUT);

    /// Create a required input socket
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            direction: SocketDirection::Input,
            required: true,
        }
    }

    /// Create an output socket
    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            direction: SocketDirection::Output,
            required: false,
        }
    }

    /// Mark as optional
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Whether this is an input socket
    pub fn is_input(&self) -> bool {
        self.direction == SocketDirection::Input
    }

    /// Whether this is an output socket
    pub fn is_output(&self) -> bool {
        self.direction == SocketDirection::Output
    }
}

/// A socket on a specific node, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketRef {
    /// Node name
    pub node: String,
    /// Operation type of the node
    pub operation: OperationKind,
    /// Socket name
    pub socket: String,
}

impl SocketRef {
    /// Describe `socket` on `node`
    pub fn new(node: &Node, socket: &str) -> Self {
        Self {
            node: node.name.clone(),
            operation: node.kind(),
            socket: socket.to_string(),
        }
    }
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` on node `{}` ({})", self.socket, self.node, self.operation)
    }
}
