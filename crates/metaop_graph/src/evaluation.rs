// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rendering boundary.
//!
//! Pixel kernels are supplied by the host through [`Evaluator`]. This crate
//! only computes what has to run and in which order.

use crate::graph::{CycleError, Graph};
use crate::node::NodeId;
use crate::socket::SocketRef;
use serde::{Deserialize, Serialize};

/// Rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// Create a region
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the region covers no pixel
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Linear RGBA pixels covering a region
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Covered region
    pub region: Region,
    /// Interleaved RGBA, row-major
    pub data: Vec<f32>,
}

impl PixelBuffer {
    /// Fully transparent buffer
    pub fn transparent(region: Region) -> Self {
        Self {
            region,
            data: vec![0.0; region.area() * 4],
        }
    }

    /// RGBA of one pixel, relative to the region origin
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.region.width || y >= self.region.height {
            return None;
        }
        let i = (y as usize * self.region.width as usize + x as usize) * 4;
        self.data.get(i..i + 4).and_then(|p| p.try_into().ok())
    }
}

/// Nodes needed to produce the graph's output, producers first
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    order: Vec<NodeId>,
}

impl RenderPlan {
    /// Plan the evaluation of `graph`.
    ///
    /// Only nodes the output proxy depends on are scheduled. Each of them
    /// must have its required inputs connected.
    pub fn new(graph: &Graph) -> Result<Self, EvaluationError> {
        let needed = graph.upstream(graph.output_proxy());
        let order: Vec<NodeId> = graph
            .topological_order()?
            .into_iter()
            .filter(|id| needed.contains(id))
            .collect();

        for node in order.iter().filter_map(|id| graph.node(*id)) {
            if node.id == graph.input_proxy() {
                continue;
            }
            for socket in node.sockets().iter().filter(|s| s.is_input() && s.required) {
                if graph.producer(node.id, socket.name).is_none() {
                    return Err(EvaluationError::MissingInput(SocketRef::new(node, socket.name)));
                }
            }
        }

        Ok(Self { order })
    }

    /// Evaluation order
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Number of scheduled nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a node is scheduled
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.order.contains(&node_id)
    }
}

/// Renders a graph over a region
pub trait Evaluator {
    /// Render the output proxy of `graph`
    fn render(&self, graph: &Graph, region: Region) -> Result<PixelBuffer, EvaluationError>;
}

/// Evaluator that checks the plan and returns a transparent buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvaluator;

impl Evaluator for NullEvaluator {
    fn render(&self, graph: &Graph, region: Region) -> Result<PixelBuffer, EvaluationError> {
        if region.is_empty() {
            return Err(EvaluationError::EmptyRegion(region));
        }
        let plan = RenderPlan::new(graph)?;
        tracing::trace!(graph = %graph.name, nodes = plan.len(), "Null render");
        Ok(PixelBuffer::transparent(region))
    }
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Graph contains a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(SocketRef),

    /// Nothing to render
    #[error("Empty region {0:?}")]
    EmptyRegion(Region),

    /// Failure reported by a host evaluator
    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::operation::OperationKind;
    use crate::socket::{AUX, OUTPUT};

    #[test]
    fn test_plan_skips_unused_nodes() {
        let mut graph = Graph::new("test");
        let over = graph.add_node(Node::from_kind("over", OperationKind::Over)).unwrap();
        let noise = graph.add_node(Node::from_kind("noise", OperationKind::CellNoise)).unwrap();
        let stray = graph.add_node(Node::from_kind("stray", OperationKind::DropShadow)).unwrap();
        graph.link_chain(&[graph.input_proxy(), over, graph.output_proxy()]).unwrap();
        graph.connect(noise, OUTPUT, over, AUX).unwrap();

        let plan = RenderPlan::new(&graph).unwrap();
        assert_eq!(plan.len(), 4);
        assert!(!plan.contains(stray));
        assert_eq!(plan.order().last(), Some(&graph.output_proxy()));
    }

    #[test]
    fn test_plan_reports_missing_input() {
        let mut graph = Graph::new("test");
        let shadow = graph.add_node(Node::from_kind("shadow", OperationKind::DropShadow)).unwrap();
        graph.link(shadow, graph.output_proxy()).unwrap();
        assert!(matches!(
            RenderPlan::new(&graph),
            Err(EvaluationError::MissingInput(ref s)) if s.node == "shadow"
        ));
    }

    #[test]
    fn test_null_evaluator() {
        let mut graph = Graph::new("test");
        graph.link(graph.input_proxy(), graph.output_proxy()).unwrap();

        let buffer = NullEvaluator.render(&graph, Region::new(0, 0, 4, 2)).unwrap();
        assert_eq!(buffer.data.len(), 32);
        assert_eq!(buffer.pixel(3, 1), Some([0.0; 4]));
        assert_eq!(buffer.pixel(4, 0), None);
        assert!(matches!(
            NullEvaluator.render(&graph, Region::new(0, 0, 0, 2)),
            Err(EvaluationError::EmptyRegion(_))
        ));
    }
}
