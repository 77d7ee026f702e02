// SPDX-License-Identifier: MIT OR Apache-2.0
//! Forwarding of external properties to internal node properties.
//!
//! A [`RedirectTable`] maps each public property of a meta-operation to one
//! or more `(node, property)` targets. Every target carries its own
//! [`ValueTransform`], so one external value may reach several nodes under
//! different formulas.

use crate::graph::Graph;
use crate::node::NodeId;
use crate::operation::Operation;
use crate::value::{PropertyError, PropertyValue};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Transformation applied to a value on its way to a redirect target
#[derive(Debug, Clone, Copy, Default)]
pub enum ValueTransform {
    /// Forward unchanged
    #[default]
    Identity,
    /// Multiply numeric values
    Scale(f64),
    /// Add to numeric values
    Offset(f64),
    /// `value * scale + offset` on numeric values
    Affine {
        /// Factor
        scale: f64,
        /// Addend
        offset: f64,
    },
    /// Arbitrary mapping
    Map(fn(&PropertyValue) -> PropertyValue),
}

impl ValueTransform {
    /// Apply the transform. Non-numeric values pass through the numeric
    /// transforms unchanged; integers stay integers.
    pub fn apply(&self, value: &PropertyValue) -> PropertyValue {
        let (scale, offset) = match *self {
            Self::Identity => return value.clone(),
            Self::Map(f) => return f(value),
            Self::Scale(scale) => (scale, 0.0),
            Self::Offset(offset) => (1.0, offset),
            Self::Affine { scale, offset } => (scale, offset),
        };
        match value {
            PropertyValue::Double(v) => PropertyValue::Double(v * scale + offset),
            PropertyValue::Int(v) => PropertyValue::Int((*v as f64 * scale + offset).round() as i64),
            other => other.clone(),
        }
    }
}

/// One destination of a redirect
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    /// Target node
    pub node: NodeId,
    /// Canonical property name on the target node
    pub property: String,
    /// Transform applied before writing
    pub transform: ValueTransform,
}

/// Ordered table of redirects, keyed by external property name
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    entries: IndexMap<String, Vec<RedirectTarget>>,
}

impl RedirectTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target for `external`.
    ///
    /// The node must exist in `graph` and its operation must declare the
    /// property. Aliases are stored under the canonical name.
    pub fn register_redirect(
        &mut self,
        graph: &Graph,
        external: &str,
        node: NodeId,
        property: &str,
        transform: ValueTransform,
    ) -> Result<(), RedirectError> {
        let target = graph
            .node(node)
            .ok_or_else(|| RedirectError::UnknownNode(format!("{node:?}")))?;
        let canonical = target.kind().canonical_property(property).ok_or_else(|| {
            RedirectError::UnknownTargetProperty {
                node: target.name.clone(),
                property: property.to_string(),
            }
        })?;

        tracing::debug!(external, node = %target.name, property = canonical, "Registering redirect");

        self.entries
            .entry(external.to_string())
            .or_default()
            .push(RedirectTarget {
                node,
                property: canonical.to_string(),
                transform,
            });
        Ok(())
    }

    /// Targets registered for `external`, in registration order
    pub fn targets(&self, external: &str) -> Option<&[RedirectTarget]> {
        self.entries.get(external).map(Vec::as_slice)
    }

    /// External names with at least one target
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RedirectTarget])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of external names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forward `value` to every target of `external`.
    ///
    /// All writes are staged and type-checked before any node is touched, so
    /// on error the graph is unchanged. Returns the number of targets written.
    pub fn set_property(
        &self,
        graph: &mut Graph,
        external: &str,
        value: &PropertyValue,
    ) -> Result<usize, PropertyError> {
        let targets = self
            .entries
            .get(external)
            .ok_or_else(|| PropertyError::UnknownProperty {
                owner: graph.name.clone(),
                property: external.to_string(),
            })?;

        let mut staged: IndexMap<NodeId, Operation> = IndexMap::new();
        for target in targets {
            let operation = match staged.entry(target.node) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let node = graph.node(target.node).ok_or_else(|| {
                        PropertyError::UnknownProperty {
                            owner: graph.name.clone(),
                            property: target.property.clone(),
                        }
                    })?;
                    entry.insert(node.operation().clone())
                }
            };
            operation.set(&target.property, &target.transform.apply(value))?;
        }

        for (node_id, operation) in staged {
            if let Some(node) = graph.node_mut(node_id) {
                node.replace_operation(operation);
            }
        }

        tracing::trace!(external, %value, targets = targets.len(), "Forwarded property");
        Ok(targets.len())
    }
}

/// Error when registering a redirect
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RedirectError {
    /// Target node does not exist
    #[error("Redirect target node not found: {0}")]
    UnknownNode(String),

    /// Target operation has no such property
    #[error("Node `{node}` has no property `{property}` to redirect to")]
    UnknownTargetProperty {
        /// Target node name
        node: String,
        /// Requested property
        property: String,
    },
}
