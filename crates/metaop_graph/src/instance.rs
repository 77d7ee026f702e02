// SPDX-License-Identifier: MIT OR Apache-2.0
//! Instantiated meta-operations.

use crate::graph::Graph;
use crate::redirect::RedirectTable;
use crate::registry::MetaOperation;
use crate::schema::PropertySchema;
use crate::value::{PropertyError, PropertyValue};
use indexmap::IndexMap;
use std::sync::Arc;

/// A meta-operation bound to its own graph.
///
/// Writes go through the schema (clamping, type checks) and then through
/// the redirect table. A failed write leaves both the external value and
/// the graph unchanged.
#[derive(Debug, Clone)]
pub struct MetaOperationInstance {
    operation: Arc<MetaOperation>,
    graph: Graph,
    redirects: RedirectTable,
    values: IndexMap<String, PropertyValue>,
}

impl MetaOperationInstance {
    pub(crate) fn new(operation: Arc<MetaOperation>, graph: Graph, redirects: RedirectTable) -> Self {
        let values = operation
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect();
        Self {
            operation,
            graph,
            redirects,
            values,
        }
    }

    /// Meta-operation name
    pub fn name(&self) -> &str {
        &self.operation.name
    }

    /// Template this instance was built from
    pub fn operation(&self) -> &MetaOperation {
        &self.operation
    }

    /// The attached graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The redirect table
    pub fn redirects(&self) -> &RedirectTable {
        &self.redirects
    }

    /// Schema of one property
    pub fn schema(&self, name: &str) -> Option<&PropertySchema> {
        self.operation.property(name)
    }

    /// Current external value
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// All external values, in schema order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set an external property and forward it to every redirect target.
    /// Returns the value actually stored after clamping.
    pub fn set_property(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<PropertyValue, PropertyError> {
        let schema = self
            .operation
            .property(name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                owner: self.operation.name.clone(),
                property: name.to_string(),
            })?;
        let value = schema.coerce(&value.into())?;

        self.redirects.set_property(&mut self.graph, name, &value)?;
        self.values.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Restore every property to its schema default
    pub fn reset(&mut self) -> Result<(), PropertyError> {
        let operation = Arc::clone(&self.operation);
        for property in &operation.properties {
            self.set_property(&property.name, property.default.clone())?;
        }
        Ok(())
    }

    /// Give up the instance and keep its graph
    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildError, GraphBuilder, NodeSpec, Recipe};
    use crate::operation::{BlendMode, OperationKind};
    use crate::redirect::ValueTransform;
    use crate::registry::MetaOperationRegistry;

    fn meter(builder: &mut GraphBuilder) -> Result<(), BuildError> {
        builder.main_chain(&Recipe::chain([
            NodeSpec::new(OperationKind::LayerMode)
                .named("blend")
                .with("layer-mode", BlendMode::Divide)
                .aux(NodeSpec::new(OperationKind::CellNoise)),
            NodeSpec::new(OperationKind::Opacity).named("final").into(),
        ]))?;
        builder.redirect("meter", "final", "value");
        builder.redirect_with("meter", "blend", "opacity", ValueTransform::Scale(0.5));
        Ok(())
    }

    fn instance() -> MetaOperationInstance {
        let mut registry = MetaOperationRegistry::new();
        registry
            .register_meta_operation(MetaOperation {
                name: "test:meter".to_string(),
                title: "Meter".to_string(),
                description: String::new(),
                categories: Vec::new(),
                reference_hash: None,
                menu_path: None,
                menu_label: None,
                properties: vec![PropertySchema::double("meter", 6.0).value_range(0.0, 6.0)],
                build: meter,
            })
            .unwrap();
        registry.instantiate("test:meter").unwrap()
    }

    fn value_of(instance: &MetaOperationInstance, node: &str, property: &str) -> Option<PropertyValue> {
        instance.graph().node_by_name(node).and_then(|n| n.property(property))
    }

    #[test]
    fn test_dual_redirect_with_divergent_transforms() {
        let mut instance = instance();
        assert_eq!(value_of(&instance, "final", "value"), Some(PropertyValue::Double(6.0)));
        assert_eq!(value_of(&instance, "blend", "opacity"), Some(PropertyValue::Double(3.0)));

        instance.set_property("meter", 9.0).unwrap();
        assert_eq!(instance.property("meter"), Some(&PropertyValue::Double(6.0)));
        assert_eq!(value_of(&instance, "final", "value"), Some(PropertyValue::Double(6.0)));
        assert_eq!(value_of(&instance, "blend", "opacity"), Some(PropertyValue::Double(3.0)));

        instance.set_property("meter", 2.0).unwrap();
        assert_eq!(value_of(&instance, "final", "value"), Some(PropertyValue::Double(2.0)));
        assert_eq!(value_of(&instance, "blend", "opacity"), Some(PropertyValue::Double(1.0)));
    }

    #[test]
    fn test_unknown_property() {
        let mut instance = instance();
        assert_eq!(
            instance.set_property("volume", 1.0),
            Err(PropertyError::UnknownProperty {
                owner: "test:meter".to_string(),
                property: "volume".to_string(),
            })
        );
        assert!(instance.property("volume").is_none());
    }

    #[test]
    fn test_into_graph() {
        let instance = instance();
        assert_eq!(instance.name(), "test:meter");
        let graph = instance.into_graph();
        assert!(graph.is_attached());
        assert_eq!(graph.name, "test:meter");
    }
}
