// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of meta-operation templates.

use crate::builder::{BuildError, GraphBuilder};
use crate::graph::Graph;
use crate::instance::MetaOperationInstance;
use crate::redirect::RedirectTable;
use crate::schema::PropertySchema;
use crate::value::PropertyError;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::Arc;

/// Builder function of a meta-operation
pub type BuildFn = fn(&mut GraphBuilder) -> Result<(), BuildError>;

/// A reusable graph template with a public property schema
#[derive(Debug, Clone, Serialize)]
pub struct MetaOperation {
    /// Unique name, e.g. `gegl:sparkle`
    pub name: String,
    /// Display title
    pub title: String,
    /// Description
    pub description: String,
    /// Categories
    pub categories: Vec<String>,
    /// Reference hash of the expected output, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_hash: Option<String>,
    /// Host menu path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_path: Option<String>,
    /// Host menu label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_label: Option<String>,
    /// Public properties, in presentation order
    pub properties: Vec<PropertySchema>,
    /// Topology and redirects
    #[serde(skip)]
    pub build: BuildFn,
}

impl MetaOperation {
    /// Schema of one property
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check property names are unique and defaults admissible
    pub fn validate_schema(&self) -> Result<(), RegistryError> {
        let mut seen = IndexSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(RegistryError::DuplicateProperty {
                    operation: self.name.clone(),
                    property: property.name.clone(),
                });
            }
            property
                .check_default()
                .map_err(|source| RegistryError::InvalidDefault {
                    operation: self.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Build a fresh graph and redirect table with defaults applied
    pub fn build_graph(&self) -> Result<(Graph, RedirectTable), BuildError> {
        let mut builder = GraphBuilder::new(&self.name);
        (self.build)(&mut builder)?;
        builder.finish(&self.properties)
    }
}

/// Registry of meta-operations, in registration order
#[derive(Debug, Default)]
pub struct MetaOperationRegistry {
    operations: IndexMap<String, Arc<MetaOperation>>,
}

impl MetaOperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in meta-operations
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::operations::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Register a meta-operation.
    ///
    /// The schema is checked and the recipe is built once, so a template
    /// that cannot produce a valid graph is rejected here rather than at
    /// instantiation.
    pub fn register_meta_operation(&mut self, operation: MetaOperation) -> Result<(), RegistryError> {
        if self.operations.contains_key(&operation.name) {
            return Err(RegistryError::DuplicateName(operation.name));
        }
        operation.validate_schema()?;

        let (graph, redirects) = operation
            .build_graph()
            .map_err(|source| RegistryError::InvalidRecipe {
                operation: operation.name.clone(),
                source,
            })?;

        tracing::info!(
            name = %operation.name,
            properties = operation.properties.len(),
            nodes = graph.node_count(),
            redirects = redirects.len(),
            "Registered meta-operation"
        );

        self.operations.insert(operation.name.clone(), Arc::new(operation));
        Ok(())
    }

    /// Look up by full name, or by the part after the namespace when that
    /// is unambiguous (`sparkle` for `gegl:sparkle`).
    pub fn get(&self, name: &str) -> Option<&Arc<MetaOperation>> {
        if let Some(operation) = self.operations.get(name) {
            return Some(operation);
        }
        let mut matches = self
            .operations
            .iter()
            .filter(|(full, _)| full.rsplit(':').next() == Some(name))
            .map(|(_, operation)| operation);
        match (matches.next(), matches.next()) {
            (Some(operation), None) => Some(operation),
            _ => None,
        }
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Registered meta-operations
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetaOperation>> {
        self.operations.values()
    }

    /// Number of registered meta-operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Build an independent instance with every default applied
    pub fn instantiate(&self, name: &str) -> Result<MetaOperationInstance, InstantiateError> {
        let operation = self
            .get(name)
            .ok_or_else(|| InstantiateError::UnknownMetaOperation(name.to_string()))?;
        let (graph, redirects) = operation.build_graph()?;

        tracing::debug!(name = %operation.name, nodes = graph.node_count(), "Instantiated meta-operation");
        Ok(MetaOperationInstance::new(Arc::clone(operation), graph, redirects))
    }
}

/// Error when registering a meta-operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Name already registered
    #[error("Meta-operation `{0}` is already registered")]
    DuplicateName(String),

    /// Property declared twice
    #[error("Meta-operation `{operation}` declares `{property}` twice")]
    DuplicateProperty {
        /// Meta-operation name
        operation: String,
        /// Property name
        property: String,
    },

    /// Default outside its own range or kind
    #[error("Meta-operation `{operation}`: {source}")]
    InvalidDefault {
        /// Meta-operation name
        operation: String,
        /// Underlying error
        #[source]
        source: PropertyError,
    },

    /// Recipe does not produce a valid graph
    #[error("Meta-operation `{operation}` cannot be built: {source}")]
    InvalidRecipe {
        /// Meta-operation name
        operation: String,
        /// Underlying error
        #[source]
        source: BuildError,
    },
}

/// Error when instantiating a meta-operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstantiateError {
    /// Name not registered
    #[error("Unknown meta-operation `{0}`")]
    UnknownMetaOperation(String),

    /// Graph construction failed
    #[error(transparent)]
    Build(#[from] BuildError),
}
