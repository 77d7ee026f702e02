// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative construction of meta-operation graphs.
//!
//! A [`Recipe`] describes topology as data: chains, auxiliary feeds,
//! replace/content wraps and embedded mini-DSL fragments. The
//! [`GraphBuilder`] turns recipes into nodes and connections and records
//! property redirects by node name.

use crate::dsl::{Fragment, SyntaxError};
use crate::graph::{Bounds, ConnectionError, Graph, ValidationError};
use crate::node::{Node, NodeId};
use crate::operation::OperationKind;
use crate::redirect::{RedirectError, RedirectTable, ValueTransform};
use crate::schema::PropertySchema;
use crate::socket::{AUX, INPUT, OUTPUT};
use crate::value::{PropertyError, PropertyValue};
use indexmap::IndexMap;

/// A node to be created, with its initial properties
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    name: Option<String>,
    kind: OperationKind,
    properties: Vec<(String, PropertyValue)>,
}

impl NodeSpec {
    /// Anonymous node of the given operation type
    pub fn new(kind: OperationKind) -> Self {
        Self {
            name: None,
            kind,
            properties: Vec::new(),
        }
    }

    /// Give the node a name so it can be referenced and redirected to
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set an initial property; checked when the node is built
    pub fn with(mut self, property: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((property.to_string(), value.into()));
        self
    }

    /// Feed `source` into this node's `aux`
    pub fn aux(self, source: impl Into<Recipe>) -> Recipe {
        self.feed(AUX, source)
    }

    /// Feed `source` into the given input socket of this node
    pub fn feed(self, socket: &str, source: impl Into<Recipe>) -> Recipe {
        Recipe::Feed {
            target: Box::new(self.into()),
            socket: socket.to_string(),
            source: Box::new(source.into()),
        }
    }

    /// Use this node as the outer node of a replace/content wrap
    pub fn wrap(self, content: impl Into<Recipe>) -> Recipe {
        Recipe::Wrap {
            outer: self,
            content: Box::new(content.into()),
        }
    }
}

/// Declarative description of a sub-graph
#[derive(Debug, Clone, PartialEq)]
pub enum Recipe {
    /// Create one node
    Node(NodeSpec),
    /// An already created node, by name
    Ref(String),
    /// Link each element's last node to the next element's first node
    Chain(Vec<Recipe>),
    /// Connect `source`'s output to `socket` of `target`'s last node
    Feed {
        /// Receiving side
        target: Box<Recipe>,
        /// Input socket on the receiving node
        socket: String,
        /// Producing side
        source: Box<Recipe>,
    },
    /// `outer` sits in the surrounding chain; `content` only feeds its `aux`
    Wrap {
        /// Node placed in the chain
        outer: NodeSpec,
        /// Independently built sub-graph
        content: Box<Recipe>,
    },
    /// Mini-DSL fragment spliced as a chain
    Embedded(String),
}

impl Recipe {
    /// Chain of recipes
    pub fn chain<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Recipe>,
    {
        Self::Chain(items.into_iter().map(Into::into).collect())
    }

    /// Reference to a named node
    pub fn reference(name: &str) -> Self {
        Self::Ref(name.to_string())
    }

    /// Embedded graph string
    pub fn embedded(text: &str) -> Self {
        Self::Embedded(text.to_string())
    }
}

impl From<NodeSpec> for Recipe {
    fn from(spec: NodeSpec) -> Self {
        Self::Node(spec)
    }
}

impl From<OperationKind> for Recipe {
    fn from(kind: OperationKind) -> Self {
        Self::Node(NodeSpec::new(kind))
    }
}

struct PendingRedirect {
    external: String,
    node: String,
    property: String,
    transform: ValueTransform,
}

/// Builds a graph and its redirect table from recipes
pub struct GraphBuilder {
    graph: Graph,
    names: IndexMap<String, NodeId>,
    redirects: Vec<PendingRedirect>,
}

impl GraphBuilder {
    /// Start a graph containing only its proxies. The proxies can be
    /// referenced as `input` and `output`.
    pub fn new(name: &str) -> Self {
        let graph = Graph::new(name);
        let mut names = IndexMap::new();
        names.insert(INPUT.to_string(), graph.input_proxy());
        names.insert(OUTPUT.to_string(), graph.output_proxy());
        Self {
            graph,
            names,
            redirects: Vec::new(),
        }
    }

    /// The input proxy
    pub fn input(&self) -> NodeId {
        self.graph.input_proxy()
    }

    /// The output proxy
    pub fn output(&self) -> NodeId {
        self.graph.output_proxy()
    }

    /// Graph built so far
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Look up a named node
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Build a recipe and return the first and last node it produced
    pub fn build(&mut self, recipe: &Recipe) -> Result<Bounds, BuildError> {
        match recipe {
            Recipe::Node(spec) => self.create(spec).map(Bounds::single),
            Recipe::Ref(name) => self
                .node_id(name)
                .map(Bounds::single)
                .ok_or_else(|| BuildError::UnknownNode(name.clone())),
            Recipe::Chain(items) => {
                let mut bounds: Option<Bounds> = None;
                for item in items {
                    let next = self.build(item)?;
                    bounds = Some(match bounds {
                        Some(previous) => {
                            self.graph.link(previous.last, next.first)?;
                            Bounds {
                                first: previous.first,
                                last: next.last,
                            }
                        }
                        None => next,
                    });
                }
                bounds.ok_or(BuildError::EmptyChain)
            }
            Recipe::Feed { target, socket, source } => {
                let target = self.build(target)?;
                let source = self.build(source)?;
                self.graph.connect(source.last, OUTPUT, target.last, socket)?;
                Ok(target)
            }
            Recipe::Wrap { outer, content } => {
                let outer = self.create(outer)?;
                let content = self.build(content)?;
                self.graph.connect(content.last, OUTPUT, outer, AUX)?;
                Ok(Bounds::single(outer))
            }
            Recipe::Embedded(text) => {
                let fragment = Fragment::parse(text)?;
                Ok(self.graph.splice(&fragment)?)
            }
        }
    }

    /// Build `recipe` between the input and output proxies
    pub fn main_chain(&mut self, recipe: &Recipe) -> Result<Bounds, BuildError> {
        let bounds = self.build(recipe)?;
        self.graph.link(self.input(), bounds.first)?;
        self.graph.link(bounds.last, self.output())?;
        Ok(bounds)
    }

    /// Forward external property `external` to `property` of node `node`
    pub fn redirect(&mut self, external: &str, node: &str, property: &str) {
        self.redirect_with(external, node, property, ValueTransform::Identity);
    }

    /// Forward with a transform applied on the way
    pub fn redirect_with(&mut self, external: &str, node: &str, property: &str, transform: ValueTransform) {
        self.redirects.push(PendingRedirect {
            external: external.to_string(),
            node: node.to_string(),
            property: property.to_string(),
            transform,
        });
    }

    /// Resolve redirects against `schema`, validate the graph, push every
    /// schema default through the redirects and attach.
    pub fn finish(mut self, schema: &[PropertySchema]) -> Result<(Graph, RedirectTable), BuildError> {
        let mut table = RedirectTable::new();
        for pending in &self.redirects {
            if !schema.iter().any(|p| p.name == pending.external) {
                return Err(BuildError::UnknownRedirectSource(pending.external.clone()));
            }
            let node = self
                .node_id(&pending.node)
                .ok_or_else(|| BuildError::UnknownNode(pending.node.clone()))?;
            table.register_redirect(&self.graph, &pending.external, node, &pending.property, pending.transform)?;
        }

        if let Some(missing) = schema.iter().find(|p| table.targets(&p.name).is_none()) {
            return Err(BuildError::UnredirectedProperty(missing.name.clone()));
        }

        self.graph.validate()?;

        for property in schema {
            table
                .set_property(&mut self.graph, &property.name, &property.default)
                .map_err(|source| BuildError::Default {
                    property: property.name.clone(),
                    source,
                })?;
        }

        self.graph.attach()?;
        Ok((self.graph, table))
    }

    fn create(&mut self, spec: &NodeSpec) -> Result<NodeId, BuildError> {
        let name = spec.name.clone().unwrap_or_else(|| spec.kind.identifier().to_string());
        if spec.name.is_some() && self.names.contains_key(&name) {
            return Err(BuildError::DuplicateNodeName(name));
        }

        let node = Node::with_properties(name.clone(), spec.kind, spec.properties.iter().map(|(k, v)| (k, v.clone())))
            .map_err(|source| BuildError::Property {
                node: name.clone(),
                source,
            })?;
        let id = self.graph.add_node(node)?;
        if spec.name.is_some() {
            self.names.insert(name, id);
        }
        Ok(id)
    }
}

/// Error while building a meta-operation graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Invalid connection
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Initial property rejected by a node
    #[error("Node `{node}`: {source}")]
    Property {
        /// Node name
        node: String,
        /// Underlying error
        #[source]
        source: PropertyError,
    },

    /// Embedded fragment does not parse
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// `Ref` or redirect to a name that was never created
    #[error("Unknown node name `{0}`")]
    UnknownNode(String),

    /// Two nodes with the same name
    #[error("Node name `{0}` is already taken")]
    DuplicateNodeName(String),

    /// `Chain` without elements
    #[error("Empty chain in recipe")]
    EmptyChain,

    /// Redirect target rejected
    #[error(transparent)]
    Redirect(#[from] RedirectError),

    /// Graph is not ready for evaluation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Schema property with no redirect target
    #[error("Property `{0}` is not redirected to any node")]
    UnredirectedProperty(String),

    /// Redirect from a name that is not in the schema
    #[error("Redirect source `{0}` is not a declared property")]
    UnknownRedirectSource(String),

    /// Default value could not be applied to a target
    #[error("Default of `{property}` does not fit its target: {source}")]
    Default {
        /// Schema property
        property: String,
        /// Underlying error
        #[source]
        source: PropertyError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::BlendMode;
    use crate::value::Color;

    #[test]
    fn test_chain_with_side_feed() {
        let mut builder = GraphBuilder::new("test");
        let recipe = Recipe::chain([
            NodeSpec::new(OperationKind::LayerMode)
                .named("divide")
                .with("layer-mode", BlendMode::Divide)
                .aux(NodeSpec::new(OperationKind::CellNoise).named("noise")),
            NodeSpec::new(OperationKind::DropShadow).named("ds").into(),
        ]);
        let bounds = builder.main_chain(&recipe).unwrap();

        let graph = builder.graph();
        let divide = builder.node_id("divide").unwrap();
        let noise = builder.node_id("noise").unwrap();
        let ds = builder.node_id("ds").unwrap();
        assert_eq!(bounds, Bounds { first: divide, last: ds });
        assert_eq!(graph.producer(divide, AUX).map(|c| c.from_node), Some(noise));
        assert_eq!(graph.producer(divide, INPUT).map(|c| c.from_node), Some(graph.input_proxy()));
        assert_eq!(graph.producer(graph.output_proxy(), INPUT).map(|c| c.from_node), Some(ds));
        graph.validate().unwrap();
    }

    #[test]
    fn test_wrap_feeds_only_aux() {
        let mut builder = GraphBuilder::new("test");
        let recipe = Recipe::chain([
            NodeSpec::new(OperationKind::Nop).named("id").into(),
            NodeSpec::new(OperationKind::Src).named("replace").wrap(Recipe::chain([
                Recipe::reference("id"),
                NodeSpec::new(OperationKind::ColorOverlay)
                    .named("tint")
                    .with("value", Color::hex(0xff7aff))
                    .into(),
            ])),
            Recipe::embedded("rgb-clip"),
        ]);
        builder.main_chain(&recipe).unwrap();

        let graph = builder.graph();
        let id = builder.node_id("id").unwrap();
        let replace = builder.node_id("replace").unwrap();
        let tint = builder.node_id("tint").unwrap();

        assert_eq!(graph.producer(replace, INPUT).map(|c| c.from_node), Some(id));
        assert_eq!(graph.producer(replace, AUX).map(|c| c.from_node), Some(tint));
        let downstream: Vec<NodeId> = graph.consumers(replace).map(|c| c.to_node).collect();
        assert_eq!(downstream.len(), 1);
        assert_eq!(graph.node(downstream[0]).unwrap().kind(), OperationKind::RgbClip);
        assert_eq!(graph.consumers(tint).count(), 1);
    }

    #[test]
    fn test_structural_errors() {
        let mut builder = GraphBuilder::new("test");
        assert_eq!(
            builder.build(&Recipe::reference("missing")),
            Err(BuildError::UnknownNode("missing".to_string()))
        );
        assert_eq!(builder.build(&Recipe::Chain(Vec::new())), Err(BuildError::EmptyChain));

        builder.build(&NodeSpec::new(OperationKind::Nop).named("a").into()).unwrap();
        assert_eq!(
            builder.build(&NodeSpec::new(OperationKind::Nop).named("a").into()),
            Err(BuildError::DuplicateNodeName("a".to_string()))
        );
        assert!(matches!(
            builder.build(&NodeSpec::new(OperationKind::Nop).with("radius", 1.0).into()),
            Err(BuildError::Property { .. })
        ));
        assert!(matches!(
            builder.build(&Recipe::embedded("blur radius=")),
            Err(BuildError::Syntax(_))
        ));
        assert!(matches!(
            builder.build(&Recipe::chain([OperationKind::Nop, OperationKind::CellNoise])),
            Err(BuildError::Connection(ConnectionError::DanglingSocket(_)))
        ));
    }

    #[test]
    fn test_finish_checks_redirects() {
        let schema = [PropertySchema::double("scale", 0.5).value_range(0.0, 1.0)];

        let mut builder = GraphBuilder::new("test");
        builder.main_chain(&NodeSpec::new(OperationKind::Nop).into()).unwrap();
        assert_eq!(
            builder.finish(&schema).unwrap_err(),
            BuildError::UnredirectedProperty("scale".to_string())
        );

        let mut builder = GraphBuilder::new("test");
        builder.main_chain(&NodeSpec::new(OperationKind::Nop).into()).unwrap();
        builder.redirect("zoom", "output", "value");
        assert_eq!(
            builder.finish(&schema).unwrap_err(),
            BuildError::UnknownRedirectSource("zoom".to_string())
        );
    }

    #[test]
    fn test_finish_applies_defaults_and_attaches() {
        let schema = [PropertySchema::double("scale", 0.5).value_range(0.0, 1.0)];
        let mut builder = GraphBuilder::new("test");
        builder
            .main_chain(&NodeSpec::new(OperationKind::Over).aux(NodeSpec::new(OperationKind::CellNoise).named("noise")))
            .unwrap();
        builder.redirect("scale", "noise", "scale");

        let (graph, table) = builder.finish(&schema).unwrap();
        assert!(graph.is_attached());
        let noise = table.targets("scale").unwrap()[0].node;
        assert_eq!(graph.node(noise).unwrap().property("scale"), Some(PropertyValue::Double(0.5)));
    }

    #[test]
    fn test_finish_rejects_unconnected_input() {
        let mut builder = GraphBuilder::new("test");
        builder.build(&NodeSpec::new(OperationKind::DropShadow).into()).unwrap();
        assert!(matches!(
            builder.finish(&[]),
            Err(BuildError::Validation(ValidationError::UnconnectedRequiredSocket(_)))
        ));
    }
}
