// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph engine for GEGL-style meta-operations.
//!
//! A meta-operation computes no pixels itself. It assembles a fixed
//! sub-graph of primitive operations and forwards a few public properties
//! into it.
//!
//! ## Architecture
//!
//! - [`operation`]: closed catalog of primitive operations with typed properties
//! - [`graph`]: nodes, socket connections, proxies, validation
//! - [`dsl`]: linear graph strings such as `"rgb-clip color-to-alpha"`
//! - [`builder`]: declarative recipes (chain, feed, wrap, embedded)
//! - [`redirect`]: external property to internal property forwarding
//! - [`registry`] and [`instance`]: templates and their instances
//! - [`evaluation`]: render planning; pixels come from the host
//!
//! ```
//! use metaop_graph::{MetaOperationRegistry, PropertyValue};
//!
//! let registry = MetaOperationRegistry::with_builtins().unwrap();
//! let mut sparkle = registry.instantiate("gegl:sparkle").unwrap();
//! sparkle.set_property("scale", 0.3).unwrap();
//! assert_eq!(sparkle.property("scale"), Some(&PropertyValue::Double(0.3)));
//! ```

pub mod value;
pub mod socket;
pub mod operation;
pub mod node;
pub mod connection;
pub mod graph;
pub mod dsl;
pub mod redirect;
pub mod schema;
pub mod builder;
pub mod registry;
pub mod instance;
pub mod evaluation;
pub mod operations;

pub use builder::{BuildError, GraphBuilder, NodeSpec, Recipe};
pub use connection::{Connection, ConnectionId};
pub use dsl::{Fragment, SyntaxError};
pub use evaluation::{EvaluationError, Evaluator, NullEvaluator, PixelBuffer, Region, RenderPlan};
pub use graph::{Bounds, ConnectionError, CycleError, Graph, ValidationError};
pub use instance::MetaOperationInstance;
pub use node::{Node, NodeId};
pub use operation::{AbyssPolicy, BlendMode, BlendSpace, DistanceMetric, Operation, OperationKind};
pub use redirect::{RedirectError, RedirectTable, ValueTransform};
pub use registry::{InstantiateError, MetaOperation, MetaOperationRegistry, RegistryError};
pub use schema::{PropertySchema, UiHints, ValueRange};
pub use socket::{Socket, SocketDirection, SocketRef};
pub use value::{Color, FilePath, PropertyError, PropertyKind, PropertyValue, Seed, ValueError};
