//! # topnet_builder
//!
//! Deterministic expansion of a topology spec into a topology graph.
//!
//! Given the same spec and tier the builder always produces an isomorphic
//! graph: same node kinds, attributes and edge structure. Spec errors are
//! reported synchronously and no partial graph is ever returned.
//!
//! ## Example
//!
//! ```rust
//! use topnet_builder::build_topology;
//! use topnet_spec::{ComponentRole, ComponentSpec, TopologySpec};
//!
//! let spec = TopologySpec {
//!     components: vec![ComponentSpec::new(ComponentRole::WebTier, "simple web app")],
//!     ..Default::default()
//! };
//! let graph = build_topology(&spec).unwrap();
//! assert_eq!(graph.nodes_of_kind(topnet_graph::NodeKind::Network).count(), 1);
//! ```

pub mod builder;
pub mod error;

pub use builder::{
    build_topology, select_database_subnets, TopologyBuilder, MAX_COMPONENT_QUANTITY,
};
pub use error::{BuildError, BuildResult};
