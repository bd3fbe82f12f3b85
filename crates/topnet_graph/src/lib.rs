//! # topnet_graph
//!
//! The topology graph intermediate representation shared by the builder,
//! the validation engine and the Terraform generator.
//!
//! A [`Graph`] is a flat list of typed [`Node`]s and directed [`Edge`]s.
//! Kind-specific attributes live in the [`NodeProps`] sum type, so a subnet
//! can never carry database attributes and vice versa. The IR itself has no
//! behavior beyond lookups and integrity checks; producing and consuming
//! graphs is the job of the sibling crates.

pub mod cidr;
pub mod error;
pub mod finding;
pub mod props;
pub mod types;

pub use cidr::{Ipv4Cidr, SubnetAllocator};
pub use error::{GraphError, GraphResult};
pub use finding::{Finding, Severity};
pub use props::{
    ComputeProps, DatabaseProps, GatewayProps, GatewayType, LbScheme, LoadBalancerProps,
    NetworkProps, NodeProps, Route, RouteTableProps, RuleSource, SecurityGroupProps, SecurityRule,
    SubnetProps,
};
pub use types::{Edge, EdgeKind, EdgeProps, Graph, Node, NodeKind, Provider};
