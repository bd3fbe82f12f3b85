//! Error types for deployment descriptor generation.

use thiserror::Error;
use topnet_graph::{GraphError, NodeKind};

/// Result type alias for generation operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while lowering a graph to a deployment descriptor.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("resource '{resource}' references node '{reference}' which is not in the graph")]
    DanglingReference { resource: String, reference: String },

    #[error("node '{node_id}' of kind '{}' has no deployable form", .kind.as_str())]
    UnsupportedNodeKind { node_id: String, kind: NodeKind },

    #[error("graph contains deployable nodes but no network container")]
    MissingNetwork,

    #[error("node '{node_id}' is missing a required attachment: {needs}")]
    MissingAttachment { node_id: String, needs: String },

    #[error("node '{0}' carries no region and no machine image can be chosen")]
    MissingRegion(String),

    #[error("no node carries a region, so no provider region can be chosen")]
    MissingProviderRegion,

    #[error("no machine image is registered for region '{0}'")]
    UnknownRegion(String),

    #[error("database '{0}' has no eligible subnets to form a subnet group")]
    NoEligibleSubnets(String),

    #[error("route table '{route_table}' routes to '{target}', which is not a gateway")]
    InvalidRouteTarget { route_table: String, target: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
