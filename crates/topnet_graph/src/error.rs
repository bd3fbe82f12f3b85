//! Error types for the graph IR.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while working with the graph IR.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("Subnet address space exhausted in {0}")]
    AddressSpaceExhausted(String),

    #[error("Duplicate node id '{0}'")]
    DuplicateNodeId(String),

    #[error("Edge '{edge_id}' references unknown node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("Node '{node_id}' has kind '{kind}' but attributes for '{props_kind}'")]
    KindMismatch {
        node_id: String,
        kind: &'static str,
        props_kind: &'static str,
    },
}
