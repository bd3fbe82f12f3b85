//! Error types for topology building.

use thiserror::Error;
use topnet_graph::GraphError;
use topnet_spec::ComponentRole;

/// Result type alias for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that fail a build before any graph is returned.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Unsupported provider '{0}' (only 'aws' can be built)")]
    UnsupportedProvider(String),

    #[error("Component role '{0}' cannot be realized as topology")]
    UnsupportedRole(ComponentRole),

    #[error("Component '{role}' requires at least one instance, got quantity {quantity}")]
    InvalidQuantity { role: ComponentRole, quantity: u32 },

    #[error("Component '{role}' quantity {quantity} exceeds the limit of {max}")]
    QuantityTooLarge {
        role: ComponentRole,
        quantity: u32,
        max: u32,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}
