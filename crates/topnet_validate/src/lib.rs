//! # topnet_validate
//!
//! Read-only validation passes over a topology graph.
//!
//! Each pass takes `&Graph` and returns a list of findings; no pass mutates
//! its input and all passes run on every request. Findings are advisory —
//! escalating them to a hard failure is caller policy, never enforced here.

pub mod cidr_overlap;
pub mod ha_spof;
pub mod orphaned_nodes;
pub mod reachability;

use tracing::debug;

use topnet_graph::{Finding, Graph};

pub use cidr_overlap::validate_cidr_overlap;
pub use ha_spof::validate_ha_spof;
pub use orphaned_nodes::validate_orphaned_nodes;
pub use reachability::validate_reachability;

/// Run every validation pass and combine the findings.
pub fn run_all_validations(graph: &Graph) -> Vec<Finding> {
    let mut results = Vec::new();
    results.extend(validate_cidr_overlap(graph));
    results.extend(validate_orphaned_nodes(graph));
    results.extend(validate_reachability(graph));
    results.extend(validate_ha_spof(graph));
    debug!(
        graph = %graph.id,
        findings = results.len(),
        "Validation passes complete"
    );
    results
}
