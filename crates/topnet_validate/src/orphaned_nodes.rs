//! Resources must be connected to their parent resources.

use std::collections::{HashMap, HashSet};

use topnet_graph::{EdgeKind, Finding, Graph, GatewayType, NodeKind};

/// Check for orphaned resources, usually the result of hand-editing:
/// subnets without a network, instances and databases without a subnet,
/// security groups and internet gateways without a network, NAT gateways
/// without a subnet. Each orphan is a `warning`.
pub fn validate_orphaned_nodes(graph: &Graph) -> Vec<Finding> {
    let mut results = Vec::new();

    let network_ids: HashSet<&str> = graph
        .nodes_of_kind(NodeKind::Network)
        .map(|n| n.id.as_str())
        .collect();
    let subnet_ids: HashSet<&str> = graph
        .nodes_of_kind(NodeKind::Subnet)
        .map(|n| n.id.as_str())
        .collect();

    // node id -> everything it is attached to / contained by
    let mut attachments: HashMap<&str, HashSet<&str>> = HashMap::new();
    for edge in &graph.edges {
        match edge.kind {
            EdgeKind::AttachedTo => {
                attachments
                    .entry(edge.from.as_str())
                    .or_default()
                    .insert(edge.to.as_str());
            }
            EdgeKind::Contains => {
                attachments
                    .entry(edge.to.as_str())
                    .or_default()
                    .insert(edge.from.as_str());
            }
            _ => {}
        }
    }
    let empty = HashSet::new();

    for node in &graph.nodes {
        let attached = attachments.get(node.id.as_str()).unwrap_or(&empty);
        let has_network = attached.iter().any(|id| network_ids.contains(id));
        let has_subnet = attached.iter().any(|id| subnet_ids.contains(id));

        match node.kind {
            NodeKind::Subnet if !has_network => {
                results.push(Finding::warning(
                    "orphan-subnet",
                    format!("Subnet '{}' is not attached to any network", node.label()),
                    vec![node.id.clone()],
                ));
            }
            NodeKind::ComputeInstance if !has_subnet => {
                results.push(Finding::warning(
                    "orphan-compute",
                    format!("Instance '{}' is not attached to any subnet", node.label()),
                    vec![node.id.clone()],
                ));
            }
            NodeKind::Database => {
                let has_subnet_prop = node
                    .props
                    .as_database()
                    .map(|db| !db.subnet_ids.is_empty())
                    .unwrap_or(false);
                if !has_subnet && !has_subnet_prop {
                    results.push(Finding::warning(
                        "orphan-database",
                        format!("Database '{}' is not attached to any subnet", node.label()),
                        vec![node.id.clone()],
                    ));
                }
            }
            NodeKind::SecurityGroup if !has_network => {
                results.push(Finding::warning(
                    "orphan-sg",
                    format!(
                        "Security group '{}' is not attached to any network",
                        node.label()
                    ),
                    vec![node.id.clone()],
                ));
            }
            NodeKind::Gateway => {
                let gateway = node.props.as_gateway();
                match gateway.map(|g| g.gateway_type) {
                    Some(GatewayType::Internet) if !has_network => {
                        results.push(Finding::warning(
                            "orphan-igw",
                            format!(
                                "Internet gateway '{}' is not attached to any network",
                                node.label()
                            ),
                            vec![node.id.clone()],
                        ));
                    }
                    Some(GatewayType::Nat) => {
                        let has_subnet_prop = gateway
                            .and_then(|g| g.subnet_id.as_ref())
                            .is_some();
                        if !has_subnet && !has_subnet_prop {
                            results.push(Finding::warning(
                                "orphan-nat",
                                format!(
                                    "NAT gateway '{}' is not attached to any subnet",
                                    node.label()
                                ),
                                vec![node.id.clone()],
                            ));
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    results
}
