//! Subnet CIDR blocks within the same network container must not overlap.

use std::collections::{BTreeMap, HashSet};

use topnet_graph::{EdgeKind, Finding, Graph, Ipv4Cidr, Node, NodeKind};

/// Check for overlapping CIDR blocks among subnets of the same network.
///
/// Pairwise comparison is O(n²) per container, which is fine for the tens
/// of subnets a realistic graph carries. One `error` per overlapping pair.
pub fn validate_cidr_overlap(graph: &Graph) -> Vec<Finding> {
    let mut results = Vec::new();

    let network_ids: HashSet<&str> = graph
        .nodes_of_kind(NodeKind::Network)
        .map(|n| n.id.as_str())
        .collect();

    // network id -> subnets attached to it
    let mut by_network: BTreeMap<&str, Vec<(&Node, Ipv4Cidr)>> = BTreeMap::new();
    for subnet in graph.nodes_of_kind(NodeKind::Subnet) {
        let Some(props) = subnet.props.as_subnet() else {
            continue;
        };
        let owner = graph.edges.iter().find_map(|e| match e.kind {
            EdgeKind::AttachedTo if e.from == subnet.id && network_ids.contains(e.to.as_str()) => {
                Some(e.to.as_str())
            }
            EdgeKind::Contains if e.to == subnet.id && network_ids.contains(e.from.as_str()) => {
                Some(e.from.as_str())
            }
            _ => None,
        });
        if let Some(owner) = owner {
            by_network
                .entry(owner)
                .or_default()
                .push((subnet, props.cidr_block));
        }
    }

    for subnets in by_network.values() {
        for (i, (node_a, cidr_a)) in subnets.iter().enumerate() {
            for (node_b, cidr_b) in &subnets[i + 1..] {
                if cidr_a.overlaps(cidr_b) {
                    results.push(Finding::error(
                        "cidr-overlap",
                        format!(
                            "CIDR overlap: '{}' ({}) overlaps with '{}' ({})",
                            node_a.label(),
                            cidr_a,
                            node_b.label(),
                            cidr_b
                        ),
                        vec![node_a.id.clone(), node_b.id.clone()],
                    ));
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use topnet_graph::{Edge, NetworkProps, NodeProps, Severity, SubnetProps};

    fn graph_with_subnets(cidrs: &[&str]) -> Graph {
        let mut graph = Graph::new("g");
        graph.nodes.push(Node::new(
            "vpc-main",
            NodeProps::Network(NetworkProps {
                cidr_block: "10.0.0.0/16".parse().unwrap(),
                enable_dns_hostnames: true,
                enable_dns_support: true,
            }),
        ));
        for (i, cidr) in cidrs.iter().enumerate() {
            let id = format!("subnet-{}", i + 1);
            graph.nodes.push(Node::new(
                id.clone(),
                NodeProps::Subnet(SubnetProps {
                    cidr_block: cidr.parse().unwrap(),
                    is_public: true,
                    map_public_ip_on_launch: true,
                }),
            ));
            graph.edges.push(Edge {
                id: format!("e{}", i + 1),
                kind: EdgeKind::AttachedTo,
                from: id,
                to: "vpc-main".to_string(),
                props: None,
            });
        }
        graph
    }

    #[test]
    fn identical_blocks_produce_one_error_naming_both() {
        let graph = graph_with_subnets(&["10.0.1.0/24", "10.0.1.0/24"]);
        let findings = validate_cidr_overlap(&graph);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].node_ids, vec!["subnet-1", "subnet-2"]);
    }

    #[test]
    fn disjoint_blocks_are_clean() {
        let graph = graph_with_subnets(&["10.0.1.0/24", "10.0.2.0/24"]);
        assert!(validate_cidr_overlap(&graph).is_empty());
    }

    #[test]
    fn unattached_subnets_are_not_compared() {
        let mut graph = graph_with_subnets(&["10.0.1.0/24"]);
        // Same block, but attached to no network: not this pass's concern.
        graph.nodes.push(Node::new(
            "subnet-floating",
            NodeProps::Subnet(SubnetProps {
                cidr_block: "10.0.1.0/24".parse().unwrap(),
                is_public: false,
                map_public_ip_on_launch: false,
            }),
        ));
        assert!(validate_cidr_overlap(&graph).is_empty());
    }

    #[test]
    fn pass_does_not_mutate_graph() {
        let graph = graph_with_subnets(&["10.0.1.0/24", "10.0.1.0/24"]);
        let before = graph.clone();
        let _ = validate_cidr_overlap(&graph);
        assert_eq!(graph, before);
    }
}
