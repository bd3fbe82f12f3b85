//! High-availability intent vs. realized topology: single points of failure.

use std::collections::BTreeMap;

use topnet_graph::{Finding, GatewayType, Graph, NodeKind};
use topnet_spec::tier::signals_high_availability;

/// Check for single points of failure.
///
/// The all-instances-in-one-zone warning only fires when the originating
/// spec text (recorded by the builder under the `intent` metadata key)
/// signaled HA intent; a hobby topology in one zone is not a finding. The
/// single-NAT check is structural: subnets spanning several zones are
/// themselves the multi-zone signal.
pub fn validate_ha_spof(graph: &Graph) -> Vec<Finding> {
    let mut results = Vec::new();

    let ha_intent = graph
        .metadata
        .get("intent")
        .and_then(|v| v.as_str())
        .map(signals_high_availability)
        .unwrap_or(false);

    let mut compute_by_zone: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for instance in graph.nodes_of_kind(NodeKind::ComputeInstance) {
        let zone = instance.az.clone().unwrap_or_else(|| "unknown".to_string());
        compute_by_zone.entry(zone).or_default().push(instance.id.clone());
    }
    let total_compute: usize = compute_by_zone.values().map(Vec::len).sum();

    let subnet_zones: std::collections::BTreeSet<String> = graph
        .nodes_of_kind(NodeKind::Subnet)
        .filter_map(|s| s.az.clone())
        .collect();

    if ha_intent && total_compute > 1 && compute_by_zone.len() == 1 {
        let (zone, instance_ids) = compute_by_zone.iter().next().map(|(z, ids)| (z.clone(), ids.clone())).unwrap_or_default();
        results.push(Finding::warning(
            "ha-single-az-compute",
            format!(
                "High availability was requested but all {total_compute} compute instances \
                 are in a single zone ({zone})"
            ),
            instance_ids,
        ));
    }

    for db in graph.nodes_of_kind(NodeKind::Database) {
        let multi_az = db
            .props
            .as_database()
            .map(|p| p.multi_az)
            .unwrap_or(false);
        if !multi_az {
            results.push(Finding::info(
                "ha-db-single-az",
                format!(
                    "Database '{}' is not configured for multi-zone failover; consider \
                     enabling it for production workloads",
                    db.label()
                ),
                vec![db.id.clone()],
            ));
        }
    }

    let nat_gateways: Vec<_> = graph
        .nodes_of_kind(NodeKind::Gateway)
        .filter(|g| {
            g.props
                .as_gateway()
                .map(|p| p.gateway_type == GatewayType::Nat)
                .unwrap_or(false)
        })
        .collect();
    if nat_gateways.len() == 1 && subnet_zones.len() > 1 {
        let nat = nat_gateways[0];
        results.push(Finding::warning(
            "ha-single-nat",
            format!(
                "Single NAT gateway '{}' in {} while subnets span {} zones; losing it cuts \
                 egress for the other zones",
                nat.label(),
                nat.az.as_deref().unwrap_or("an unknown zone"),
                subnet_zones.len()
            ),
            vec![nat.id.clone()],
        ));
    }

    if total_compute > 1 && compute_by_zone.len() == 1 {
        for lb in graph.nodes_of_kind(NodeKind::LoadBalancer) {
            let mut node_ids = vec![lb.id.clone()];
            node_ids.extend(compute_by_zone.values().flatten().cloned());
            results.push(Finding::warning(
                "ha-lb-single-az",
                format!(
                    "Load balancer '{}' fronts instances that all share one zone, which \
                     defeats its availability purpose",
                    lb.label()
                ),
                node_ids,
            ));
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use topnet_graph::{ComputeProps, GatewayProps, Node, NodeProps, Severity, SubnetProps};

    fn instance(id: &str, az: &str) -> Node {
        Node::new(
            id,
            NodeProps::Compute(ComputeProps {
                instance_type: "t3.micro".to_string(),
                subnet_id: "subnet-1".to_string(),
                security_groups: vec![],
                associate_public_ip: false,
            }),
        )
        .with_az(az)
    }

    fn subnet(id: &str, az: &str) -> Node {
        Node::new(
            id,
            NodeProps::Subnet(SubnetProps {
                cidr_block: "10.0.0.0/24".parse().unwrap(),
                is_public: false,
                map_public_ip_on_launch: false,
            }),
        )
        .with_az(az)
    }

    #[test]
    fn single_zone_fleet_with_ha_intent_warns() {
        let mut graph = Graph::new("g");
        graph
            .metadata
            .insert("intent".into(), "production high availability".into());
        graph.nodes.push(instance("ec2-1", "us-east-1a"));
        graph.nodes.push(instance("ec2-2", "us-east-1a"));

        let findings = validate_ha_spof(&graph);
        assert!(findings
            .iter()
            .any(|f| f.id.starts_with("ha-single-az-compute-")));
    }

    #[test]
    fn single_zone_fleet_without_intent_is_quiet() {
        let mut graph = Graph::new("g");
        graph.metadata.insert("intent".into(), "simple web app".into());
        graph.nodes.push(instance("ec2-1", "us-east-1a"));
        graph.nodes.push(instance("ec2-2", "us-east-1a"));

        assert!(!validate_ha_spof(&graph)
            .iter()
            .any(|f| f.id.starts_with("ha-single-az-compute-")));
    }

    #[test]
    fn single_nat_across_zones_is_structural() {
        let mut graph = Graph::new("g");
        graph.nodes.push(subnet("subnet-1", "us-east-1a"));
        graph.nodes.push(subnet("subnet-2", "us-east-1b"));
        graph.nodes.push(
            Node::new(
                "nat-main",
                NodeProps::Gateway(GatewayProps {
                    gateway_type: GatewayType::Nat,
                    subnet_id: Some("subnet-1".to_string()),
                }),
            )
            .with_az("us-east-1a"),
        );

        let findings = validate_ha_spof(&graph);
        let nat_warnings: Vec<_> = findings
            .iter()
            .filter(|f| f.id.starts_with("ha-single-nat-"))
            .collect();
        assert_eq!(nat_warnings.len(), 1);
        assert_eq!(nat_warnings[0].severity, Severity::Warning);
    }
}
