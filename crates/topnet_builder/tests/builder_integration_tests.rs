//! Integration tests for the topology builder.

use topnet_builder::{build_topology, BuildError, TopologyBuilder};
use topnet_graph::{EdgeKind, GatewayType, NodeKind, RuleSource};
use topnet_spec::{ComponentRole, ComponentSpec, Constraints, TopologySpec};

fn web_db_spec(web_description: &str, db_description: &str) -> TopologySpec {
    TopologySpec {
        provider: "aws".to_string(),
        region: "us-east-2".to_string(),
        components: vec![
            ComponentSpec::new(ComponentRole::WebTier, web_description).with_quantity(1),
            ComponentSpec::new(ComponentRole::DbTier, db_description).with_quantity(1),
        ],
    }
}

fn count_kind(graph: &topnet_graph::Graph, kind: NodeKind) -> usize {
    graph.nodes_of_kind(kind).count()
}

#[test]
fn minimal_tier1_web_db_scenario() {
    let spec = web_db_spec("simple web app", "postgres database");
    let graph = build_topology(&spec).unwrap();

    assert_eq!(count_kind(&graph, NodeKind::Network), 1);
    assert_eq!(count_kind(&graph, NodeKind::Subnet), 1);
    assert_eq!(count_kind(&graph, NodeKind::Gateway), 1);
    assert_eq!(count_kind(&graph, NodeKind::RouteTable), 1);
    assert_eq!(count_kind(&graph, NodeKind::SecurityGroup), 2);
    assert_eq!(count_kind(&graph, NodeKind::ComputeInstance), 1);
    assert_eq!(count_kind(&graph, NodeKind::Database), 1);
    assert_eq!(count_kind(&graph, NodeKind::LoadBalancer), 0);

    let subnet = graph.nodes_of_kind(NodeKind::Subnet).next().unwrap();
    assert!(subnet.props.as_subnet().unwrap().is_public);

    // Single gateway, and it is the internet gateway (no NAT).
    let gateway = graph.nodes_of_kind(NodeKind::Gateway).next().unwrap();
    assert_eq!(
        gateway.props.as_gateway().unwrap().gateway_type,
        GatewayType::Internet
    );
}

#[test]
fn tier2_upgrade_via_keywords() {
    let spec = web_db_spec(
        "production, high availability web app",
        "postgres database",
    );
    let graph = build_topology(&spec).unwrap();

    // Two zones, public + private pair per zone.
    let subnets: Vec<_> = graph.nodes_of_kind(NodeKind::Subnet).collect();
    assert_eq!(subnets.len(), 4);
    let zones: std::collections::BTreeSet<_> =
        subnets.iter().filter_map(|s| s.az.clone()).collect();
    assert_eq!(zones.len(), 2);
    assert_eq!(
        subnets
            .iter()
            .filter(|s| s.props.as_subnet().unwrap().is_public)
            .count(),
        2
    );

    // NAT gateway and load balancer present.
    assert!(graph
        .nodes_of_kind(NodeKind::Gateway)
        .any(|g| g.props.as_gateway().unwrap().gateway_type == GatewayType::Nat));
    assert_eq!(count_kind(&graph, NodeKind::LoadBalancer), 1);

    // Database placed in a private subnet.
    let db = graph.nodes_of_kind(NodeKind::Database).next().unwrap();
    let db_subnet_ids = &db.props.as_database().unwrap().subnet_ids;
    assert!(!db_subnet_ids.is_empty());
    for subnet_id in db_subnet_ids {
        let subnet = graph.node(subnet_id).unwrap();
        assert!(!subnet.props.as_subnet().unwrap().is_public);
    }
}

#[test]
fn tier_defaults_to_one_without_keywords() {
    let spec = TopologySpec {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        components: vec![ComponentSpec::new(ComponentRole::WebTier, "a web app")],
    };
    let graph = build_topology(&spec).unwrap();

    assert!(graph
        .nodes_of_kind(NodeKind::Gateway)
        .all(|g| g.props.as_gateway().unwrap().gateway_type == GatewayType::Internet));
    assert_eq!(count_kind(&graph, NodeKind::LoadBalancer), 0);
    let zones: std::collections::BTreeSet<_> = graph
        .nodes_of_kind(NodeKind::Subnet)
        .filter_map(|s| s.az.clone())
        .collect();
    assert_eq!(zones.len(), 1);
}

#[test]
fn build_is_deterministic_modulo_graph_id() {
    let spec = web_db_spec("production web app", "mysql database");
    let a = build_topology(&spec).unwrap();
    let b = build_topology(&spec).unwrap();

    assert_eq!(a.nodes, b.nodes);
    let edges_a: Vec<_> = a.edges.iter().map(|e| (e.kind, &e.from, &e.to)).collect();
    let edges_b: Vec<_> = b.edges.iter().map(|e| (e.kind, &e.from, &e.to)).collect();
    assert_eq!(edges_a, edges_b);
}

#[test]
fn subnets_never_overlap() {
    let spec = web_db_spec("production high availability", "postgres");
    let graph = build_topology(&spec).unwrap();
    let cidrs: Vec<_> = graph
        .nodes_of_kind(NodeKind::Subnet)
        .map(|s| s.props.as_subnet().unwrap().cidr_block)
        .collect();
    for (i, a) in cidrs.iter().enumerate() {
        for b in &cidrs[i + 1..] {
            assert!(!a.overlaps(b), "{a} overlaps {b}");
        }
    }
}

#[test]
fn no_dangling_edges() {
    let spec = web_db_spec("production web app", "postgres");
    let graph = build_topology(&spec).unwrap();
    graph.check_integrity().unwrap();
}

#[test]
fn web_instances_round_robin_across_zones() {
    let spec = TopologySpec {
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        components: vec![
            ComponentSpec::new(ComponentRole::WebTier, "production web fleet").with_quantity(4),
        ],
    };
    let graph = build_topology(&spec).unwrap();

    let mut per_zone = std::collections::BTreeMap::new();
    for instance in graph.nodes_of_kind(NodeKind::ComputeInstance) {
        *per_zone.entry(instance.az.clone().unwrap()).or_insert(0) += 1;
    }
    assert_eq!(per_zone.len(), 2);
    assert!(per_zone.values().all(|&count| count == 2));
}

#[test]
fn tier2_database_inbound_scoped_to_web_security_group() {
    let spec = web_db_spec("production high availability", "postgres database");
    let graph = build_topology(&spec).unwrap();

    let db = graph.nodes_of_kind(NodeKind::Database).next().unwrap();
    let inbound: Vec<_> = graph
        .edges_of_kind(EdgeKind::AllowedTraffic)
        .filter(|e| e.to == db.id)
        .collect();
    assert!(!inbound.is_empty());
    for edge in &inbound {
        let source = graph.node(&edge.from).unwrap();
        assert_eq!(source.kind, NodeKind::SecurityGroup);
        assert_eq!(source.id, "sg-web");
    }

    // And the db security group itself only admits the web group.
    let db_sg = graph.node("sg-db").unwrap();
    for rule in &db_sg.props.as_security_group().unwrap().ingress {
        assert!(matches!(&rule.source, RuleSource::SecurityGroup(id) if id == "sg-web"));
    }
}

#[test]
fn mysql_constraint_selects_port_3306() {
    let mut spec = web_db_spec("simple app", "mysql database");
    spec.components[1].constraints = Some(Constraints {
        engine: Some("mysql".to_string()),
        ..Default::default()
    });
    let graph = build_topology(&spec).unwrap();

    let db_sg = graph.node("sg-db").unwrap();
    let rule = &db_sg.props.as_security_group().unwrap().ingress[0];
    assert_eq!(rule.from_port, 3306);
}

#[test]
fn explicit_load_balancer_constraint_is_honored_at_tier1() {
    let mut spec = web_db_spec("simple web app", "postgres database");
    spec.components[0].constraints = Some(Constraints {
        load_balancer: Some(true),
        ..Default::default()
    });
    let graph = build_topology(&spec).unwrap();

    // The architecture stays Tier 1: one public subnet, no NAT gateway.
    assert_eq!(count_kind(&graph, NodeKind::Subnet), 1);
    assert!(graph
        .nodes_of_kind(NodeKind::Gateway)
        .all(|g| g.props.as_gateway().unwrap().gateway_type == GatewayType::Internet));

    // But the requested load balancer exists, fronted by its own group and
    // attached to the public subnet.
    assert_eq!(count_kind(&graph, NodeKind::LoadBalancer), 1);
    let alb = graph.nodes_of_kind(NodeKind::LoadBalancer).next().unwrap();
    assert!(graph.node("sg-alb").is_some());
    assert!(graph
        .edges_of_kind(EdgeKind::AttachedTo)
        .any(|e| e.from == alb.id && e.to == "subnet-public"));
    assert!(graph
        .edges_of_kind(EdgeKind::RoutesTo)
        .any(|e| e.from == alb.id));
}

#[test]
fn load_balancer_depends_on_targets() {
    let spec = web_db_spec("production web app", "postgres");
    let graph = build_topology(&spec).unwrap();
    let alb = graph.nodes_of_kind(NodeKind::LoadBalancer).next().unwrap();

    let depends: Vec<_> = graph
        .edges_of_kind(EdgeKind::DependsOn)
        .filter(|e| e.from == alb.id)
        .collect();
    assert_eq!(
        depends.len(),
        graph.nodes_of_kind(NodeKind::ComputeInstance).count()
    );
    for edge in depends {
        assert_eq!(
            graph.node(&edge.to).unwrap().kind,
            NodeKind::ComputeInstance
        );
    }
}

#[test]
fn unsupported_provider_fails() {
    let mut spec = web_db_spec("simple", "db");
    spec.provider = "azure".to_string();
    assert!(matches!(
        build_topology(&spec),
        Err(BuildError::UnsupportedProvider(_))
    ));
}

#[test]
fn zero_quantity_fails() {
    let mut spec = web_db_spec("simple", "db");
    spec.components[0].quantity = Some(0);
    assert!(matches!(
        build_topology(&spec),
        Err(BuildError::InvalidQuantity { .. })
    ));
}

#[test]
fn absurd_quantity_fails_fast() {
    let mut spec = web_db_spec("simple", "db");
    spec.components[0].quantity = Some(10_000);
    assert!(matches!(
        build_topology(&spec),
        Err(BuildError::QuantityTooLarge { .. })
    ));
}

#[test]
fn unrealizable_role_fails_whole_build() {
    let mut spec = web_db_spec("simple", "db");
    spec.components
        .push(ComponentSpec::new(ComponentRole::TrafficGen, "load test"));
    assert!(matches!(
        build_topology(&spec),
        Err(BuildError::UnsupportedRole(ComponentRole::TrafficGen))
    ));
}

#[test]
fn tier_is_not_recorded_on_the_graph() {
    let spec = web_db_spec("production web app", "postgres");
    let builder = TopologyBuilder::new(&spec);
    let graph = builder.build().unwrap();
    assert!(!graph.metadata.contains_key("tier"));
}
