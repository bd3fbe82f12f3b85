//! Integration tests lowering built topology graphs to Terraform JSON.

use serde_json::Value;
use topnet_builder::build_topology;
use topnet_graph::{Graph, NetworkProps, Node, NodeKind, NodeProps};
use topnet_iac::{generate_terraform, IacError};
use topnet_spec::{ComponentRole, ComponentSpec, TopologySpec};

fn spec(region: &str, web_description: &str) -> TopologySpec {
    TopologySpec {
        provider: "aws".to_string(),
        region: region.to_string(),
        components: vec![
            ComponentSpec::new(ComponentRole::WebTier, web_description).with_quantity(1),
            ComponentSpec::new(ComponentRole::DbTier, "postgres database").with_quantity(1),
        ],
    }
}

fn render(region: &str, web_description: &str) -> Value {
    let graph = build_topology(&spec(region, web_description)).unwrap();
    let files = generate_terraform(&graph).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "main.tf.json");
    serde_json::from_str(&files[0].content).unwrap()
}

fn resource_names(config: &Value, rtype: &str) -> Vec<String> {
    config["resource"][rtype]
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn tier1_descriptor_has_the_expected_resource_types() {
    let config = render("us-east-2", "simple web app");
    assert_eq!(resource_names(&config, "aws_vpc").len(), 1);
    assert_eq!(resource_names(&config, "aws_internet_gateway").len(), 1);
    assert_eq!(resource_names(&config, "aws_instance").len(), 1);
    assert_eq!(resource_names(&config, "aws_db_instance").len(), 1);
    assert!(resource_names(&config, "aws_nat_gateway").is_empty());
    assert!(resource_names(&config, "aws_lb").is_empty());
    assert_eq!(config["provider"]["aws"]["region"], "us-east-2");
}

#[test]
fn security_rules_are_standalone_resources() {
    let config = render("us-east-2", "production high availability web app");
    // no inline rules on the group bodies
    for (_, body) in config["resource"]["aws_security_group"]
        .as_object()
        .unwrap()
    {
        assert!(body.get("ingress").is_none());
        assert!(body.get("egress").is_none());
    }
    let rules = config["resource"]["aws_security_group_rule"]
        .as_object()
        .unwrap();
    assert!(!rules.is_empty());
    // every group has at least one egress rule, defaulted when unstated
    for (_, body) in rules {
        let direction = body["type"].as_str().unwrap();
        assert!(direction == "ingress" || direction == "egress");
    }
    let egress_count = rules
        .values()
        .filter(|b| b["type"] == "egress")
        .count();
    let group_count = resource_names(&config, "aws_security_group").len();
    assert!(egress_count >= group_count);
}

#[test]
fn tier1_database_gets_a_synthesized_second_zone() {
    let graph = build_topology(&spec("us-east-2", "simple web app")).unwrap();
    let before = graph.clone();
    let files = generate_terraform(&graph).unwrap();
    let config: Value = serde_json::from_str(&files[0].content).unwrap();

    // the single-subnet graph gains exactly one twin subnet in the output
    let subnets = config["resource"]["aws_subnet"].as_object().unwrap();
    assert_eq!(subnets.len(), 2);
    let cidrs: Vec<&str> = subnets
        .values()
        .map(|b| b["cidr_block"].as_str().unwrap())
        .collect();
    assert!(cidrs.contains(&"10.0.0.0/24"));
    assert!(cidrs.contains(&"10.0.1.0/24"));
    let zones: std::collections::BTreeSet<&str> = subnets
        .values()
        .map(|b| b["availability_zone"].as_str().unwrap())
        .collect();
    assert_eq!(zones.len(), 2);

    let groups = config["resource"]["aws_db_subnet_group"]
        .as_object()
        .unwrap();
    assert_eq!(groups.len(), 1);
    let group_subnets = groups
        .values()
        .next()
        .unwrap()["subnet_ids"]
        .as_array()
        .unwrap();
    assert_eq!(group_subnets.len(), 2);

    // the input graph itself is untouched
    assert_eq!(graph, before);
}

#[test]
fn tier2_database_needs_no_synthesis() {
    let config = render("us-east-2", "production high availability web app");
    // 2 public + 2 private, nothing added
    assert_eq!(resource_names(&config, "aws_subnet").len(), 4);
}

#[test]
fn every_interpolation_reference_resolves() {
    let config = render("us-east-2", "production high availability web app");
    let resources = config["resource"].as_object().unwrap();

    let mut refs = Vec::new();
    collect_refs(&config, &mut refs);
    assert!(!refs.is_empty());
    for r in refs {
        let inner = r.trim_start_matches("${").trim_end_matches('}');
        let mut parts = inner.splitn(3, '.');
        let rtype = parts.next().unwrap();
        let rname = parts.next().unwrap();
        assert!(
            resources
                .get(rtype)
                .and_then(|m| m.get(rname))
                .is_some(),
            "unresolved reference: {inner}"
        );
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if s.starts_with("${") && s.ends_with('}') => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

#[test]
fn every_subnet_has_a_route_table_association_in_tier2() {
    let config = render("us-east-2", "production high availability web app");
    let associations = resource_names(&config, "aws_route_table_association");
    assert_eq!(associations.len(), 4);
}

#[test]
fn nat_gateway_waits_for_the_internet_gateway() {
    let config = render("us-east-2", "production high availability web app");
    let nats = config["resource"]["aws_nat_gateway"].as_object().unwrap();
    assert_eq!(nats.len(), 1);
    let depends = nats.values().next().unwrap()["depends_on"]
        .as_array()
        .unwrap();
    assert!(depends[0].as_str().unwrap().starts_with("aws_internet_gateway."));
}

#[test]
fn web_instances_carry_a_bootstrap_script() {
    let config = render("us-east-2", "simple web app");
    let instances = config["resource"]["aws_instance"].as_object().unwrap();
    let user_data = instances.values().next().unwrap()["user_data"]
        .as_str()
        .unwrap();
    assert!(user_data.contains("nginx"));
}

#[test]
fn generation_is_deterministic() {
    let graph = build_topology(&spec("us-east-2", "production web app")).unwrap();
    let first = generate_terraform(&graph).unwrap();
    let second = generate_terraform(&graph).unwrap();
    assert_eq!(first[0].content, second[0].content);
}

#[test]
fn dangling_property_reference_fails_generation() {
    let mut graph = build_topology(&spec("us-east-2", "simple web app")).unwrap();
    for node in &mut graph.nodes {
        if let NodeProps::Compute(p) = &mut node.props {
            p.subnet_id = "subnet-missing".to_string();
        }
    }
    assert!(matches!(
        generate_terraform(&graph),
        Err(IacError::DanglingReference { .. })
    ));
}

#[test]
fn unknown_region_fails_generation() {
    let graph = build_topology(&spec("ap-southeast-9", "simple web app")).unwrap();
    assert!(matches!(
        generate_terraform(&graph),
        Err(IacError::UnknownRegion(_))
    ));
}

#[test]
fn graph_without_any_region_fails_generation() {
    let mut graph = Graph::new("manual");
    graph.nodes.push(Node::new(
        "vpc-main",
        NodeProps::Network(NetworkProps {
            cidr_block: "10.0.0.0/16".parse().unwrap(),
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }),
    ));
    assert!(matches!(
        generate_terraform(&graph),
        Err(IacError::MissingProviderRegion)
    ));
}

#[test]
fn traffic_generator_nodes_are_rejected() {
    let mut graph = build_topology(&spec("us-east-2", "simple web app")).unwrap();
    graph
        .nodes
        .push(Node::new("loadgen-1", NodeProps::TrafficGenerator));
    let err = generate_terraform(&graph).unwrap_err();
    assert!(matches!(
        err,
        IacError::UnsupportedNodeKind {
            kind: NodeKind::TrafficGenerator,
            ..
        }
    ));
}
