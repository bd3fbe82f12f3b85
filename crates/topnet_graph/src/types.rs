//! Core graph types: nodes, edges and the graph itself.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::props::{GatewayType, NodeProps};

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Generic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Generic => "generic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aws" => Some(Provider::Aws),
            "azure" => Some(Provider::Azure),
            "gcp" => Some(Provider::Gcp),
            "generic" => Some(Provider::Generic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of infrastructure element a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Network,
    Subnet,
    SecurityGroup,
    LoadBalancer,
    ComputeInstance,
    Database,
    Gateway,
    TrafficGenerator,
    RouteTable,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Network => "network",
            NodeKind::Subnet => "subnet",
            NodeKind::SecurityGroup => "security_group",
            NodeKind::LoadBalancer => "load_balancer",
            NodeKind::ComputeInstance => "compute_instance",
            NodeKind::Database => "database",
            NodeKind::Gateway => "gateway",
            NodeKind::TrafficGenerator => "traffic_generator",
            NodeKind::RouteTable => "route_table",
        }
    }
}

/// The kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Placement: subnet on network, instance on subnet, group on network.
    AttachedTo,
    /// Routing: route table to gateway, load balancer to targets.
    RoutesTo,
    /// Permission: one endpoint may send traffic to another.
    AllowedTraffic,
    /// Creation ordering that must be preserved during provisioning.
    DependsOn,
    /// Strict ownership: network contains subnet.
    Contains,
}

/// A node in the topology graph.
///
/// The id is immutable once assigned; it keys the graph and seeds the
/// generator's resource names. The kind is derived from the attributes at
/// construction; hand-written JSON can still pair them inconsistently,
/// which [`Graph::check_integrity`] rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub az: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub props: NodeProps,
}

impl Node {
    /// Create a node; the kind comes from the attributes.
    pub fn new(id: impl Into<String>, props: NodeProps) -> Self {
        Self {
            id: id.into(),
            kind: props.kind(),
            name: None,
            provider: None,
            region: None,
            az: None,
            tags: BTreeMap::new(),
            props,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_az(mut self, az: impl Into<String>) -> Self {
        self.az = Some(az.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Display label, falling back to the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Extra attributes carried on an edge, e.g. ports for `allowed_traffic`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeProps {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
    /// Present when the permission is scoped by address range instead of
    /// (or in addition to) the source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_cidr: Option<crate::cidr::Ipv4Cidr>,
}

/// A directed, typed relationship between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<EdgeProps>,
}

/// The complete topology graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Graph {
    /// Create an empty graph with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All nodes of a given kind, in insertion order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// All edges of a given kind, in insertion order.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// The network container node, if present.
    pub fn network(&self) -> Option<&Node> {
        self.nodes_of_kind(NodeKind::Network).next()
    }

    /// The internet gateway node, if present.
    pub fn internet_gateway(&self) -> Option<&Node> {
        self.nodes_of_kind(NodeKind::Gateway).find(|n| {
            n.props
                .as_gateway()
                .map(|g| g.gateway_type == GatewayType::Internet)
                .unwrap_or(false)
        })
    }

    /// Check structural integrity: unique node ids, node kinds agreeing
    /// with their attributes, and no dangling edges.
    pub fn check_integrity(&self) -> GraphResult<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
            if node.kind != node.props.kind() {
                return Err(GraphError::KindMismatch {
                    node_id: node.id.clone(),
                    kind: node.kind.as_str(),
                    props_kind: node.props.kind().as_str(),
                });
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{NetworkProps, SubnetProps};

    fn network_node() -> Node {
        Node::new(
            "vpc-main",
            NodeProps::Network(NetworkProps {
                cidr_block: "10.0.0.0/16".parse().unwrap(),
                enable_dns_hostnames: true,
                enable_dns_support: true,
            }),
        )
        .with_name("main-vpc")
        .with_provider(Provider::Aws)
    }

    fn subnet_node(id: &str, cidr: &str) -> Node {
        Node::new(
            id,
            NodeProps::Subnet(SubnetProps {
                cidr_block: cidr.parse().unwrap(),
                is_public: true,
                map_public_ip_on_launch: true,
            }),
        )
    }

    #[test]
    fn node_kind_follows_props() {
        assert_eq!(network_node().kind, NodeKind::Network);
        assert_eq!(subnet_node("s1", "10.0.0.0/24").kind, NodeKind::Subnet);
    }

    #[test]
    fn integrity_rejects_dangling_edges() {
        let mut graph = Graph::new("g1");
        graph.nodes.push(network_node());
        graph.edges.push(Edge {
            id: "e1".into(),
            kind: EdgeKind::AttachedTo,
            from: "subnet-missing".into(),
            to: "vpc-main".into(),
            props: None,
        });
        assert!(matches!(
            graph.check_integrity(),
            Err(GraphError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn integrity_rejects_duplicate_ids() {
        let mut graph = Graph::new("g1");
        graph.nodes.push(subnet_node("s1", "10.0.0.0/24"));
        graph.nodes.push(subnet_node("s1", "10.0.1.0/24"));
        assert!(matches!(
            graph.check_integrity(),
            Err(GraphError::DuplicateNodeId(_))
        ));
    }

    #[test]
    fn integrity_rejects_kind_disagreeing_with_props() {
        // Only possible via hand-written JSON; Node::new derives the kind.
        let node: Node = serde_json::from_str(
            r#"{
                "id": "s1",
                "kind": "subnet",
                "props": {"kind": "database", "engine": "postgres",
                          "engine_version": "15.4",
                          "instance_class": "db.t3.micro",
                          "allocated_storage": 20}
            }"#,
        )
        .unwrap();
        let mut graph = Graph::new("g1");
        graph.nodes.push(node);
        assert!(matches!(
            graph.check_integrity(),
            Err(GraphError::KindMismatch { .. })
        ));
    }

    #[test]
    fn graph_serde_roundtrip_preserves_structure() {
        let mut graph = Graph::new("g1");
        graph.nodes.push(network_node());
        graph.nodes.push(subnet_node("s1", "10.0.0.0/24"));
        graph.edges.push(Edge {
            id: "e1".into(),
            kind: EdgeKind::Contains,
            from: "vpc-main".into(),
            to: "s1".into(),
            props: None,
        });

        let json = serde_json::to_string(&graph).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph, back);
    }
}
