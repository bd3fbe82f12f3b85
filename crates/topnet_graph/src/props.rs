//! Kind-specific node attributes.
//!
//! Each node kind carries its own attribute struct, wrapped in the
//! [`NodeProps`] sum type for storage inside the generic [`Node`]. The tag
//! mirrors the node kind, so a deserialized node cannot pair a `subnet` kind
//! with database attributes.
//!
//! [`Node`]: crate::types::Node

use serde::{Deserialize, Serialize};

use crate::cidr::Ipv4Cidr;
use crate::types::NodeKind;

/// Attributes for the network container (VPC-equivalent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProps {
    pub cidr_block: Ipv4Cidr,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

/// Attributes for a subnet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetProps {
    pub cidr_block: Ipv4Cidr,
    pub is_public: bool,
    pub map_public_ip_on_launch: bool,
}

/// The source a security rule permits traffic from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// An address range; `0.0.0.0/0` means the whole internet.
    Cidr(Ipv4Cidr),
    /// Another security group, referenced by node id.
    SecurityGroup(String),
}

impl RuleSource {
    /// Whether this source is the unrestricted internet.
    pub fn is_open(&self) -> bool {
        matches!(self, RuleSource::Cidr(cidr) if cidr.is_open())
    }
}

/// One ingress or egress permission on a security group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: String,
    pub source: RuleSource,
}

impl SecurityRule {
    /// A TCP rule for a single port.
    pub fn tcp(port: u16, source: RuleSource) -> Self {
        Self {
            from_port: port,
            to_port: port,
            protocol: "tcp".to_string(),
            source,
        }
    }

    /// The conventional allow-all outbound rule.
    pub fn allow_all_egress() -> Self {
        Self {
            from_port: 0,
            to_port: 0,
            protocol: "-1".to_string(),
            source: RuleSource::Cidr(Ipv4Cidr::open()),
        }
    }

    /// Whether the rule's port range covers the given port.
    pub fn covers_port(&self, port: u16) -> bool {
        self.protocol == "-1" || (self.from_port <= port && port <= self.to_port)
    }
}

/// Attributes for a security group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupProps {
    pub description: String,
    #[serde(default)]
    pub ingress: Vec<SecurityRule>,
    #[serde(default)]
    pub egress: Vec<SecurityRule>,
}

/// Gateway flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayType {
    Internet,
    Nat,
}

/// Attributes for an internet or NAT gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayProps {
    pub gateway_type: GatewayType,
    /// NAT gateways live in a subnet; internet gateways do not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// One route in a route table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub destination: Ipv4Cidr,
    /// Node id of the gateway this route targets.
    pub target: String,
}

/// Attributes for a route table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTableProps {
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// Attributes for a compute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeProps {
    pub instance_type: String,
    pub subnet_id: String,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub associate_public_ip: bool,
}

/// Attributes for a managed database instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProps {
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage: u32,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub publicly_accessible: bool,
}

/// Load balancer scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LbScheme {
    InternetFacing,
    Internal,
}

/// Attributes for a load balancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerProps {
    pub scheme: LbScheme,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
}

/// Kind-specific attributes, tagged to match the node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeProps {
    Network(NetworkProps),
    Subnet(SubnetProps),
    SecurityGroup(SecurityGroupProps),
    Gateway(GatewayProps),
    RouteTable(RouteTableProps),
    #[serde(rename = "compute_instance")]
    Compute(ComputeProps),
    Database(DatabaseProps),
    LoadBalancer(LoadBalancerProps),
    TrafficGenerator,
}

impl NodeProps {
    /// The node kind these attributes belong to.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeProps::Network(_) => NodeKind::Network,
            NodeProps::Subnet(_) => NodeKind::Subnet,
            NodeProps::SecurityGroup(_) => NodeKind::SecurityGroup,
            NodeProps::Gateway(_) => NodeKind::Gateway,
            NodeProps::RouteTable(_) => NodeKind::RouteTable,
            NodeProps::Compute(_) => NodeKind::ComputeInstance,
            NodeProps::Database(_) => NodeKind::Database,
            NodeProps::LoadBalancer(_) => NodeKind::LoadBalancer,
            NodeProps::TrafficGenerator => NodeKind::TrafficGenerator,
        }
    }

    pub fn as_subnet(&self) -> Option<&SubnetProps> {
        match self {
            NodeProps::Subnet(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<&NetworkProps> {
        match self {
            NodeProps::Network(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_security_group(&self) -> Option<&SecurityGroupProps> {
        match self {
            NodeProps::SecurityGroup(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_gateway(&self) -> Option<&GatewayProps> {
        match self {
            NodeProps::Gateway(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseProps> {
        match self {
            NodeProps::Database(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_compute(&self) -> Option<&ComputeProps> {
        match self {
            NodeProps::Compute(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_tag_matches_kind() {
        let props = NodeProps::Subnet(SubnetProps {
            cidr_block: "10.0.1.0/24".parse().unwrap(),
            is_public: true,
            map_public_ip_on_launch: true,
        });
        assert_eq!(props.kind(), NodeKind::Subnet);

        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["kind"], "subnet");
        assert_eq!(json["cidr_block"], "10.0.1.0/24");
    }

    #[test]
    fn rule_source_open_detection() {
        assert!(RuleSource::Cidr(Ipv4Cidr::open()).is_open());
        assert!(!RuleSource::Cidr("10.0.0.0/16".parse().unwrap()).is_open());
        assert!(!RuleSource::SecurityGroup("sg-web".to_string()).is_open());
    }

    #[test]
    fn rule_port_coverage() {
        let rule = SecurityRule::tcp(5432, RuleSource::SecurityGroup("sg-web".into()));
        assert!(rule.covers_port(5432));
        assert!(!rule.covers_port(3306));
        assert!(SecurityRule::allow_all_egress().covers_port(22));
    }
}
