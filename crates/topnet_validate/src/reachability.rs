//! Security-group reachability: isolation of databases and exposure of
//! sensitive ports, plus egress paths for public compute nodes.

use topnet_graph::{EdgeKind, Finding, Graph, Node, NodeKind};

/// Ports that are risky to expose to the internet.
const SENSITIVE_PORTS: &[(u16, &str)] = &[
    (22, "SSH"),
    (3389, "RDP"),
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (27017, "MongoDB"),
    (6379, "Redis"),
    (11211, "Memcached"),
];

const DB_PORTS: &[u16] = &[3306, 5432, 27017, 6379, 11211];

/// Check reachability properties:
///
/// - a database's inbound `allowed_traffic` must be scoped to a security
///   group, never the universal source (`error`);
/// - security groups protecting a database must not admit the internet
///   (`error`);
/// - sensitive ports open to the world are reported (SSH as `warning`,
///   database ports as `error`, the rest as `warning`);
/// - every compute node on a public subnet should have a route to the
///   internet gateway (`warning` when absent).
pub fn validate_reachability(graph: &Graph) -> Vec<Finding> {
    let mut results = Vec::new();
    check_database_inbound(graph, &mut results);
    check_database_groups(graph, &mut results);
    check_sensitive_ports(graph, &mut results);
    check_internet_paths(graph, &mut results);
    results
}

fn check_database_inbound(graph: &Graph, results: &mut Vec<Finding>) {
    for db in graph.nodes_of_kind(NodeKind::Database) {
        for edge in graph
            .edges_of_kind(EdgeKind::AllowedTraffic)
            .filter(|e| e.to == db.id)
        {
            let open_cidr = edge
                .props
                .as_ref()
                .and_then(|p| p.source_cidr)
                .map(|c| c.is_open())
                .unwrap_or(false);
            let from_group = graph
                .node(&edge.from)
                .map(|n| n.kind == NodeKind::SecurityGroup)
                .unwrap_or(false);

            if open_cidr || !from_group {
                results.push(Finding::error(
                    "security-db-open",
                    format!(
                        "Database '{}' permits inbound traffic from an unrestricted source \
                         (edge '{}'); scope it to a security group",
                        db.label(),
                        edge.id
                    ),
                    vec![db.id.clone(), edge.from.clone()],
                ));
            }
        }
    }
}

fn check_database_groups(graph: &Graph, results: &mut Vec<Finding>) {
    for db in graph.nodes_of_kind(NodeKind::Database) {
        let Some(props) = db.props.as_database() else {
            continue;
        };
        for sg_id in &props.security_groups {
            let Some(sg) = graph.node(sg_id) else {
                continue;
            };
            let Some(sg_props) = sg.props.as_security_group() else {
                continue;
            };
            if sg_props.ingress.iter().any(|rule| rule.source.is_open()) {
                results.push(Finding::error(
                    "security-db-open",
                    format!(
                        "Security group '{}' allows internet access to database '{}'",
                        sg.label(),
                        db.label()
                    ),
                    vec![sg.id.clone(), db.id.clone()],
                ));
            }
        }
    }
}

fn check_sensitive_ports(graph: &Graph, results: &mut Vec<Finding>) {
    for sg in graph.nodes_of_kind(NodeKind::SecurityGroup) {
        let Some(props) = sg.props.as_security_group() else {
            continue;
        };
        for rule in props.ingress.iter().filter(|r| r.source.is_open()) {
            for (port, service) in SENSITIVE_PORTS {
                if !rule.covers_port(*port) {
                    continue;
                }
                if *port == 22 {
                    results.push(Finding::warning(
                        "security-ssh-open",
                        format!(
                            "Security group '{}' allows SSH (22) from 0.0.0.0/0 - consider \
                             restricting to known IPs",
                            sg.label()
                        ),
                        vec![sg.id.clone()],
                    ));
                } else if DB_PORTS.contains(port) {
                    results.push(Finding::error(
                        "security-dbport-open",
                        format!(
                            "Security group '{}' exposes {service} (port {port}) to the internet",
                            sg.label()
                        ),
                        vec![sg.id.clone()],
                    ));
                } else {
                    results.push(Finding::warning(
                        "security-port-open",
                        format!(
                            "Security group '{}' exposes {service} (port {port}) to 0.0.0.0/0",
                            sg.label()
                        ),
                        vec![sg.id.clone()],
                    ));
                }
            }
        }
    }
}

fn check_internet_paths(graph: &Graph, results: &mut Vec<Finding>) {
    let Some(igw) = graph.internet_gateway() else {
        return;
    };

    for instance in graph.nodes_of_kind(NodeKind::ComputeInstance) {
        let Some(subnet) = instance_subnet(graph, instance) else {
            continue;
        };
        let is_public = subnet
            .props
            .as_subnet()
            .map(|s| s.is_public)
            .unwrap_or(false);
        if !is_public {
            continue;
        }

        // route table associated with the subnet, routing to the IGW
        let reaches_igw = graph
            .nodes_of_kind(NodeKind::RouteTable)
            .filter(|rt| {
                graph
                    .edges_of_kind(EdgeKind::AttachedTo)
                    .any(|e| e.from == rt.id && e.to == subnet.id)
            })
            .any(|rt| {
                graph
                    .edges_of_kind(EdgeKind::RoutesTo)
                    .any(|e| e.from == rt.id && e.to == igw.id)
            });

        if !reaches_igw {
            results.push(Finding::warning(
                "reachability-no-igw",
                format!(
                    "Instance '{}' sits on public subnet '{}' with no route to the internet \
                     gateway",
                    instance.label(),
                    subnet.label()
                ),
                vec![instance.id.clone(), subnet.id.clone()],
            ));
        }
    }
}

fn instance_subnet<'g>(graph: &'g Graph, instance: &Node) -> Option<&'g Node> {
    graph
        .edges_of_kind(EdgeKind::AttachedTo)
        .find(|e| {
            e.from == instance.id
                && graph
                    .node(&e.to)
                    .map(|n| n.kind == NodeKind::Subnet)
                    .unwrap_or(false)
        })
        .and_then(|e| graph.node(&e.to))
}
