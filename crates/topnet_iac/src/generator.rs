//! Lowering a topology graph to a Terraform JSON deployment descriptor.
//!
//! The generator never mutates the input graph. It works on a private copy,
//! which it may augment (a second database subnet in another zone, for
//! example) before emitting resources. All naming state is scoped to a
//! single invocation, so concurrent generations from the same graph are
//! independent and repeated generations are byte-identical.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::debug;

use topnet_graph::{
    Edge, EdgeKind, GatewayType, Graph, Ipv4Cidr, LbScheme, Node, NodeKind, NodeProps, RuleSource,
    SecurityRule, SubnetAllocator, SubnetProps,
};

use crate::error::{IacError, IacResult};
use crate::images;
use crate::names::NameRegistry;
use crate::user_data;

/// A generated artifact: a filename and its full content.
#[derive(Debug, Clone, PartialEq)]
pub struct TerraformFile {
    pub filename: String,
    pub content: String,
}

/// `resource type -> resource name -> body`, sorted for stable output.
type Resources = BTreeMap<String, BTreeMap<String, Value>>;

/// Generates a Terraform JSON descriptor from a topology graph.
pub struct TerraformGenerator<'g> {
    graph: &'g Graph,
}

impl<'g> TerraformGenerator<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Lower the graph into deployment artifacts.
    ///
    /// Fails fast on the first defect: a dangling reference, a node kind
    /// with no deployable form, or a region with no registered machine
    /// image. No partial descriptor is ever returned.
    pub fn generate(&self) -> IacResult<Vec<TerraformFile>> {
        self.graph.check_integrity()?;

        let mut working = self.graph.clone();
        synthesize_database_zones(&mut working)?;

        let mut names = NameRegistry::new();
        for node in &working.nodes {
            names.assign(&node.id);
        }

        let mut resources = Resources::new();
        for node in &working.nodes {
            lower_node(&working, node, &names, &mut resources)?;
        }
        lower_route_associations(&working, &names, &mut resources)?;

        let resource_count: usize = resources.values().map(BTreeMap::len).sum();
        debug!(
            graph = %working.id,
            resources = resource_count,
            "lowered graph to terraform resources"
        );

        let region = region_of(&working)?;
        let config = json!({
            "terraform": {
                "required_version": ">= 1.5.0",
                "required_providers": {
                    "aws": {
                        "source": "hashicorp/aws",
                        "version": "~> 5.0"
                    }
                }
            },
            "provider": {
                "aws": {
                    "region": region
                }
            },
            "resource": resources
        });

        Ok(vec![TerraformFile {
            filename: "main.tf.json".to_string(),
            content: serde_json::to_string_pretty(&config)?,
        }])
    }
}

/// Convenience wrapper over [`TerraformGenerator`].
pub fn generate_terraform(graph: &Graph) -> IacResult<Vec<TerraformFile>> {
    TerraformGenerator::new(graph).generate()
}

/// The provider region: the first node that carries one. A graph with no
/// regions cannot be lowered; guessing one would plant a region the caller
/// never chose.
fn region_of(graph: &Graph) -> IacResult<String> {
    graph
        .nodes
        .iter()
        .find_map(|n| n.region.clone())
        .ok_or(IacError::MissingProviderRegion)
}

/// Managed databases need subnets in at least two zones. When the eligible
/// subnets all share one zone, add a twin subnet in another zone to the
/// working copy, carved from an unused block of the network container.
fn synthesize_database_zones(graph: &mut Graph) -> IacResult<()> {
    let Some(first_db) = graph.nodes_of_kind(NodeKind::Database).next() else {
        return Ok(());
    };
    let first_db_id = first_db.id.clone();

    let network = graph.network().ok_or(IacError::MissingNetwork)?;
    let vpc_cidr = network
        .props
        .as_network()
        .map(|p| p.cidr_block)
        .ok_or(IacError::MissingNetwork)?;
    let vpc_id = network.id.clone();

    let eligible = eligible_database_subnets(graph);
    if eligible.is_empty() {
        return Err(IacError::NoEligibleSubnets(first_db_id));
    }
    let zones: std::collections::BTreeSet<&str> = eligible
        .iter()
        .filter_map(|id| graph.node(id).and_then(|n| n.az.as_deref()))
        .collect();
    if zones.len() >= 2 {
        return Ok(());
    }

    let template_id = eligible[0].clone();
    let template = graph
        .node(&template_id)
        .ok_or_else(|| IacError::DanglingReference {
            resource: first_db_id.clone(),
            reference: template_id.clone(),
        })?
        .clone();
    let template_props =
        template
            .props
            .as_subnet()
            .ok_or_else(|| IacError::DanglingReference {
                resource: first_db_id,
                reference: template_id.clone(),
            })?;

    let used: Vec<Ipv4Cidr> = graph
        .nodes_of_kind(NodeKind::Subnet)
        .filter_map(|n| n.props.as_subnet().map(|s| s.cidr_block))
        .collect();
    let mut allocator = SubnetAllocator::new(vpc_cidr);
    let cidr = allocator.next_unused(&used)?;

    let new_id = format!("{template_id}-az2");
    let az = next_zone(template.az.as_deref(), template.region.as_deref());
    debug!(subnet = %new_id, %cidr, zone = %az, "synthesizing second database zone");

    let mut twin = Node::new(
        &new_id,
        NodeProps::Subnet(SubnetProps {
            cidr_block: cidr,
            is_public: template_props.is_public,
            map_public_ip_on_launch: template_props.map_public_ip_on_launch,
        }),
    )
    .with_name(format!("{}-az2", template.label()))
    .with_az(az);
    twin.provider = template.provider;
    twin.region = template.region.clone();
    twin.tags = template.tags.clone();
    twin.tags
        .insert("Name".to_string(), format!("{}-az2", template.label()));

    // join the template's route table so the twin routes the same way
    let route_table = graph
        .edges_of_kind(EdgeKind::AttachedTo)
        .find(|e| {
            e.to == template_id
                && graph
                    .node(&e.from)
                    .map(|n| n.kind == NodeKind::RouteTable)
                    .unwrap_or(false)
        })
        .map(|e| e.from.clone());

    graph.nodes.push(twin);
    graph.edges.push(Edge {
        id: "e-synth-1".to_string(),
        kind: EdgeKind::AttachedTo,
        from: new_id.clone(),
        to: vpc_id.clone(),
        props: None,
    });
    graph.edges.push(Edge {
        id: "e-synth-2".to_string(),
        kind: EdgeKind::Contains,
        from: vpc_id,
        to: new_id.clone(),
        props: None,
    });
    if let Some(rt_id) = route_table {
        graph.edges.push(Edge {
            id: "e-synth-3".to_string(),
            kind: EdgeKind::AttachedTo,
            from: rt_id,
            to: new_id,
            props: None,
        });
    }
    Ok(())
}

/// Subnets eligible to host a database subnet group, in preference order:
/// db-tagged subnets, then private subnets, then any subnet.
fn eligible_database_subnets(graph: &Graph) -> Vec<String> {
    let subnets: Vec<&Node> = graph.nodes_of_kind(NodeKind::Subnet).collect();

    let db_tagged: Vec<&Node> = subnets
        .iter()
        .copied()
        .filter(|n| n.tags.get("Tier").map(|t| t == "db").unwrap_or(false) || n.id.contains("db"))
        .collect();
    if !db_tagged.is_empty() {
        return db_tagged.iter().map(|n| n.id.clone()).collect();
    }

    let private: Vec<&Node> = subnets
        .iter()
        .copied()
        .filter(|n| n.props.as_subnet().map(|s| !s.is_public).unwrap_or(false))
        .collect();
    if !private.is_empty() {
        return private.iter().map(|n| n.id.clone()).collect();
    }

    subnets.iter().map(|n| n.id.clone()).collect()
}

/// Pick a zone different from the given one, staying in the same region.
fn next_zone(az: Option<&str>, region: Option<&str>) -> String {
    match az {
        Some(az) => {
            let mut chars: Vec<char> = az.chars().collect();
            match chars.last().copied() {
                Some(c) if c.is_ascii_lowercase() => {
                    let bumped = if c == 'f' { 'a' } else { (c as u8 + 1) as char };
                    let n = chars.len();
                    chars[n - 1] = bumped;
                    chars.into_iter().collect()
                }
                _ => format!("{az}b"),
            }
        }
        None => format!("{}b", region.unwrap_or("us-east-2")),
    }
}

fn lower_node(
    graph: &Graph,
    node: &Node,
    names: &NameRegistry,
    resources: &mut Resources,
) -> IacResult<()> {
    let name = name_of(names, &node.id, &node.id)?.to_string();
    match &node.props {
        NodeProps::Network(p) => {
            add(
                resources,
                "aws_vpc",
                &name,
                json!({
                    "cidr_block": p.cidr_block.to_string(),
                    "enable_dns_hostnames": p.enable_dns_hostnames,
                    "enable_dns_support": p.enable_dns_support,
                    "tags": tags_value(node),
                }),
            );
        }
        NodeProps::Subnet(p) => {
            let mut body = json!({
                "vpc_id": vpc_ref(graph, names, &node.id)?,
                "cidr_block": p.cidr_block.to_string(),
                "map_public_ip_on_launch": p.map_public_ip_on_launch,
                "tags": tags_value(node),
            });
            if let Some(az) = &node.az {
                insert(&mut body, "availability_zone", json!(az));
            }
            add(resources, "aws_subnet", &name, body);
        }
        NodeProps::Gateway(p) => match p.gateway_type {
            GatewayType::Internet => {
                add(
                    resources,
                    "aws_internet_gateway",
                    &name,
                    json!({
                        "vpc_id": vpc_ref(graph, names, &node.id)?,
                        "tags": tags_value(node),
                    }),
                );
            }
            GatewayType::Nat => {
                let eip_name = format!("{name}_eip");
                add(
                    resources,
                    "aws_eip",
                    &eip_name,
                    json!({
                        "domain": "vpc",
                        "tags": tags_value(node),
                    }),
                );

                let subnet_id =
                    p.subnet_id
                        .as_ref()
                        .ok_or_else(|| IacError::MissingAttachment {
                            node_id: node.id.clone(),
                            needs: "a subnet to live in".to_string(),
                        })?;
                let subnet_name = name_of(names, &node.id, subnet_id)?;
                let mut body = json!({
                    "allocation_id": attr_ref("aws_eip", &eip_name, "id"),
                    "subnet_id": attr_ref("aws_subnet", subnet_name, "id"),
                    "tags": tags_value(node),
                });
                // NAT creation must wait for the internet gateway
                if let Some(igw) = graph.internet_gateway() {
                    if let Some(igw_name) = names.get(&igw.id) {
                        insert(
                            &mut body,
                            "depends_on",
                            json!([format!("aws_internet_gateway.{igw_name}")]),
                        );
                    }
                }
                add(resources, "aws_nat_gateway", &name, body);
            }
        },
        NodeProps::RouteTable(p) => {
            add(
                resources,
                "aws_route_table",
                &name,
                json!({
                    "vpc_id": vpc_ref(graph, names, &node.id)?,
                    "tags": tags_value(node),
                }),
            );
            for (i, route) in p.routes.iter().enumerate() {
                let target =
                    graph
                        .node(&route.target)
                        .ok_or_else(|| IacError::DanglingReference {
                            resource: node.id.clone(),
                            reference: route.target.clone(),
                        })?;
                let gateway =
                    target
                        .props
                        .as_gateway()
                        .ok_or_else(|| IacError::InvalidRouteTarget {
                            route_table: node.id.clone(),
                            target: route.target.clone(),
                        })?;
                let target_name = name_of(names, &node.id, &route.target)?;
                let mut body = json!({
                    "route_table_id": attr_ref("aws_route_table", &name, "id"),
                    "destination_cidr_block": route.destination.to_string(),
                });
                match gateway.gateway_type {
                    GatewayType::Internet => insert(
                        &mut body,
                        "gateway_id",
                        attr_ref("aws_internet_gateway", target_name, "id"),
                    ),
                    GatewayType::Nat => insert(
                        &mut body,
                        "nat_gateway_id",
                        attr_ref("aws_nat_gateway", target_name, "id"),
                    ),
                }
                add(resources, "aws_route", &format!("{name}_r{i}"), body);
            }
        }
        NodeProps::SecurityGroup(p) => {
            add(
                resources,
                "aws_security_group",
                &name,
                json!({
                    "name": node.label(),
                    "description": p.description,
                    "vpc_id": vpc_ref(graph, names, &node.id)?,
                    "tags": tags_value(node),
                }),
            );
            for (i, rule) in p.ingress.iter().enumerate() {
                emit_rule(
                    names,
                    resources,
                    node,
                    &name,
                    "ingress",
                    &format!("{name}_in{i}"),
                    rule,
                )?;
            }
            // a group with no stated egress gets the conventional allow-all
            let default_egress = [SecurityRule::allow_all_egress()];
            let egress: &[SecurityRule] = if p.egress.is_empty() {
                &default_egress
            } else {
                &p.egress
            };
            for (i, rule) in egress.iter().enumerate() {
                emit_rule(
                    names,
                    resources,
                    node,
                    &name,
                    "egress",
                    &format!("{name}_out{i}"),
                    rule,
                )?;
            }
        }
        NodeProps::Compute(p) => {
            let region = node
                .region
                .as_deref()
                .ok_or_else(|| IacError::MissingRegion(node.id.clone()))?;
            let ami = images::ami_for(region)?;
            let subnet_name = name_of(names, &node.id, &p.subnet_id)?;
            let sg_refs = group_refs(names, &node.id, &p.security_groups)?;
            let mut body = json!({
                "ami": ami,
                "instance_type": p.instance_type,
                "subnet_id": attr_ref("aws_subnet", subnet_name, "id"),
                "vpc_security_group_ids": sg_refs,
                "associate_public_ip_address": p.associate_public_ip,
                "tags": tags_value(node),
            });
            if let Some(az) = &node.az {
                insert(&mut body, "availability_zone", json!(az));
            }
            if node.tags.get("Role").map(|r| r == "web").unwrap_or(false) {
                insert(
                    &mut body,
                    "user_data",
                    json!(user_data::web_bootstrap(node.label())),
                );
            }
            add(resources, "aws_instance", &name, body);
        }
        NodeProps::Database(p) => {
            // declared subnets must exist even though the group is recomputed
            for subnet_id in &p.subnet_ids {
                name_of(names, &node.id, subnet_id)?;
            }
            let subnet_ids = eligible_database_subnets(graph);
            if subnet_ids.is_empty() {
                return Err(IacError::NoEligibleSubnets(node.id.clone()));
            }
            let subnet_refs = subnet_ids
                .iter()
                .map(|id| {
                    Ok(attr_ref(
                        "aws_subnet",
                        name_of(names, &node.id, id)?,
                        "id",
                    ))
                })
                .collect::<IacResult<Vec<Value>>>()?;

            let group_name = format!("{name}_subnet_group");
            add(
                resources,
                "aws_db_subnet_group",
                &group_name,
                json!({
                    "name": format!("{}-subnet-group", node.id),
                    "subnet_ids": subnet_refs,
                    "tags": tags_value(node),
                }),
            );

            let sg_refs = group_refs(names, &node.id, &p.security_groups)?;
            add(
                resources,
                "aws_db_instance",
                &name,
                json!({
                    "identifier": node.id,
                    "engine": p.engine,
                    "engine_version": p.engine_version,
                    "instance_class": p.instance_class,
                    "allocated_storage": p.allocated_storage,
                    "db_name": "appdb",
                    "username": "dbadmin",
                    // placeholder; rotate through a secrets manager after first apply
                    "password": "ChangeMe-TopNet-2024",
                    "db_subnet_group_name": attr_ref("aws_db_subnet_group", &group_name, "name"),
                    "vpc_security_group_ids": sg_refs,
                    "multi_az": p.multi_az,
                    "publicly_accessible": p.publicly_accessible,
                    "skip_final_snapshot": true,
                    "tags": tags_value(node),
                }),
            );
        }
        NodeProps::LoadBalancer(p) => {
            let subnet_refs = p
                .subnets
                .iter()
                .map(|id| {
                    Ok(attr_ref(
                        "aws_subnet",
                        name_of(names, &node.id, id)?,
                        "id",
                    ))
                })
                .collect::<IacResult<Vec<Value>>>()?;
            let sg_refs = group_refs(names, &node.id, &p.security_groups)?;
            add(
                resources,
                "aws_lb",
                &name,
                json!({
                    "name": truncate(node.label(), 32),
                    "internal": matches!(p.scheme, LbScheme::Internal),
                    "load_balancer_type": "application",
                    "security_groups": sg_refs,
                    "subnets": subnet_refs,
                    "tags": tags_value(node),
                }),
            );

            let tg_name = format!("{name}_tg");
            add(
                resources,
                "aws_lb_target_group",
                &tg_name,
                json!({
                    "name": format!("{}-tg", truncate(node.label(), 26)),
                    "port": 80,
                    "protocol": "HTTP",
                    "vpc_id": vpc_ref(graph, names, &node.id)?,
                    "health_check": {
                        "path": "/",
                        "protocol": "HTTP",
                        "interval": 30,
                        "timeout": 5,
                        "healthy_threshold": 2,
                        "unhealthy_threshold": 3
                    },
                    "tags": tags_value(node),
                }),
            );
            add(
                resources,
                "aws_lb_listener",
                &format!("{name}_listener"),
                json!({
                    "load_balancer_arn": attr_ref("aws_lb", &name, "arn"),
                    "port": 80,
                    "protocol": "HTTP",
                    "default_action": {
                        "type": "forward",
                        "target_group_arn": attr_ref("aws_lb_target_group", &tg_name, "arn")
                    }
                }),
            );

            // register routed-to instances with the target group
            let targets: Vec<&Edge> = graph
                .edges_of_kind(EdgeKind::RoutesTo)
                .filter(|e| {
                    e.from == node.id
                        && graph
                            .node(&e.to)
                            .map(|n| n.kind == NodeKind::ComputeInstance)
                            .unwrap_or(false)
                })
                .collect();
            for (i, edge) in targets.iter().enumerate() {
                let instance_name = name_of(names, &node.id, &edge.to)?;
                add(
                    resources,
                    "aws_lb_target_group_attachment",
                    &format!("{name}_tg_att{i}"),
                    json!({
                        "target_group_arn": attr_ref("aws_lb_target_group", &tg_name, "arn"),
                        "target_id": attr_ref("aws_instance", instance_name, "id"),
                        "port": 80
                    }),
                );
            }
        }
        NodeProps::TrafficGenerator => {
            return Err(IacError::UnsupportedNodeKind {
                node_id: node.id.clone(),
                kind: node.kind,
            });
        }
    }
    Ok(())
}

/// Route-table to subnet associations, taken from `attached_to` edges.
fn lower_route_associations(
    graph: &Graph,
    names: &NameRegistry,
    resources: &mut Resources,
) -> IacResult<()> {
    for edge in graph.edges_of_kind(EdgeKind::AttachedTo) {
        let (Some(from), Some(to)) = (graph.node(&edge.from), graph.node(&edge.to)) else {
            continue;
        };
        if from.kind != NodeKind::RouteTable || to.kind != NodeKind::Subnet {
            continue;
        }
        let rt_name = name_of(names, &from.id, &from.id)?;
        let subnet_name = name_of(names, &from.id, &to.id)?;
        add(
            resources,
            "aws_route_table_association",
            &format!("{rt_name}_{subnet_name}"),
            json!({
                "subnet_id": attr_ref("aws_subnet", subnet_name, "id"),
                "route_table_id": attr_ref("aws_route_table", rt_name, "id"),
            }),
        );
    }
    Ok(())
}

fn emit_rule(
    names: &NameRegistry,
    resources: &mut Resources,
    sg_node: &Node,
    sg_name: &str,
    direction: &str,
    rule_name: &str,
    rule: &SecurityRule,
) -> IacResult<()> {
    let mut body = json!({
        "type": direction,
        "from_port": rule.from_port,
        "to_port": rule.to_port,
        "protocol": rule.protocol,
        "security_group_id": attr_ref("aws_security_group", sg_name, "id"),
    });
    match &rule.source {
        RuleSource::Cidr(cidr) => {
            insert(&mut body, "cidr_blocks", json!([cidr.to_string()]));
        }
        RuleSource::SecurityGroup(other) => {
            let other_name = name_of(names, &sg_node.id, other)?;
            insert(
                &mut body,
                "source_security_group_id",
                attr_ref("aws_security_group", other_name, "id"),
            );
        }
    }
    add(resources, "aws_security_group_rule", rule_name, body);
    Ok(())
}

fn insert(body: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = body {
        map.insert(key.to_string(), value);
    }
}

fn add(resources: &mut Resources, rtype: &str, name: &str, body: Value) {
    resources
        .entry(rtype.to_string())
        .or_default()
        .insert(name.to_string(), body);
}

/// A `${type.name.attr}` interpolation reference.
fn attr_ref(rtype: &str, name: &str, attr: &str) -> Value {
    Value::String(format!("${{{rtype}.{name}.{attr}}}"))
}

fn name_of<'a>(names: &'a NameRegistry, resource: &str, node_id: &str) -> IacResult<&'a str> {
    names.get(node_id).ok_or_else(|| IacError::DanglingReference {
        resource: resource.to_string(),
        reference: node_id.to_string(),
    })
}

fn group_refs(names: &NameRegistry, resource: &str, ids: &[String]) -> IacResult<Vec<Value>> {
    ids.iter()
        .map(|id| {
            Ok(attr_ref(
                "aws_security_group",
                name_of(names, resource, id)?,
                "id",
            ))
        })
        .collect()
}

fn vpc_ref(graph: &Graph, names: &NameRegistry, resource: &str) -> IacResult<Value> {
    let network = graph.network().ok_or(IacError::MissingNetwork)?;
    let name = name_of(names, resource, &network.id)?;
    Ok(attr_ref("aws_vpc", name, "id"))
}

fn tags_value(node: &Node) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("Name".to_string(), json!(node.label()));
    for (k, v) in &node.tags {
        map.insert(k.clone(), json!(v));
    }
    Value::Object(map)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
