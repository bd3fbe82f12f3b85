//! Expansion of a [`TopologySpec`] into a concrete topology graph.
//!
//! The builder is a pure, synchronous transformation: the same spec and
//! tier always produce the same node kinds, attributes and edge structure.
//! All allocation state (the subnet CIDR counter, edge ids) lives in a
//! per-invocation [`BuildState`], so parallel builds cannot interfere.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use topnet_graph::{
    ComputeProps, DatabaseProps, Edge, EdgeKind, EdgeProps, GatewayProps, GatewayType, Graph,
    Ipv4Cidr, LbScheme, LoadBalancerProps, NetworkProps, Node, NodeKind, NodeProps, Provider,
    Route, RouteTableProps, RuleSource, SecurityGroupProps, SecurityRule, SubnetAllocator,
    SubnetProps,
};
use topnet_spec::{classify_spec, ComponentRole, Constraints, Tier, TopologySpec};

use crate::error::{BuildError, BuildResult};

/// Address block for the network container; subnets are carved out of it.
const VPC_CIDR: &str = "10.0.0.0/16";

/// Upper bound on any component quantity, guarding against pathological
/// specs that would otherwise allocate unbounded nodes.
pub const MAX_COMPONENT_QUANTITY: u32 = 50;

const AZ_SUFFIXES: &[char] = &['a', 'b', 'c', 'd', 'e', 'f'];

/// Builds a [`Graph`] from a [`TopologySpec`].
pub struct TopologyBuilder<'a> {
    spec: &'a TopologySpec,
    tier: Tier,
}

impl<'a> TopologyBuilder<'a> {
    /// Create a builder; the tier is classified from the spec text.
    pub fn new(spec: &'a TopologySpec) -> Self {
        Self {
            spec,
            tier: classify_spec(spec),
        }
    }

    /// Override the classified tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Build the complete topology graph. Spec errors are reported before
    /// any graph is produced; a partial graph is never returned.
    pub fn build(&self) -> BuildResult<Graph> {
        self.validate_spec()?;

        info!(
            tier = self.tier.value(),
            region = %self.spec.region,
            "Building topology graph"
        );

        let vpc_cidr: Ipv4Cidr = VPC_CIDR.parse()?;
        let mut state = BuildState::new(self.spec, self.tier, vpc_cidr);

        state.create_vpc(vpc_cidr);
        state.create_internet_gateway();

        let has_web = self.spec.has_role(ComponentRole::WebTier);
        let has_db = self.spec.has_role(ComponentRole::DbTier);

        match self.tier {
            Tier::One => {
                // An explicit constraint gets a load balancer even on the
                // hobby tier; only the surrounding architecture stays small.
                let wants_lb = has_web && self.spec.requests_load_balancer();
                state.create_public_subnets(1)?;
                state.create_route_tables();
                if wants_lb {
                    state.create_alb_security_group();
                }
                if has_web {
                    state.create_web_security_group();
                }
                if has_db {
                    state.create_db_security_group();
                }
                if has_web {
                    state.create_web_instances(state.quantity_for(ComponentRole::WebTier));
                }
                if wants_lb {
                    state.create_load_balancer();
                }
                if has_db {
                    state.create_databases();
                }
            }
            Tier::Two => {
                state.create_public_subnets(2)?;
                state.create_private_subnets(2)?;
                state.create_nat_gateway();
                state.create_route_tables();
                if has_web {
                    state.create_alb_security_group();
                    state.create_web_security_group();
                }
                if has_db {
                    state.create_db_security_group();
                }
                if has_web {
                    state.create_web_instances(state.quantity_for(ComponentRole::WebTier));
                    state.create_load_balancer();
                }
                if has_db {
                    state.create_databases();
                }
            }
        }

        let graph = state.into_graph();
        graph.check_integrity()?;

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Topology graph built"
        );
        Ok(graph)
    }

    fn validate_spec(&self) -> BuildResult<()> {
        if !self.spec.provider.eq_ignore_ascii_case("aws") {
            return Err(BuildError::UnsupportedProvider(self.spec.provider.clone()));
        }

        for component in &self.spec.components {
            match component.role {
                ComponentRole::WebTier | ComponentRole::DbTier | ComponentRole::Networking => {}
                // A silently incomplete topology is worse than a failed build.
                role @ (ComponentRole::TrafficGen | ComponentRole::Other) => {
                    return Err(BuildError::UnsupportedRole(role));
                }
            }

            if let Some(quantity) = component.quantity {
                let requires_instance = matches!(
                    component.role,
                    ComponentRole::WebTier | ComponentRole::DbTier
                );
                if quantity == 0 && requires_instance {
                    return Err(BuildError::InvalidQuantity {
                        role: component.role,
                        quantity,
                    });
                }
                if quantity > MAX_COMPONENT_QUANTITY {
                    return Err(BuildError::QuantityTooLarge {
                        role: component.role,
                        quantity,
                        max: MAX_COMPONENT_QUANTITY,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Build a topology graph from a spec.
pub fn build_topology(spec: &TopologySpec) -> BuildResult<Graph> {
    TopologyBuilder::new(spec).build()
}

/// Database subnet selection: db-tagged subnets first, then private, then
/// public. The fallback chain is a deliberate, observable policy.
pub fn select_database_subnets<'g>(subnets: &[&'g Node]) -> Vec<&'g Node> {
    let db_tagged: Vec<&Node> = subnets
        .iter()
        .copied()
        .filter(|n| n.tags.get("Tier").map(|t| t == "db").unwrap_or(false) || n.id.contains("db"))
        .collect();
    if !db_tagged.is_empty() {
        return db_tagged;
    }

    let private: Vec<&Node> = subnets
        .iter()
        .copied()
        .filter(|n| n.props.as_subnet().map(|s| !s.is_public).unwrap_or(false))
        .collect();
    if !private.is_empty() {
        return private;
    }

    subnets.to_vec()
}

/// Mutable per-invocation build state.
struct BuildState<'a> {
    spec: &'a TopologySpec,
    tier: Tier,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    allocator: SubnetAllocator,
    vpc_cidr: Ipv4Cidr,
    edge_counter: u32,
    vpc_id: String,
    igw_id: String,
    nat_id: Option<String>,
    public_subnet_ids: Vec<String>,
    private_subnet_ids: Vec<String>,
    web_sg_id: Option<String>,
    db_sg_id: Option<String>,
    alb_sg_id: Option<String>,
    web_instance_ids: Vec<String>,
}

impl<'a> BuildState<'a> {
    fn new(spec: &'a TopologySpec, tier: Tier, vpc_cidr: Ipv4Cidr) -> Self {
        Self {
            spec,
            tier,
            nodes: Vec::new(),
            edges: Vec::new(),
            allocator: SubnetAllocator::new(vpc_cidr),
            vpc_cidr,
            edge_counter: 0,
            vpc_id: "vpc-main".to_string(),
            igw_id: "igw-main".to_string(),
            nat_id: None,
            public_subnet_ids: Vec::new(),
            private_subnet_ids: Vec::new(),
            web_sg_id: None,
            db_sg_id: None,
            alb_sg_id: None,
            web_instance_ids: Vec::new(),
        }
    }

    fn quantity_for(&self, role: ComponentRole) -> u32 {
        if let Some(quantity) = self
            .spec
            .components_with_role(role)
            .find_map(|c| c.quantity)
        {
            return quantity;
        }
        match role {
            // HA tier defaults to a redundant pair, hobby tier to one.
            ComponentRole::WebTier if self.tier == Tier::Two => 2,
            _ => 1,
        }
    }

    fn constraints_for(&self, role: ComponentRole) -> Constraints {
        self.spec.constraints_for(role)
    }

    fn az(&self, index: usize) -> String {
        let suffix = AZ_SUFFIXES[index % AZ_SUFFIXES.len()];
        format!("{}{}", self.spec.region, suffix)
    }

    fn next_edge_id(&mut self) -> String {
        self.edge_counter += 1;
        format!("e{}", self.edge_counter)
    }

    fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn add_edge(&mut self, kind: EdgeKind, from: &str, to: &str, props: Option<EdgeProps>) {
        let id = self.next_edge_id();
        self.edges.push(Edge {
            id,
            kind,
            from: from.to_string(),
            to: to.to_string(),
            props,
        });
    }

    fn stamp(&self, node: Node, tag_name: &str) -> Node {
        node.with_provider(Provider::Aws)
            .with_region(&self.spec.region)
            .with_tag("Name", format!("topnet-{tag_name}"))
            .with_tag("ManagedBy", "TopNet")
    }

    fn create_vpc(&mut self, cidr: Ipv4Cidr) {
        let node = Node::new(
            self.vpc_id.clone(),
            NodeProps::Network(NetworkProps {
                cidr_block: cidr,
                enable_dns_hostnames: true,
                enable_dns_support: true,
            }),
        )
        .with_name("main-vpc");
        let node = self.stamp(node, "vpc");
        self.add_node(node);
    }

    fn create_internet_gateway(&mut self) {
        let node = Node::new(
            self.igw_id.clone(),
            NodeProps::Gateway(GatewayProps {
                gateway_type: GatewayType::Internet,
                subnet_id: None,
            }),
        )
        .with_name("main-igw");
        let node = self.stamp(node, "igw");
        self.add_node(node);
        let igw_id = self.igw_id.clone();
        let vpc_id = self.vpc_id.clone();
        self.add_edge(EdgeKind::AttachedTo, &igw_id, &vpc_id, None);
    }

    fn create_subnet(&mut self, id: &str, name: &str, az_index: usize, is_public: bool, tier_tag: &str) -> BuildResult<()> {
        let cidr = self.allocator.next_block()?;
        let az = self.az(az_index);
        let node = Node::new(
            id,
            NodeProps::Subnet(SubnetProps {
                cidr_block: cidr,
                is_public,
                map_public_ip_on_launch: is_public,
            }),
        )
        .with_name(name)
        .with_az(az)
        .with_tag("Tier", tier_tag);
        let node = self.stamp(node, name);
        self.add_node(node);
        let vpc_id = self.vpc_id.clone();
        self.add_edge(EdgeKind::AttachedTo, id, &vpc_id, None);
        self.add_edge(EdgeKind::Contains, &vpc_id, id, None);
        Ok(())
    }

    fn create_public_subnets(&mut self, count: usize) -> BuildResult<()> {
        for i in 0..count {
            let id = if count == 1 {
                "subnet-public".to_string()
            } else {
                format!("subnet-public-{}", i + 1)
            };
            let name = if count == 1 {
                "public-subnet".to_string()
            } else {
                format!("public-subnet-{}", i + 1)
            };
            self.create_subnet(&id, &name, i, true, "public")?;
            self.public_subnet_ids.push(id);
        }
        Ok(())
    }

    fn create_private_subnets(&mut self, count: usize) -> BuildResult<()> {
        for i in 0..count {
            let id = format!("subnet-private-{}", i + 1);
            let name = format!("private-subnet-{}", i + 1);
            self.create_subnet(&id, &name, i, false, "private")?;
            self.private_subnet_ids.push(id);
        }
        Ok(())
    }

    fn create_nat_gateway(&mut self) {
        let Some(subnet_id) = self.public_subnet_ids.first().cloned() else {
            return;
        };
        let az = self
            .nodes
            .iter()
            .find(|n| n.id == subnet_id)
            .and_then(|n| n.az.clone());

        let nat_id = "nat-main".to_string();
        let mut node = Node::new(
            nat_id.clone(),
            NodeProps::Gateway(GatewayProps {
                gateway_type: GatewayType::Nat,
                subnet_id: Some(subnet_id.clone()),
            }),
        )
        .with_name("nat-gateway");
        if let Some(az) = az {
            node = node.with_az(az);
        }
        let node = self.stamp(node, "nat");
        self.add_node(node);
        self.add_edge(EdgeKind::AttachedTo, &nat_id, &subnet_id, None);
        self.nat_id = Some(nat_id);
    }

    fn create_route_table(&mut self, id: &str, name: &str, gateway_id: &str, subnet_ids: Vec<String>) {
        let node = Node::new(
            id,
            NodeProps::RouteTable(RouteTableProps {
                routes: vec![Route {
                    destination: Ipv4Cidr::open(),
                    target: gateway_id.to_string(),
                }],
            }),
        )
        .with_name(name);
        let node = self.stamp(node, name);
        self.add_node(node);
        let vpc_id = self.vpc_id.clone();
        self.add_edge(EdgeKind::AttachedTo, id, &vpc_id, None);
        self.add_edge(EdgeKind::RoutesTo, id, gateway_id, None);
        for subnet_id in subnet_ids {
            // Association: mirrored by the generator, walked by reachability.
            self.add_edge(EdgeKind::AttachedTo, id, &subnet_id, None);
        }
    }

    fn create_route_tables(&mut self) {
        let public_subnets = self.public_subnet_ids.clone();
        let igw_id = self.igw_id.clone();
        match self.tier {
            Tier::One => {
                self.create_route_table("rt-main", "main-rt", &igw_id, public_subnets);
            }
            Tier::Two => {
                self.create_route_table("rt-public", "public-rt", &igw_id, public_subnets);
                if let Some(nat_id) = self.nat_id.clone() {
                    let private_subnets = self.private_subnet_ids.clone();
                    self.create_route_table("rt-private", "private-rt", &nat_id, private_subnets);
                }
            }
        }
    }

    fn create_security_group(&mut self, id: &str, name: &str, description: &str, ingress: Vec<SecurityRule>, egress: Vec<SecurityRule>) {
        let node = Node::new(
            id,
            NodeProps::SecurityGroup(SecurityGroupProps {
                description: description.to_string(),
                ingress,
                egress,
            }),
        )
        .with_name(name);
        let node = self.stamp(node, name);
        self.add_node(node);
        let vpc_id = self.vpc_id.clone();
        self.add_edge(EdgeKind::AttachedTo, id, &vpc_id, None);
    }

    fn create_alb_security_group(&mut self) {
        let open = RuleSource::Cidr(Ipv4Cidr::open());
        self.create_security_group(
            "sg-alb",
            "alb-sg",
            "Security group for the load balancer",
            vec![
                SecurityRule::tcp(80, open.clone()),
                SecurityRule::tcp(443, open),
            ],
            vec![SecurityRule::allow_all_egress()],
        );
        self.alb_sg_id = Some("sg-alb".to_string());
    }

    fn create_web_security_group(&mut self) {
        let ingress = match (&self.tier, &self.alb_sg_id) {
            (Tier::Two, Some(alb_sg)) => vec![
                SecurityRule::tcp(80, RuleSource::SecurityGroup(alb_sg.clone())),
                SecurityRule::tcp(443, RuleSource::SecurityGroup(alb_sg.clone())),
                // SSH from inside the VPC only; still surfaced by validation.
                SecurityRule::tcp(22, RuleSource::Cidr(self.vpc_cidr)),
            ],
            _ => {
                let open = RuleSource::Cidr(Ipv4Cidr::open());
                vec![
                    SecurityRule::tcp(80, open.clone()),
                    SecurityRule::tcp(443, open.clone()),
                    SecurityRule::tcp(22, open),
                ]
            }
        };
        self.create_security_group(
            "sg-web",
            "web-sg",
            "Security group for the web tier",
            ingress,
            vec![SecurityRule::allow_all_egress()],
        );
        self.web_sg_id = Some("sg-web".to_string());

        if let Some(alb_sg) = self.alb_sg_id.clone() {
            self.add_edge(
                EdgeKind::AllowedTraffic,
                &alb_sg,
                "sg-web",
                Some(EdgeProps {
                    ports: vec![80, 443],
                    source_cidr: None,
                }),
            );
        }
    }

    fn create_db_security_group(&mut self) {
        let constraints = self.constraints_for(ComponentRole::DbTier);
        let port = constraints.db_port();

        let ingress = match &self.web_sg_id {
            Some(web_sg) => vec![SecurityRule::tcp(
                port,
                RuleSource::SecurityGroup(web_sg.clone()),
            )],
            // No web tier to scope to; restrict to the VPC address range.
            None => vec![SecurityRule::tcp(port, RuleSource::Cidr(self.vpc_cidr))],
        };
        self.create_security_group(
            "sg-db",
            "db-sg",
            "Security group for the database tier",
            ingress,
            Vec::new(),
        );
        self.db_sg_id = Some("sg-db".to_string());

        if let Some(web_sg) = self.web_sg_id.clone() {
            self.add_edge(
                EdgeKind::AllowedTraffic,
                &web_sg,
                "sg-db",
                Some(EdgeProps {
                    ports: vec![port],
                    source_cidr: None,
                }),
            );
        }
    }

    fn create_web_instances(&mut self, quantity: u32) {
        let constraints = self.constraints_for(ComponentRole::WebTier);
        let instance_type = constraints.instance_type().to_string();
        let subnets = self.public_subnet_ids.clone();
        if subnets.is_empty() {
            return;
        }
        let security_groups: Vec<String> = self.web_sg_id.iter().cloned().collect();

        for i in 0..quantity as usize {
            // Round-robin keeps zone placement balanced.
            let subnet_id = subnets[i % subnets.len()].clone();
            let az = self
                .nodes
                .iter()
                .find(|n| n.id == subnet_id)
                .and_then(|n| n.az.clone());

            let (id, name) = if quantity == 1 && self.tier == Tier::One {
                ("ec2-instance".to_string(), "web-server".to_string())
            } else {
                (format!("ec2-web-{}", i + 1), format!("web-server-{}", i + 1))
            };

            let mut node = Node::new(
                id.clone(),
                NodeProps::Compute(ComputeProps {
                    instance_type: instance_type.clone(),
                    subnet_id: subnet_id.clone(),
                    security_groups: security_groups.clone(),
                    associate_public_ip: self.tier == Tier::One,
                }),
            )
            .with_name(name.clone())
            .with_tag("Role", "web");
            if let Some(az) = az {
                node = node.with_az(az);
            }
            let node = self.stamp(node, &name);
            self.add_node(node);
            self.add_edge(EdgeKind::AttachedTo, &id, &subnet_id, None);
            self.web_instance_ids.push(id);
        }
    }

    fn create_databases(&mut self) {
        let constraints = self.constraints_for(ComponentRole::DbTier);
        let engine = constraints.engine().to_string();
        let engine_version = constraints.engine_version();
        let instance_class = constraints.instance_class().to_string();
        let storage = constraints.allocated_storage();
        let port = constraints.db_port();

        let subnet_nodes: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Subnet)
            .collect();
        let selected: Vec<(String, Option<String>)> = select_database_subnets(&subnet_nodes)
            .into_iter()
            .map(|n| (n.id.clone(), n.az.clone()))
            .collect();
        if selected.is_empty() {
            return;
        }
        let subnet_ids: Vec<String> = selected.iter().map(|(id, _)| id.clone()).collect();
        let security_groups: Vec<String> = self.db_sg_id.iter().cloned().collect();

        let db_components = self
            .spec
            .components_with_role(ComponentRole::DbTier)
            .count();
        for i in 0..db_components {
            // At most one database node per db_tier component.
            let (id, name) = if db_components == 1 {
                ("rds-main".to_string(), "main-db".to_string())
            } else {
                (format!("rds-{}", i + 1), format!("main-db-{}", i + 1))
            };
            let (home_subnet, az) = selected[i % selected.len()].clone();

            let mut node = Node::new(
                id.clone(),
                NodeProps::Database(DatabaseProps {
                    engine: engine.clone(),
                    engine_version: engine_version.clone(),
                    instance_class: instance_class.clone(),
                    allocated_storage: storage,
                    subnet_ids: subnet_ids.clone(),
                    security_groups: security_groups.clone(),
                    multi_az: false,
                    publicly_accessible: false,
                }),
            )
            .with_name(name.clone());
            if let Some(az) = az {
                node = node.with_az(az);
            }
            let node = self.stamp(node, &name);
            self.add_node(node);
            self.add_edge(EdgeKind::AttachedTo, &id, &home_subnet, None);
            if let Some(web_sg) = self.web_sg_id.clone() {
                self.add_edge(
                    EdgeKind::AllowedTraffic,
                    &web_sg,
                    &id,
                    Some(EdgeProps {
                        ports: vec![port],
                        source_cidr: None,
                    }),
                );
            }
        }
    }

    fn create_load_balancer(&mut self) {
        let (Some(alb_sg), false) = (self.alb_sg_id.clone(), self.public_subnet_ids.is_empty())
        else {
            return;
        };
        let alb_id = "alb-web".to_string();
        let subnets = self.public_subnet_ids.clone();
        let node = Node::new(
            alb_id.clone(),
            NodeProps::LoadBalancer(LoadBalancerProps {
                scheme: LbScheme::InternetFacing,
                subnets: subnets.clone(),
                security_groups: vec![alb_sg],
            }),
        )
        .with_name("web-alb");
        let node = self.stamp(node, "web-alb");
        self.add_node(node);

        for subnet_id in subnets {
            self.add_edge(EdgeKind::AttachedTo, &alb_id, &subnet_id, None);
        }
        for instance_id in self.web_instance_ids.clone() {
            self.add_edge(
                EdgeKind::RoutesTo,
                &alb_id,
                &instance_id,
                Some(EdgeProps {
                    ports: vec![80],
                    source_cidr: None,
                }),
            );
            self.add_edge(EdgeKind::DependsOn, &alb_id, &instance_id, None);
        }
    }

    fn into_graph(self) -> Graph {
        let suffix = Uuid::new_v4().simple().to_string();
        let mode = match self.tier {
            Tier::One => "Hobby",
            Tier::Two => "Production",
        };
        let mut graph = Graph::new(format!("topo-{}", &suffix[..12]));
        graph.name = Some(format!(
            "Tier {} ({}) - {}",
            self.tier.value(),
            mode,
            self.spec.region
        ));
        graph.nodes = self.nodes;
        graph.edges = self.edges;
        graph
            .metadata
            .insert("created_at".into(), Utc::now().to_rfc3339().into());
        graph.metadata.insert("version".into(), "0.1.0".into());
        graph
            .metadata
            .insert("intent".into(), self.spec.description_text().into());
        if let Ok(spec) = serde_json::to_value(self.spec) {
            graph.metadata.insert("spec".into(), spec);
        }
        graph
    }
}
