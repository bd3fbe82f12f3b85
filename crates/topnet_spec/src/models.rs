//! Data models for topology specifications.

use serde::{Deserialize, Serialize};

/// The role a component plays in the requested topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    WebTier,
    DbTier,
    TrafficGen,
    Networking,
    Other,
}

impl ComponentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentRole::WebTier => "web_tier",
            ComponentRole::DbTier => "db_tier",
            ComponentRole::TrafficGen => "traffic_gen",
            ComponentRole::Networking => "networking",
            ComponentRole::Other => "other",
        }
    }
}

impl std::fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional, typed constraints on a component. Unknown keys from upstream
/// producers are ignored on deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_storage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<bool>,
}

impl Constraints {
    /// Database engine, defaulting to postgres.
    pub fn engine(&self) -> &str {
        self.engine.as_deref().unwrap_or("postgres")
    }

    /// Engine version matching the selected engine.
    pub fn engine_version(&self) -> String {
        match &self.engine_version {
            Some(v) => v.clone(),
            None if self.db_port() == 3306 => "8.0".to_string(),
            None => "15.4".to_string(),
        }
    }

    /// Listener port for the selected engine.
    pub fn db_port(&self) -> u16 {
        let engine = self.engine();
        if engine.starts_with("mysql") || engine.starts_with("mariadb") {
            3306
        } else {
            5432
        }
    }

    pub fn instance_type(&self) -> &str {
        self.instance_type.as_deref().unwrap_or("t3.micro")
    }

    pub fn instance_class(&self) -> &str {
        self.instance_class.as_deref().unwrap_or("db.t3.micro")
    }

    pub fn allocated_storage(&self) -> u32 {
        self.allocated_storage.unwrap_or(20)
    }
}

/// Specification for a single component in the topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub role: ComponentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

impl ComponentSpec {
    pub fn new(role: ComponentRole, description: impl Into<String>) -> Self {
        Self {
            role,
            quantity: None,
            description: description.into(),
            constraints: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

/// High-level specification of the desired topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

fn default_provider() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: default_region(),
            components: Vec::new(),
        }
    }
}

impl TopologySpec {
    /// Whether any component has the given role.
    pub fn has_role(&self, role: ComponentRole) -> bool {
        self.components.iter().any(|c| c.role == role)
    }

    /// All components with the given role, in spec order.
    pub fn components_with_role(&self, role: ComponentRole) -> impl Iterator<Item = &ComponentSpec> {
        self.components.iter().filter(move |c| c.role == role)
    }

    /// Constraints of the first component with the given role.
    pub fn constraints_for(&self, role: ComponentRole) -> Constraints {
        self.components_with_role(role)
            .find_map(|c| c.constraints.clone())
            .unwrap_or_default()
    }

    /// Whether any component explicitly asked for a load balancer.
    pub fn requests_load_balancer(&self) -> bool {
        self.components.iter().any(|c| {
            c.constraints
                .as_ref()
                .and_then(|k| k.load_balancer)
                .unwrap_or(false)
        })
    }

    /// Concatenated description text of all components, lowercased. This is
    /// the input to tier classification.
    pub fn description_text(&self) -> String {
        self.components
            .iter()
            .map(|c| c.description.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_defaults_track_engine() {
        let postgres = Constraints::default();
        assert_eq!(postgres.engine(), "postgres");
        assert_eq!(postgres.db_port(), 5432);
        assert_eq!(postgres.engine_version(), "15.4");

        let mysql = Constraints {
            engine: Some("mysql".into()),
            ..Default::default()
        };
        assert_eq!(mysql.db_port(), 3306);
        assert_eq!(mysql.engine_version(), "8.0");
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: TopologySpec = serde_json::from_str(
            r#"{"components": [{"role": "web_tier", "description": "simple web app"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.provider, "aws");
        assert_eq!(spec.region, "us-east-1");
        assert_eq!(spec.components[0].role, ComponentRole::WebTier);
        assert_eq!(spec.components[0].quantity, None);
    }

    #[test]
    fn unknown_constraint_keys_are_ignored() {
        let spec: ComponentSpec = serde_json::from_str(
            r#"{"role": "db_tier", "description": "db",
                "constraints": {"engine": "mysql", "zone_hint": "b"}}"#,
        )
        .unwrap();
        assert_eq!(spec.constraints.unwrap().engine(), "mysql");
    }

    #[test]
    fn load_balancer_request_is_visible_on_the_spec() {
        let mut spec = TopologySpec {
            components: vec![ComponentSpec::new(ComponentRole::WebTier, "web")],
            ..Default::default()
        };
        assert!(!spec.requests_load_balancer());
        spec.components[0].constraints = Some(Constraints {
            load_balancer: Some(true),
            ..Default::default()
        });
        assert!(spec.requests_load_balancer());
    }

    #[test]
    fn description_text_concatenates_lowercased() {
        let spec = TopologySpec {
            components: vec![
                ComponentSpec::new(ComponentRole::WebTier, "Production web"),
                ComponentSpec::new(ComponentRole::DbTier, "Postgres DB"),
            ],
            ..Default::default()
        };
        assert_eq!(spec.description_text(), "production web postgres db");
    }
}
