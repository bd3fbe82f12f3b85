//! Validation findings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How serious a finding is. Findings never block generation; acting on
/// them is caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One validator-produced observation about a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, rename = "nodeIds", skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<String>,
}

impl Finding {
    /// Create a finding with a slug-prefixed unique id.
    pub fn new(
        slug: &str,
        severity: Severity,
        message: impl Into<String>,
        node_ids: Vec<String>,
    ) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{slug}-{}", &suffix[..8]),
            severity,
            message: message.into(),
            node_ids,
        }
    }

    pub fn error(slug: &str, message: impl Into<String>, node_ids: Vec<String>) -> Self {
        Self::new(slug, Severity::Error, message, node_ids)
    }

    pub fn warning(slug: &str, message: impl Into<String>, node_ids: Vec<String>) -> Self {
        Self::new(slug, Severity::Warning, message, node_ids)
    }

    pub fn info(slug: &str, message: impl Into<String>, node_ids: Vec<String>) -> Self {
        Self::new(slug, Severity::Info, message, node_ids)
    }
}
