//! Node-id to Terraform resource-name mapping.

use std::collections::BTreeMap;

/// Lower a node id into a legal Terraform identifier.
///
/// Terraform resource names allow letters, digits and underscores and must
/// not start with a digit. Anything else becomes an underscore.
pub fn sanitize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'n');
    }
    out
}

/// Per-invocation registry assigning each node id a unique resource name.
///
/// Sanitization can collide (`web-1` and `web_1` both lower to `web_1`);
/// the registry disambiguates deterministically by assignment order, so the
/// same graph always produces the same names.
#[derive(Debug, Default)]
pub struct NameRegistry {
    by_id: BTreeMap<String, String>,
    taken: BTreeMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign (or return the already-assigned) name for a node id.
    pub fn assign(&mut self, node_id: &str) -> String {
        if let Some(existing) = self.by_id.get(node_id) {
            return existing.clone();
        }
        let base = sanitize(node_id);
        let mut candidate = base.clone();
        let mut counter = 2;
        while self.taken.contains_key(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.taken.insert(candidate.clone(), node_id.to_string());
        self.by_id.insert(node_id.to_string(), candidate.clone());
        candidate
    }

    /// Look up the name assigned to a node id, if any.
    pub fn get(&self, node_id: &str) -> Option<&str> {
        self.by_id.get(node_id).map(String::as_str)
    }
}
