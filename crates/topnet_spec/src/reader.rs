//! Loading specs from files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::TopologySpec;

/// Reader for topology spec files.
pub struct SpecReader;

impl SpecReader {
    /// Load a spec from a JSON or YAML file, selected by extension.
    pub fn read_file(path: &Path) -> SpecResult<TopologySpec> {
        debug!("Reading topology spec from {:?}", path);
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::read_json(&content),
            Some("yaml") | Some("yml") => Self::read_yaml(&content),
            other => Err(SpecError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Parse a spec from a JSON string.
    pub fn read_json(content: &str) -> SpecResult<TopologySpec> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a spec from a YAML string.
    pub fn read_yaml(content: &str) -> SpecResult<TopologySpec> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentRole;

    #[test]
    fn reads_json_spec_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        fs::write(
            &path,
            r#"{"provider": "aws", "region": "us-east-2",
                "components": [{"role": "web_tier", "quantity": 1, "description": "simple web app"}]}"#,
        )
        .unwrap();

        let spec = SpecReader::read_file(&path).unwrap();
        assert_eq!(spec.region, "us-east-2");
        assert_eq!(spec.components[0].role, ComponentRole::WebTier);
    }

    #[test]
    fn reads_yaml_spec_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.yaml");
        fs::write(
            &path,
            "provider: aws\nregion: eu-west-1\ncomponents:\n  - role: db_tier\n    description: postgres database\n",
        )
        .unwrap();

        let spec = SpecReader::read_file(&path).unwrap();
        assert_eq!(spec.region, "eu-west-1");
        assert_eq!(spec.components[0].role, ComponentRole::DbTier);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.toml");
        fs::write(&path, "provider = 'aws'").unwrap();
        assert!(matches!(
            SpecReader::read_file(&path),
            Err(SpecError::UnsupportedFormat(_))
        ));
    }
}
