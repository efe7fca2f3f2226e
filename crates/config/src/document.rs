//! JSON and YAML document parsing

use rigger_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Serialization format of a document on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Format implied by the file extension; anything unrecognised is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }

    /// File extensions tried for this format, preferred first
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Json => &["json"],
            DocumentFormat::Yaml => &["yaml", "yml"],
        }
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str, origin: &str) -> Result<T> {
        match self {
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| Error::Json {
                message: format!("failed to parse {origin}"),
                source: e,
            }),
            DocumentFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::configuration(format!("failed to parse {origin}: {e}"))),
        }
    }

    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            DocumentFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            DocumentFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| Error::configuration(format!("failed to render YAML: {e}"))),
        }
    }
}

/// Read and parse a document, choosing the format from the extension
pub async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::file_system(path, "read document", e))?;
    DocumentFormat::from_path(path).parse(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a")), DocumentFormat::Json);
    }

    #[test]
    fn test_yaml_and_json_parse_to_same_value() {
        let from_yaml: Value = DocumentFormat::Yaml.parse("name: web\nreplicas: 2\n", "inline").unwrap();
        let from_json: Value = DocumentFormat::Json
            .parse(r#"{"name":"web","replicas":2}"#, "inline")
            .unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_parse_errors_name_the_origin() {
        let err = DocumentFormat::Yaml
            .parse::<Value>("a: [unclosed", "broken.yaml")
            .unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
