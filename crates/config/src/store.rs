//! Template stores, reached through the registry under the `template` key

use crate::document::{read_document, DocumentFormat};
use crate::template::PipelineTemplate;
use async_trait::async_trait;
use parking_lot::RwLock;
use rigger_core::{Error, Result};
use rigger_utils::write_atomic;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Source of pipeline templates
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn load(&self, name: &str) -> Result<PipelineTemplate>;

    /// Names of every stored template, sorted
    async fn list(&self) -> Result<Vec<String>>;

    async fn save(&self, template: &PipelineTemplate) -> Result<()>;
}

const TEMPLATE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Templates stored as JSON or YAML files in one directory
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `name`; a name with an extension is used as a file name
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let direct = self.dir.join(name);
        let has_template_extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
        if has_template_extension && direct.is_file() {
            return Some(direct);
        }

        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|candidate| candidate.is_file())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::template(name, "template names must be plain file names"));
    }
    Ok(())
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn load(&self, name: &str) -> Result<PipelineTemplate> {
        check_name(name)?;
        let path = self.locate(name).ok_or_else(|| {
            Error::template(name, format!("not found in {}", self.dir.display()))
        })?;

        let mut template: PipelineTemplate = read_document(&path).await?;
        if template.name.is_empty() {
            template.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(name)
                .to_string();
        }
        tracing::debug!(template = %template.name, path = %path.display(), "Loaded template");
        Ok(template)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::file_system(&self.dir, "list templates", e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::file_system(&self.dir, "list templates", e))?
        {
            let path = entry.path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
            if let (true, Some(stem)) = (is_template, path.file_stem().and_then(|s| s.to_str())) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn save(&self, template: &PipelineTemplate) -> Result<()> {
        check_name(&template.name)?;
        let path = self.dir.join(format!("{}.json", template.name));
        let content = DocumentFormat::Json.render(template)?;
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(template = %template.name, path = %path.display(), "Saved template");
        Ok(())
    }
}

/// Templates held in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<BTreeMap<String, PipelineTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, template: PipelineTemplate) -> Self {
        self.templates.write().insert(template.name.clone(), template);
        self
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn load(&self, name: &str) -> Result<PipelineTemplate> {
        self.templates
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::template(name, "not found"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.templates.read().keys().cloned().collect())
    }

    async fn save(&self, template: &PipelineTemplate) -> Result<()> {
        self.templates
            .write()
            .insert(template.name.clone(), template.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ComponentSpec;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_round_trip_and_listing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTemplateStore::new(temp_dir.path().join("templates"));
        assert!(store.list().await.unwrap().is_empty());

        let template = PipelineTemplate::new("web", "pulumi")
            .with_component(ComponentSpec::new("Network").with_config("cidr", "10.0.0.0/16"));
        store.save(&template).await.unwrap();
        std::fs::write(
            store.dir().join("batch.yml"),
            "name: batch\nengine: terraform\ncomponents: []\n",
        )
        .unwrap();
        std::fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["batch", "web"]);
        assert_eq!(store.load("web").await.unwrap(), template);
        assert_eq!(store.load("batch.yml").await.unwrap().engine.as_deref(), Some("terraform"));
    }

    #[tokio::test]
    async fn test_missing_template_is_template_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTemplateStore::new(temp_dir.path());

        assert!(matches!(store.load("ghost").await, Err(Error::Template { .. })));
        assert!(store.load("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_name_defaults_to_file_stem() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("api.json"), r#"{"engine":"pulumi"}"#).unwrap();

        let template = FileTemplateStore::new(temp_dir.path()).load("api").await.unwrap();
        assert_eq!(template.name, "api");
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryTemplateStore::new().with(PipelineTemplate::new("a", "pulumi"));
        store.save(&PipelineTemplate::new("b", "pulumi")).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a", "b"]);
        assert!(store.load("c").await.is_err());
    }
}
