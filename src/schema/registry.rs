use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};

use super::builtin;
use super::{SchemaError, SchemaTemplate, TemplateSummary};

/// Registry of schema templates keyed by `(id, version)`
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    templates: BTreeMap<(String, String), SchemaTemplate>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in templates
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for template in builtin::templates() {
            debug_assert!(template.validate().is_ok(), "{}", template.reference());
            registry
                .templates
                .insert((template.id.clone(), template.version.clone()), template);
        }
        registry
    }

    /// Validate and register a template
    pub fn register(&mut self, template: SchemaTemplate) -> Result<(), SchemaError> {
        template.validate()?;
        let key = (template.id.clone(), template.version.clone());
        if self.templates.contains_key(&key) {
            return Err(SchemaError::DuplicateTemplate {
                id: key.0,
                version: key.1,
            });
        }
        debug!("Registered template {}", template.reference());
        self.templates.insert(key, template);
        Ok(())
    }

    /// Load and register one `.json` or `.toml` template file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let display = path.display().to_string();
        let template: SchemaTemplate = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|source| SchemaError::TomlError {
                path: display,
                source,
            })?,
            _ => serde_json::from_str(&content).map_err(|source| SchemaError::JsonError {
                path: display,
                source,
            })?,
        };
        self.register(template)
    }

    /// Register every `*.json` and `*.toml` file in a directory.
    ///
    /// Files are loaded in name order. Returns the number of templates added.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, SchemaError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("json") | Some("toml")
                    )
            })
            .collect();
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }
        info!(
            "Loaded {} template(s) from {}",
            paths.len(),
            dir.as_ref().display()
        );
        Ok(paths.len())
    }

    /// Summaries of all templates, sorted by id then version
    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates.values().map(SchemaTemplate::summary).collect()
    }

    /// Look up a template by id and version
    pub fn get(&self, id: &str, version: &str) -> Result<&SchemaTemplate, SchemaError> {
        self.templates
            .get(&(id.to_string(), version.to_string()))
            .ok_or_else(|| SchemaError::TemplateNotFound {
                id: id.to_string(),
                version: version.to_string(),
            })
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
