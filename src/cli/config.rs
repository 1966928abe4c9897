//! TOML configuration file support.
//!
//! Settings that stay the same across runs can live in a config file instead
//! of being repeated on every invocation. Command-line flags always win.
//!
//! ```toml
//! # cmmo.toml
//! [ingest]
//! max_rows = 200000
//! max_bytes = 104857600
//! encoding = "utf-8"
//! delimiter = ","
//!
//! [validation]
//! ruleset_version = "1.0.0"
//! reference_year = 2024
//!
//! [export]
//! operator = "lab-ops@example.org"
//! format = "zip"
//!
//! [templates]
//! dir = "./templates"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cmmo::ingest::{IngestLimits, IngestOptions, TextEncoding};
use cmmo::schema::SchemaRegistry;

/// Root configuration structure for cmmo.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Upload parsing settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Ruleset selection.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Bundle output settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Extra template sources.
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Configuration for parsing uploads.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Maximum number of data rows.
    pub max_rows: Option<usize>,

    /// Maximum upload size in bytes.
    pub max_bytes: Option<usize>,

    /// Text encoding; detected when absent.
    pub encoding: Option<String>,

    /// Field delimiter; detected when absent.
    pub delimiter: Option<char>,
}

/// Configuration for validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Ruleset version to apply (latest when absent).
    pub ruleset_version: Option<String>,

    /// Year used when an identifier suggestion needs one.
    pub reference_year: Option<i32>,
}

/// Bundle layout on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    /// Single `.cmmo.zip` archive
    #[default]
    Zip,
    /// Plain directory of artifacts
    Directory,
}

/// Configuration for export.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Operator recorded in the manifest.
    pub operator: Option<String>,

    /// Bundle layout.
    pub format: Option<BundleFormat>,
}

/// Configuration for template loading.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Directory of `.json`/`.toml` templates registered next to the built-ins.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the given file, or fall back to defaults when none was passed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Ingest options built from the `[ingest]` section.
    pub fn ingest_options(&self) -> Result<IngestOptions> {
        let defaults = IngestLimits::default();
        let limits = IngestLimits {
            max_rows: self.ingest.max_rows.unwrap_or(defaults.max_rows),
            max_bytes: self.ingest.max_bytes.unwrap_or(defaults.max_bytes),
        };

        let mut options = IngestOptions::new().with_limits(limits);
        if let Some(name) = &self.ingest.encoding {
            let encoding: TextEncoding = name
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid [ingest] encoding")?;
            options = options.with_encoding(encoding);
        }
        if let Some(delimiter) = self.ingest.delimiter {
            options = options.with_delimiter(delimiter);
        }
        Ok(options)
    }

    /// Built-in templates plus any from the `[templates]` directory.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::builtin();
        if let Some(dir) = &self.templates.dir {
            let added = registry
                .load_dir(dir)
                .with_context(|| format!("Failed to load templates from {}", dir.display()))?;
            log::info!("Loaded {} template(s) from {}", added, dir.display());
        }
        Ok(registry)
    }
}
