//! # Export Bundler
//!
//! Packages a validated dataset into a hashed, reproducible bundle. Export is
//! refused while any blocker issue remains.
//!
//! ## Bundle Layout
//!
//! ```text
//! {name}.zip (ZIP archive)
//! ├── mimetype                      # "application/vnd.cmmo.bundle" (uncompressed, first entry)
//! ├── canonical_<type>.csv          # one per entity type of the template
//! ├── cross_modal_join_index.csv    # distinct lineage tuples of canonical ids
//! ├── field_mapping.json            # template reference + confirmed mapping
//! ├── validation_issues.csv         # machine-readable issue list
//! ├── validation_report.txt         # human-readable report
//! └── manifest.json                 # versions, counts, artifact hashes, bundle digest
//! ```
//!
//! Directory mode writes the same files without `mimetype`.
//!
//! ## Reproducibility
//!
//! Every artifact is a pure function of the dataset, the validation outcome
//! and the template. Only `generatedAt` and `operator` in `manifest.json`
//! come from [`ManifestMeta`]. ZIP entries carry a fixed timestamp, so two
//! exports of the same input differ only in the manifest.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use cmmo::harmonize::HarmonizedDataset;
//! # use cmmo::validator::ValidationOutcome;
//! # use cmmo::schema::SchemaTemplate;
//! use cmmo::export::{export_bundle, verify_bundle, ManifestMeta};
//!
//! # fn run(dataset: &HarmonizedDataset, outcome: &ValidationOutcome, template: &SchemaTemplate)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let bundle = export_bundle(dataset, outcome, template, ManifestMeta::now())?;
//! bundle.write_zip("run-42.zip")?;
//! assert!(!verify_bundle("run-42.zip")?.has_failures());
//! # Ok(())
//! # }
//! ```

mod error;
mod manifest;
mod tables;
mod verify;


use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::harmonize::HarmonizedDataset;
use crate::mapping::FieldMapping;
use crate::schema::SchemaTemplate;
use crate::validator::{ValidationOutcome, ValidationReport};

pub use error::ExportError;
pub use manifest::{
    bundle_digest, sha256_hex, ExportManifest, ManifestMeta, CANONICAL_MODEL_VERSION, HASH_PREFIX,
};
pub use tables::canonical_table_name;
pub use verify::{verify_bundle, BundleCheck, BundleVerification, Verdict};

/// MIME type of ZIP bundles
pub const BUNDLE_MIMETYPE: &str = "application/vnd.cmmo.bundle";

/// Name of the mimetype entry
pub const MIMETYPE_FILE: &str = "mimetype";

/// Name of the manifest artifact
pub const MANIFEST_FILE: &str = "manifest.json";

/// Name of the join index artifact
pub const JOIN_INDEX_FILE: &str = "cross_modal_join_index.csv";

/// Name of the mapping artifact
pub const FIELD_MAPPING_FILE: &str = "field_mapping.json";

/// Name of the human-readable report
pub const REPORT_FILE: &str = "validation_report.txt";

/// Name of the machine-readable issue list
pub const ISSUES_FILE: &str = "validation_issues.csv";

/// `field_mapping.json`: the mapping as it can be fed back into a later run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    /// Template id
    pub template_id: String,
    /// Template version
    pub template_version: String,
    /// Field → column (`null` = unmapped)
    pub mapping: FieldMapping,
}

/// One hashed file of a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name inside the bundle
    pub name: String,
    /// File contents
    pub bytes: Vec<u8>,
    /// `sha256:<hex>` of the contents
    pub sha256: String,
}

impl Artifact {
    fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let sha256 = sha256_hex(&bytes);
        Self {
            name: name.into(),
            bytes,
            sha256,
        }
    }
}

/// An export bundle held in memory until written
#[derive(Debug, Clone)]
pub struct Bundle {
    artifacts: Vec<Artifact>,
    manifest: ExportManifest,
    manifest_json: Vec<u8>,
}

impl Bundle {
    /// Artifacts in name order (manifest excluded)
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Get an artifact by file name
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// The manifest
    pub fn manifest(&self) -> &ExportManifest {
        &self.manifest
    }

    /// Serialized `manifest.json`
    pub fn manifest_json(&self) -> &[u8] {
        &self.manifest_json
    }

    /// Write the bundle as a directory of plain files.
    ///
    /// The directory must not exist yet.
    pub fn write_directory<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let root = path.as_ref();
        if root.exists() {
            return Err(ExportError::AlreadyExists(root.display().to_string()));
        }
        fs::create_dir_all(root)?;

        for artifact in &self.artifacts {
            fs::write(root.join(&artifact.name), &artifact.bytes)?;
        }
        fs::write(root.join(MANIFEST_FILE), &self.manifest_json)?;

        info!("Wrote bundle directory {} ({} files)", root.display(), self.artifacts.len() + 1);
        Ok(())
    }

    /// Write the bundle as a ZIP container and return its size in bytes.
    ///
    /// The file must not exist yet.
    pub fn write_zip<P: AsRef<Path>>(&self, path: P) -> Result<u64, ExportError> {
        let output_path = path.as_ref();
        if output_path.exists() {
            return Err(ExportError::AlreadyExists(output_path.display().to_string()));
        }
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(output_path)?;
        let mut zip_writer = ZipWriter::new(BufWriter::new(file));

        // mimetype MUST be first and uncompressed
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);
        zip_writer.start_file(MIMETYPE_FILE, stored)?;
        zip_writer.write_all(BUNDLE_MIMETYPE.as_bytes())?;

        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);
        for artifact in &self.artifacts {
            zip_writer.start_file(artifact.name.as_str(), deflated)?;
            zip_writer.write_all(&artifact.bytes)?;
        }
        zip_writer.start_file(MANIFEST_FILE, deflated)?;
        zip_writer.write_all(&self.manifest_json)?;

        let inner = zip_writer.finish()?;
        inner.into_inner().map_err(|e| {
            ExportError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush ZIP buffer: {}", e.error()),
            ))
        })?;

        let size = fs::metadata(output_path)?.len();
        info!("Wrote bundle {} ({} bytes)", output_path.display(), size);
        Ok(size)
    }
}

/// Build the export bundle of a validated dataset.
///
/// Fails with [`ExportError::BlockersPresent`] when the outcome has any
/// blocker.
pub fn export_bundle(
    dataset: &HarmonizedDataset,
    outcome: &ValidationOutcome,
    template: &SchemaTemplate,
    meta: ManifestMeta,
) -> Result<Bundle, ExportError> {
    let counts = outcome.counts();
    if counts.blockers > 0 {
        warn!("Export refused: {} blocker(s) present", counts.blockers);
        return Err(ExportError::BlockersPresent {
            count: counts.blockers,
        });
    }
    if dataset.template_id() != template.id || dataset.template_version() != template.version {
        return Err(ExportError::TemplateMismatch {
            expected: template.reference(),
            found: format!("{}@{}", dataset.template_id(), dataset.template_version()),
        });
    }

    let entity_types = template.entity_types();
    let mut artifacts = Vec::with_capacity(entity_types.len() + 4);

    for &entity_type in &entity_types {
        let bytes = tables::canonical_table(dataset, template, entity_type)?;
        debug!("{}: {} entities", entity_type, dataset.entities(entity_type).len());
        artifacts.push(Artifact::new(canonical_table_name(entity_type), bytes));
    }

    artifacts.push(Artifact::new(JOIN_INDEX_FILE, tables::join_index(&dataset.join_paths())?));

    let record = MappingRecord {
        template_id: dataset.template_id().to_string(),
        template_version: dataset.template_version().to_string(),
        mapping: dataset.mapping().to_draft(),
    };
    let mut mapping_json = serde_json::to_vec_pretty(&record)?;
    mapping_json.push(b'\n');
    artifacts.push(Artifact::new(FIELD_MAPPING_FILE, mapping_json));

    let report = ValidationReport::new(dataset, outcome).to_string();
    artifacts.push(Artifact::new(REPORT_FILE, report.into_bytes()));
    artifacts.push(Artifact::new(ISSUES_FILE, tables::issue_list(outcome)?));

    artifacts.sort_by(|a, b| a.name.cmp(&b.name));

    let artifact_hashes: BTreeMap<String, String> = artifacts
        .iter()
        .map(|a| (a.name.clone(), a.sha256.clone()))
        .collect();
    let manifest = ExportManifest {
        schema_version: template.reference(),
        ruleset_version: outcome.ruleset_version().to_string(),
        canonical_model_version: CANONICAL_MODEL_VERSION.to_string(),
        generated_at: meta.generated_at,
        operator: meta.operator,
        total_rows: dataset.total_rows(),
        blockers: counts.blockers,
        warnings: counts.warnings,
        info: counts.info,
        entity_counts: entity_types
            .iter()
            .map(|&t| (t, dataset.entities(t).len()))
            .collect(),
        bundle_digest: bundle_digest(&artifact_hashes),
        artifact_hashes,
    };
    let mut manifest_json = serde_json::to_vec_pretty(&manifest)?;
    manifest_json.push(b'\n');

    info!(
        "Bundle ready: {} artifact(s), digest {}",
        artifacts.len(),
        manifest.bundle_digest
    );

    Ok(Bundle {
        artifacts,
        manifest,
        manifest_json,
    })
}
