//! # Pipeline Runs
//!
//! Binds the stages into one run with an explicit stage per step:
//!
//! ```text
//! Uploaded ─map─> Mapped ─harmonize─> Harmonized ─validate─┬─> Validated ─export─> Exported
//!                                                          └─> Blocked
//! ```
//!
//! Every transition consumes the previous stage and returns an immutable
//! snapshot of the next one. A [`Blocked`] run has no way forward: corrections
//! mean a new upload and a new run, so every exported bundle traces back to
//! exactly one source file.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cmmo::export::ManifestMeta;
//! use cmmo::harmonize::HarmonizeOptions;
//! use cmmo::ingest::IngestOptions;
//! use cmmo::mapping::FieldMapping;
//! use cmmo::pipeline::{Uploaded, Validation};
//! use cmmo::schema::SchemaRegistry;
//! use cmmo::validator::{Ruleset, ValidationOptions};
//!
//! let registry = SchemaRegistry::builtin();
//! let template = registry.get("cosmx", "1.2")?;
//! let mapping = FieldMapping::from_json(&std::fs::read_to_string("mapping.json")?)?;
//!
//! let run = Uploaded::from_file("samples.csv", &IngestOptions::default())?
//!     .map(template, mapping)?
//!     .harmonize(&HarmonizeOptions::default())?
//!     .validate(&Ruleset::latest(), &ValidationOptions::default())?;
//!
//! match run {
//!     Validation::Passed(validated) => {
//!         validated.export(ManifestMeta::now())?.bundle().write_zip("bundle.zip")?;
//!     }
//!     Validation::Blocked(blocked) => println!("{}", blocked.report()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;


use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::export::{export_bundle, Bundle, ManifestMeta};
use crate::harmonize::{harmonize, HarmonizeOptions, HarmonizedDataset};
use crate::ingest::{parse_bytes, parse_file, IngestOptions, RawTable};
use crate::mapping::{ConfirmedMapping, FieldMapping};
use crate::schema::SchemaTemplate;
use crate::validator::{validate, Ruleset, ValidationOptions, ValidationOutcome, ValidationReport};

pub use error::{MappingRejected, PipelineError};

/// Workflow stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// File parsed
    Uploaded,
    /// Mapping confirmed
    Mapped,
    /// Canonical entities built
    Harmonized,
    /// Validated without blockers
    Validated,
    /// Validated with blockers; terminal
    Blocked,
    /// Bundle produced; terminal
    Exported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Uploaded => write!(f, "uploaded"),
            Stage::Mapped => write!(f, "mapped"),
            Stage::Harmonized => write!(f, "harmonized"),
            Stage::Validated => write!(f, "validated"),
            Stage::Blocked => write!(f, "blocked"),
            Stage::Exported => write!(f, "exported"),
        }
    }
}

/// Identity of a run, carried unchanged through every stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// Random run id
    pub run_id: Uuid,
    /// When the file was accepted
    pub created_at: DateTime<Utc>,
    /// Source file name, if known
    pub source: Option<String>,
}

impl RunInfo {
    fn new(source: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
        }
    }
}

/// A parsed upload
#[derive(Debug)]
pub struct Uploaded {
    info: RunInfo,
    table: RawTable,
}

impl Uploaded {
    /// Start a run from an already parsed table
    pub fn new(table: RawTable) -> Self {
        Self::with_source(table, None)
    }

    fn with_source(table: RawTable, source: Option<String>) -> Self {
        let info = RunInfo::new(source);
        info!(
            "Run {} uploaded: {} row(s), {} column(s)",
            info.run_id,
            table.row_count(),
            table.columns().len()
        );
        Self { info, table }
    }

    /// Start a run from file bytes
    pub fn from_bytes(
        bytes: &[u8],
        source: Option<String>,
        options: &IngestOptions,
    ) -> Result<Self, PipelineError> {
        let table = parse_bytes(bytes, options)?;
        Ok(Self::with_source(table, source))
    }

    /// Start a run from a file on disk
    pub fn from_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let table = parse_file(path, options)?;
        let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(Self::with_source(table, source))
    }

    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Run id
    pub fn run_id(&self) -> Uuid {
        self.info.run_id
    }

    /// Stage of this snapshot
    pub fn stage(&self) -> Stage {
        Stage::Uploaded
    }

    /// The parsed table
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    /// Confirm the operator's mapping.
    ///
    /// A rejected mapping hands the run back unchanged so a corrected
    /// mapping can be tried against the same upload.
    pub fn map(self, template: &SchemaTemplate, mapping: FieldMapping) -> Result<Mapped, MappingRejected> {
        match mapping.confirm(&self.table, template) {
            Ok(mapping) => {
                info!(
                    "Run {} mapped to {}: {} field(s) bound, {} unmapped",
                    self.info.run_id,
                    template.reference(),
                    mapping.bindings().len(),
                    mapping.unmapped_fields().len()
                );
                Ok(Mapped {
                    info: self.info,
                    table: self.table,
                    template: template.clone(),
                    mapping,
                })
            }
            Err(error) => {
                warn!("Run {} mapping rejected: {}", self.info.run_id, error);
                Err(MappingRejected {
                    run: Box::new(self),
                    error,
                })
            }
        }
    }
}

/// A run with a confirmed mapping
#[derive(Debug)]
pub struct Mapped {
    info: RunInfo,
    table: RawTable,
    template: SchemaTemplate,
    mapping: ConfirmedMapping,
}

impl Mapped {
    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Stage of this snapshot
    pub fn stage(&self) -> Stage {
        Stage::Mapped
    }

    /// The confirmed mapping
    pub fn mapping(&self) -> &ConfirmedMapping {
        &self.mapping
    }

    /// Build canonical entities
    pub fn harmonize(self, options: &HarmonizeOptions) -> Result<Harmonized, PipelineError> {
        let dataset = harmonize(&self.table, &self.mapping, &self.template, options)?;
        info!(
            "Run {} harmonized: {} finding(s)",
            self.info.run_id,
            dataset.findings().len()
        );
        Ok(Harmonized {
            info: self.info,
            table: self.table,
            template: self.template,
            dataset,
        })
    }
}

/// A run with canonical entities
#[derive(Debug)]
pub struct Harmonized {
    info: RunInfo,
    table: RawTable,
    template: SchemaTemplate,
    dataset: HarmonizedDataset,
}

impl Harmonized {
    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Stage of this snapshot
    pub fn stage(&self) -> Stage {
        Stage::Harmonized
    }

    /// The harmonized dataset
    pub fn dataset(&self) -> &HarmonizedDataset {
        &self.dataset
    }

    /// Apply a ruleset. The raw table is released afterwards.
    pub fn validate(
        self,
        ruleset: &Ruleset,
        options: &ValidationOptions,
    ) -> Result<Validation, PipelineError> {
        let outcome = validate(&self.dataset, &self.table, &self.template, ruleset, options)?;
        let result = Checked {
            info: self.info,
            template: self.template,
            dataset: self.dataset,
            outcome,
        };

        if result.outcome.is_blocked() {
            warn!(
                "Run {} blocked: {} blocker(s)",
                result.info.run_id,
                result.outcome.counts().blockers
            );
            Ok(Validation::Blocked(Blocked(result)))
        } else {
            info!(
                "Run {} validated: {} warning(s), {} info",
                result.info.run_id,
                result.outcome.counts().warnings,
                result.outcome.counts().info
            );
            Ok(Validation::Passed(Validated(result)))
        }
    }
}

/// Shared state of the validated stages
#[derive(Debug)]
struct Checked {
    info: RunInfo,
    template: SchemaTemplate,
    dataset: HarmonizedDataset,
    outcome: ValidationOutcome,
}

impl Checked {
    fn report(&self) -> ValidationReport {
        ValidationReport::new(&self.dataset, &self.outcome)
    }
}

/// Result of validation: either exportable or blocked
#[derive(Debug)]
pub enum Validation {
    /// No blockers
    Passed(Validated),
    /// At least one blocker
    Blocked(Blocked),
}

impl Validation {
    /// Stage of this snapshot
    pub fn stage(&self) -> Stage {
        match self {
            Validation::Passed(_) => Stage::Validated,
            Validation::Blocked(_) => Stage::Blocked,
        }
    }

    /// The validation outcome
    pub fn outcome(&self) -> &ValidationOutcome {
        match self {
            Validation::Passed(v) => v.outcome(),
            Validation::Blocked(b) => b.outcome(),
        }
    }

    /// The human-readable report
    pub fn report(&self) -> ValidationReport {
        match self {
            Validation::Passed(v) => v.report(),
            Validation::Blocked(b) => b.report(),
        }
    }
}

/// A validated run without blockers
#[derive(Debug)]
pub struct Validated(Checked);

impl Validated {
    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.0.info
    }

    /// The harmonized dataset
    pub fn dataset(&self) -> &HarmonizedDataset {
        &self.0.dataset
    }

    /// The validation outcome
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.0.outcome
    }

    /// The human-readable report
    pub fn report(&self) -> ValidationReport {
        self.0.report()
    }

    /// Build the export bundle
    pub fn export(self, meta: ManifestMeta) -> Result<Exported, PipelineError> {
        let Checked {
            info,
            template,
            dataset,
            outcome,
        } = self.0;
        let bundle = export_bundle(&dataset, &outcome, &template, meta)?;
        info!(
            "Run {} exported: {} artifact(s)",
            info.run_id,
            bundle.artifacts().len()
        );
        Ok(Exported {
            info,
            outcome,
            bundle,
        })
    }
}

/// A validated run with blockers. Terminal: fix the source file and start a
/// new run.
#[derive(Debug)]
pub struct Blocked(Checked);

impl Blocked {
    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.0.info
    }

    /// The harmonized dataset
    pub fn dataset(&self) -> &HarmonizedDataset {
        &self.0.dataset
    }

    /// The validation outcome
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.0.outcome
    }

    /// The human-readable report
    pub fn report(&self) -> ValidationReport {
        self.0.report()
    }
}

/// A run whose bundle has been produced
#[derive(Debug)]
pub struct Exported {
    info: RunInfo,
    outcome: ValidationOutcome,
    bundle: Bundle,
}

impl Exported {
    /// Run identity
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Stage of this snapshot
    pub fn stage(&self) -> Stage {
        Stage::Exported
    }

    /// The validation outcome
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// The export bundle
    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    /// Take the bundle
    pub fn into_bundle(self) -> Bundle {
        self.bundle
    }
}
