//! # cmmo - Canonical Multiomic Metadata Orchestrator
//!
//! `cmmo` turns laboratory metadata sheets from spatial-biology and sequencing
//! platforms (CosMx, GeoMx DSP, Visium HD, Xenium, Illumina run sheets) into a
//! canonical entity model, validates it against a versioned ruleset and
//! exports a hashed, reproducible bundle.
//!
//! ## Key Features
//!
//! - **Deterministic**: identical inputs with identical template and ruleset
//!   versions give byte-identical canonical tables, issue lists and reports.
//!
//! - **Explicit Mapping**: column detection is advisory only. The harmonizer
//!   accepts nothing but an operator-confirmed mapping.
//!
//! - **Canonical Identity**: entities get `CM-{PREFIX}-{ordinal}` ids ordered by
//!   natural key, so row order and parallelism never change an id.
//!
//! - **Versioned Rules**: every issue carries a rule id, a severity fixed by
//!   the ruleset version, the row, column and value, and a suggestion where
//!   one can be derived.
//!
//! - **Gated Export**: a single blocker refuses the export.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cmmo::prelude::*;
//!
//! let registry = SchemaRegistry::builtin();
//! let template = registry.get("cosmx", "1.2")?;
//!
//! let table = parse_file("samples.csv", &IngestOptions::default())?;
//! let mapping = FieldMapping::new()
//!     .with("Specimen_ID", "Sample_Name")
//!     .with("Block_ID", "Block")
//!     .with("Slide_ID", "Slide_Barcode")
//!     .with("ROI_ID", "ROI")
//!     .with("Library_ID", "Library")
//!     .with("Run_ID", "Run")
//!     .with("Platform", "Platform")
//!     .confirm(&table, template)?;
//!
//! let dataset = harmonize(&table, &mapping, template, &HarmonizeOptions::default())?;
//! let outcome = validate(
//!     &dataset,
//!     &table,
//!     template,
//!     &Ruleset::latest(),
//!     &ValidationOptions::default(),
//! )?;
//! println!("{}", ValidationReport::new(&dataset, &outcome));
//!
//! if !outcome.is_blocked() {
//!     export_bundle(&dataset, &outcome, template, ManifestMeta::now())?
//!         .write_zip("samples.cmmo.zip")?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules, leaf to root:
//!
//! - [`ingest`]: CSV/TSV/XLSX parsing with encoding and delimiter detection
//! - [`schema`]: Versioned schema templates and the template registry
//! - [`vocabulary`]: Controlled vocabularies with synonym tables
//! - [`mapping`]: Draft and confirmed field mappings, advisory proposals
//! - [`harmonize`]: Normalization, canonical entities and the relationship graph
//! - [`validator`]: Versioned ruleset and ordered issue list
//! - [`export`]: Bundle artifacts, manifest, ZIP/directory output and verification
//! - [`pipeline`]: Stage-by-stage run binding the modules above
//!
//! ## Bundle Format
//!
//! | Artifact | Content |
//! |----------|---------|
//! | `canonical_<type>.csv` | One table per entity type |
//! | `cross_modal_join_index.csv` | Lineage tuples of canonical ids |
//! | `field_mapping.json` | Template reference and mapping |
//! | `validation_report.txt` | Human-readable report |
//! | `validation_issues.csv` | Machine-readable issue list |
//! | `manifest.json` | Versions, counts, SHA-256 hashes, bundle digest |

// Documentation lints
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod export;
pub mod harmonize;
pub mod ingest;
pub mod mapping;
pub mod pipeline;
pub mod schema;
pub mod validator;
pub mod vocabulary;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::export::{
        export_bundle, verify_bundle, Bundle, BundleVerification, ExportError, ExportManifest,
        ManifestMeta,
    };
    pub use crate::harmonize::{
        harmonize, CanonicalEntity, EntityRelationship, HarmonizationError, HarmonizationSummary,
        HarmonizeOptions, HarmonizedDataset,
    };
    pub use crate::ingest::{
        parse_bytes, parse_file, IngestLimits, IngestOptions, ParseError, RawTable, SourceFormat,
    };
    pub use crate::mapping::{
        propose_mapping, ConfirmedMapping, FieldMapping, MappingError, MappingProposal,
    };
    pub use crate::pipeline::{PipelineError, Stage, Uploaded, Validation};
    pub use crate::schema::{EntityType, SchemaRegistry, SchemaTemplate};
    pub use crate::validator::{
        validate, Ruleset, Severity, ValidationError, ValidationIssue, ValidationOptions,
        ValidationOutcome, ValidationReport,
    };
}
