//! # Schema Registry
//!
//! Versioned schema templates describe the canonical fields of one platform's
//! metadata sheet, the entity each field belongs to, and the relationships
//! between entity types. Selecting a template id and version fixes every
//! downstream normalization and validation decision.
//!
//! ## Built-in Templates
//!
//! | Id | Version | Platform |
//! |----|---------|----------|
//! | `cosmx` | 1.2 | NanoString CosMx SMI |
//! | `geomx` | 2.0 | NanoString GeoMx DSP |
//! | `visium-hd` | 1.5 | 10x Genomics Visium HD |
//! | `xenium` | 1.0 | 10x Genomics Xenium |
//! | `illumina-run` | 3.0 | Illumina sequencing run sheet |
//!
//! ## Entity Hierarchy
//!
//! ```text
//! Specimen ─has_many─> Block ─has_many─> Slide ─has_many─> ROI ─has_many─> Library
//!                                                                Run <─belongs_to─┘
//! ```
//!
//! Templates are validated on registration and immutable afterwards. The
//! registry itself is read-only once built and can be shared across runs.

mod builtin;
mod error;
mod registry;
mod template;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::SchemaError;
pub use registry::SchemaRegistry;
pub use template::{
    Cardinality, CaseRule, CompiledTemplate, FieldBinding, FieldSpec, FieldType, IdFormat,
    RelationshipSpec, SchemaTemplate, TemplateSummary,
};

/// Canonical entity types, in hierarchy order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Source specimen (patient sample)
    Specimen,
    /// Tissue block cut from a specimen
    Block,
    /// Slide sectioned from a block
    Slide,
    /// Region of interest on a slide
    #[serde(rename = "ROI")]
    Roi,
    /// Sequencing library
    Library,
    /// Sequencing or imaging run
    Run,
}

impl EntityType {
    /// All entity types in hierarchy order
    pub const ALL: [EntityType; 6] = [
        EntityType::Specimen,
        EntityType::Block,
        EntityType::Slide,
        EntityType::Roi,
        EntityType::Library,
        EntityType::Run,
    ];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            EntityType::Specimen => "Specimen",
            EntityType::Block => "Block",
            EntityType::Slide => "Slide",
            EntityType::Roi => "ROI",
            EntityType::Library => "Library",
            EntityType::Run => "Run",
        }
    }

    /// Prefix of canonical ids (`CM-{PREFIX}-{ordinal}`)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityType::Specimen => "SPC",
            EntityType::Block => "BLK",
            EntityType::Slide => "SLD",
            EntityType::Roi => "ROI",
            EntityType::Library => "LIB",
            EntityType::Run => "RUN",
        }
    }

    /// Lower-case name used in file and column names
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityType::Specimen => "specimen",
            EntityType::Block => "block",
            EntityType::Slide => "slide",
            EntityType::Roi => "roi",
            EntityType::Library => "library",
            EntityType::Run => "run",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
