use std::fmt;

use serde::Serialize;

use super::normalize::{Adjustment, Defect};
use crate::schema::EntityType;

/// What harmonization observed about one cell or one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// Required field empty
    MissingRequired,
    /// Optional (mapped) field empty
    MissingOptional,
    /// Value does not match the field pattern
    PatternMismatch,
    /// Integer field holds something else
    NotInteger,
    /// Date field not parseable
    InvalidDate,
    /// Enum value not in the vocabulary and not resolvable
    NotInVocabulary,
    /// Leading or trailing whitespace trimmed
    Whitespace,
    /// Enum value resolved through the synonym table
    SynonymResolved,
    /// Case coerced
    CaseCoerced,
    /// Date rewritten as ISO-8601
    DateReformatted,
    /// Conforming foreign key with no parent entity
    DanglingReference {
        /// Parent entity type the key should resolve to
        parent: EntityType,
    },
    /// Child linked to more than one parent instance
    MultipleParents {
        /// Child entity type
        child: EntityType,
        /// Parent entity type
        parent: EntityType,
        /// Distinct parent natural keys, sorted
        parents: Vec<String>,
    },
    /// Child never linked to a parent
    Orphan {
        /// Child entity type
        child: EntityType,
        /// Parent entity type
        parent: EntityType,
    },
    /// Later row carries a different value for an attribute already set
    AttributeConflict {
        /// Entity type owning the attribute
        entity: EntityType,
        /// Natural key of the entity
        natural_key: String,
        /// Value kept (first in file order)
        kept: String,
    },
}

impl FindingKind {
    pub(crate) fn from_defect(defect: Defect, required: bool) -> Self {
        match defect {
            Defect::Missing if required => FindingKind::MissingRequired,
            Defect::Missing => FindingKind::MissingOptional,
            Defect::PatternMismatch => FindingKind::PatternMismatch,
            Defect::NotInteger => FindingKind::NotInteger,
            Defect::InvalidDate => FindingKind::InvalidDate,
            Defect::NotInVocabulary => FindingKind::NotInVocabulary,
        }
    }

    pub(crate) fn from_adjustment(adjustment: Adjustment) -> Self {
        match adjustment {
            Adjustment::Trimmed => FindingKind::Whitespace,
            Adjustment::SynonymResolved => FindingKind::SynonymResolved,
            Adjustment::CaseCoerced => FindingKind::CaseCoerced,
            Adjustment::DateReformatted => FindingKind::DateReformatted,
        }
    }
}

/// A located observation, raw material for validation issues
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// What was observed
    #[serde(flatten)]
    pub kind: FindingKind,
    /// Canonical field the observation is about
    pub field: String,
    /// 1-based data row number
    pub row: usize,
    /// Raw cell value
    pub value: String,
    /// Normalized (corrected) value, when there is one
    pub normalized: Option<String>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} {}: {:?} ({:?})", self.row, self.field, self.value, self.kind)
    }
}
