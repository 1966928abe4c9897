//! Per-cell value normalization.
//!
//! Normalization is idempotent: feeding a normalized value back through
//! [`normalize_value`] returns it unchanged with no adjustments.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::schema::{FieldSpec, FieldType};

/// Date formats accepted on input, tried in order. The first is canonical.
pub const ACCEPTED_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d-%b-%Y",
];

/// ISO-8601 calendar date format written to harmonized output
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// An automatic correction applied to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Leading or trailing whitespace removed
    Trimmed,
    /// Replaced through the synonym table
    SynonymResolved,
    /// Case changed by the case rule or a case-insensitive vocabulary match
    CaseCoerced,
    /// Non-ISO date rewritten as ISO-8601
    DateReformatted,
}

/// Why a value could not be normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Defect {
    /// Empty or whitespace-only
    Missing,
    /// Does not match the field pattern
    PatternMismatch,
    /// Not a signed integer
    NotInteger,
    /// Not a date in any accepted format
    InvalidDate,
    /// Not in the vocabulary and not resolvable through synonyms
    NotInVocabulary,
}

/// Outcome of normalizing one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    /// The normalized value; `None` when the cell is empty or defective
    pub value: Option<String>,
    /// The trimmed input
    pub trimmed: String,
    /// Corrections applied, in application order
    pub adjustments: Vec<Adjustment>,
    /// Reason the value was rejected
    pub defect: Option<Defect>,
}

impl NormalizedValue {
    fn rejected(trimmed: String, adjustments: Vec<Adjustment>, defect: Defect) -> Self {
        Self {
            value: None,
            trimmed,
            adjustments,
            defect: Some(defect),
        }
    }

    /// Whether the cell produced a usable value
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}

/// Parse a date in any accepted format and return it as ISO-8601.
/// Years outside 1900..=2100 are rejected.
pub fn parse_date(value: &str) -> Option<String> {
    ACCEPTED_DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .filter(|date| (1900..=2100).contains(&date.year()))
            .map(|date| date.format(ISO_DATE_FORMAT).to_string())
    })
}

/// Synonym target for `value`, compared case-insensitively
fn folded_synonym<'a>(field: &'a FieldSpec, value: &str) -> Option<&'a String> {
    let folded = value.to_lowercase();
    field
        .synonyms
        .iter()
        .find(|(synonym, _)| synonym.to_lowercase() == folded)
        .map(|(_, target)| target)
}

fn resolve_enum(field: &FieldSpec, value: &str) -> Result<(String, Option<Adjustment>), Defect> {
    let vocabulary = field.vocabulary.as_deref().unwrap_or_default();
    if vocabulary.iter().any(|v| v == value) {
        return Ok((value.to_string(), None));
    }
    if let Some(target) = field.synonyms.get(value) {
        return Ok((target.clone(), Some(Adjustment::SynonymResolved)));
    }
    let folded = value.to_lowercase();
    if let Some(v) = vocabulary.iter().find(|v| v.to_lowercase() == folded) {
        return Ok((v.clone(), Some(Adjustment::CaseCoerced)));
    }
    if let Some(target) = folded_synonym(field, value) {
        return Ok((target.clone(), Some(Adjustment::SynonymResolved)));
    }
    Err(Defect::NotInVocabulary)
}

/// Normalize one raw cell against its field definition.
///
/// Steps: trim, type-specific normalization (vocabulary and synonyms,
/// date reformatting, integer parsing, synonyms then case rule for free
/// text), then the field pattern.
pub fn normalize_value(field: &FieldSpec, pattern: Option<&Regex>, raw: &str) -> NormalizedValue {
    let trimmed = raw.trim().to_string();
    let mut adjustments = Vec::new();
    if trimmed.is_empty() {
        return NormalizedValue::rejected(trimmed, adjustments, Defect::Missing);
    }
    if trimmed.len() != raw.len() {
        adjustments.push(Adjustment::Trimmed);
    }

    let value = match field.field_type {
        FieldType::Enum => match resolve_enum(field, &trimmed) {
            Ok((value, adjustment)) => {
                adjustments.extend(adjustment);
                value
            }
            Err(defect) => return NormalizedValue::rejected(trimmed, adjustments, defect),
        },
        FieldType::Date => match parse_date(&trimmed) {
            Some(iso) => {
                if iso != trimmed {
                    adjustments.push(Adjustment::DateReformatted);
                }
                iso
            }
            None => {
                return NormalizedValue::rejected(trimmed, adjustments, Defect::InvalidDate)
            }
        },
        FieldType::Int => {
            if trimmed.parse::<i64>().is_err() {
                return NormalizedValue::rejected(trimmed, adjustments, Defect::NotInteger);
            }
            trimmed.clone()
        }
        FieldType::String => {
            let resolved = field
                .synonyms
                .get(&trimmed)
                .or_else(|| folded_synonym(field, &trimmed));
            let base = match resolved {
                Some(target) => {
                    adjustments.push(Adjustment::SynonymResolved);
                    target.as_str()
                }
                None => trimmed.as_str(),
            };
            let coerced = field.case.apply(base);
            if coerced != base {
                adjustments.push(Adjustment::CaseCoerced);
            }
            coerced
        }
    };

    if let Some(re) = pattern {
        if !re.is_match(&value) {
            return NormalizedValue::rejected(trimmed, adjustments, Defect::PatternMismatch);
        }
    }

    NormalizedValue {
        value: Some(value),
        trimmed,
        adjustments,
        defect: None,
    }
}
