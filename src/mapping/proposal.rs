use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use super::FieldMapping;
use crate::schema::SchemaTemplate;

/// Minimum confidence for a candidate to be proposed
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Shorter name tokens (`id`, `no`) say nothing about what a column holds
const MIN_TOKEN_LEN: usize = 3;

/// An advisory source column → field pairing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingCandidate {
    /// Source column name
    pub source: String,
    /// Canonical field name
    pub target: String,
    /// Similarity in `[0, 1]`; `1.0` for an exact name or alias match
    pub confidence: f64,
}

/// Advisory mapping suggestions. Never used for harmonization directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingProposal {
    /// Accepted one-to-one candidates, in template field order
    pub candidates: Vec<MappingCandidate>,
    /// Template fields without a candidate
    pub unmatched_fields: Vec<String>,
    /// Source columns without a candidate
    pub unmatched_columns: Vec<String>,
    /// Threshold the proposal was computed with
    pub threshold: f64,
}

impl MappingProposal {
    /// Pre-fill a draft mapping: proposed fields mapped, the rest unmapped
    pub fn to_draft(&self) -> FieldMapping {
        let mut draft = FieldMapping::new();
        for candidate in &self.candidates {
            draft.map(&candidate.target, &candidate.source);
        }
        for field in &self.unmatched_fields {
            draft.unmap(field);
        }
        draft
    }
}

/// Lower-case and drop everything but letters and digits
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lower-cased words of a name, split at separators and camelCase humps
pub(super) fn name_tokens(name: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() || (c.is_uppercase() && prev_lower) {
            if current.chars().count() >= MIN_TOKEN_LEN {
                tokens.insert(std::mem::take(&mut current));
            }
            current.clear();
        }
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    if current.chars().count() >= MIN_TOKEN_LEN {
        tokens.insert(current);
    }
    tokens
}

/// A field name or alias, in both comparison forms
struct Name {
    normalized: String,
    tokens: BTreeSet<String>,
}

impl Name {
    fn new(name: &str) -> Self {
        Name {
            normalized: normalize_name(name),
            tokens: name_tokens(name),
        }
    }
}

/// Best score of `column` against any of `names`.
///
/// An exact normalized match scores 1.0. Otherwise the pair must share a
/// word before its Jaro-Winkler similarity counts at all.
fn similarity(column: &Name, names: &[Name]) -> f64 {
    names
        .iter()
        .map(|name| {
            if name.normalized == column.normalized {
                1.0
            } else if name.tokens.is_disjoint(&column.tokens) {
                0.0
            } else {
                strsim::jaro_winkler(&column.normalized, &name.normalized)
            }
        })
        .fold(0.0, f64::max)
}

/// Propose a mapping with the default threshold
pub fn propose_mapping(columns: &[String], template: &SchemaTemplate) -> MappingProposal {
    propose_mapping_with_threshold(columns, template, DEFAULT_CONFIDENCE_THRESHOLD)
}

/// Propose a one-to-one mapping by name similarity.
///
/// Every (column, field) pair is scored with Jaro-Winkler over normalized
/// names, taking the best of the field name and its aliases. Names that
/// share no word score zero unless they normalize to the same string. Pairs are
/// assigned greedily by descending confidence; ties go to the earlier
/// template field, then the earlier column.
pub fn propose_mapping_with_threshold(
    columns: &[String],
    template: &SchemaTemplate,
    threshold: f64,
) -> MappingProposal {
    let normalized_columns: Vec<Name> = columns.iter().map(|c| Name::new(c)).collect();

    let mut scored: Vec<(f64, usize, usize)> = Vec::new();
    for (field_index, field) in template.fields.iter().enumerate() {
        let names: Vec<Name> = std::iter::once(&field.name)
            .chain(field.aliases.iter())
            .map(|n| Name::new(n))
            .collect();
        for (column_index, column) in normalized_columns.iter().enumerate() {
            let confidence = similarity(column, &names);
            if confidence >= threshold {
                scored.push((confidence, field_index, column_index));
            }
        }
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut taken_fields = BTreeSet::new();
    let mut taken_columns = BTreeSet::new();
    let mut accepted: Vec<(usize, MappingCandidate)> = Vec::new();
    for (confidence, field_index, column_index) in scored {
        if taken_fields.contains(&field_index) || taken_columns.contains(&column_index) {
            continue;
        }
        taken_fields.insert(field_index);
        taken_columns.insert(column_index);
        accepted.push((
            field_index,
            MappingCandidate {
                source: columns[column_index].clone(),
                target: template.fields[field_index].name.clone(),
                confidence,
            },
        ));
    }
    accepted.sort_by_key(|(field_index, _)| *field_index);

    let unmatched_fields = template
        .fields
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken_fields.contains(i))
        .map(|(_, f)| f.name.clone())
        .collect();
    let unmatched_columns = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken_columns.contains(i))
        .map(|(_, c)| c.clone())
        .collect();

    debug!(
        "Proposed {} of {} field(s) for {}",
        accepted.len(),
        template.fields.len(),
        template.reference()
    );

    MappingProposal {
        candidates: accepted.into_iter().map(|(_, c)| c).collect(),
        unmatched_fields,
        unmatched_columns,
        threshold,
    }
}
