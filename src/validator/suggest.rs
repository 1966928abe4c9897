//! Suggested corrections for blocker issues.

use std::collections::BTreeMap;

use crate::harmonize::normalize_value;
use crate::ingest::RawTable;
use crate::schema::{CompiledTemplate, FieldSpec};

/// Minimum Jaro-Winkler similarity for a vocabulary suggestion
pub const VOCABULARY_SUGGESTION_THRESHOLD: f64 = 0.85;

/// Most frequent year among the conforming values of a column.
///
/// `None` when the field has no year segment, no value conforms, or two
/// years tie for most frequent.
pub(crate) fn infer_year(
    compiled: &CompiledTemplate<'_>,
    field_index: usize,
    table: &RawTable,
    column_index: usize,
) -> Option<i32> {
    let field = compiled.template().fields.get(field_index)?;
    let format = field.id_format.as_ref().filter(|f| f.year)?;

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for (_, row) in table.rows() {
        let raw = row.get(column_index).map(String::as_str).unwrap_or("");
        let normalized = normalize_value(field, compiled.pattern(field_index), raw);
        if let Some(year) = normalized.value.as_deref().and_then(|v| format.year_of(v)) {
            *counts.entry(year).or_default() += 1;
        }
    }

    let best = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|&(_, &n)| n == best);
    match (leaders.next(), leaders.next()) {
        (Some((&year, _)), None) => Some(year),
        _ => None,
    }
}

/// Suggestion for a value that does not match the field pattern.
///
/// With an identifier format the digits are rebuilt into a conforming id;
/// otherwise (or when that fails) the expected format is named.
pub(crate) fn format_suggestion(
    compiled: &CompiledTemplate<'_>,
    field_index: usize,
    trimmed: &str,
    year: Option<i32>,
) -> Option<String> {
    let field = compiled.template().fields.get(field_index)?;
    let hint = field.format_hint()?;
    let rebuilt = field
        .id_format
        .as_ref()
        .and_then(|format| format.reformat(&field.case.apply(trimmed), year))
        .filter(|candidate| compiled.conforms(field_index, candidate));
    Some(rebuilt.unwrap_or_else(|| format!("Reformat to pattern {}", hint)))
}

/// Closest vocabulary term to an unresolvable value
pub(crate) fn nearest_term(field: &FieldSpec, value: &str) -> Option<String> {
    let folded = value.to_lowercase();
    field
        .vocabulary
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|term| (strsim::jaro_winkler(&folded, &term.to_lowercase()), term))
        .filter(|(score, _)| *score >= VOCABULARY_SUGGESTION_THRESHOLD)
        .fold(None, |best: Option<(f64, &String)>, candidate| match best {
            Some(b) if b.0 >= candidate.0 => Some(b),
            _ => Some(candidate),
        })
        .map(|(_, term)| term.clone())
}
