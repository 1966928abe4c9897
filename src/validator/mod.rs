//! # Validation Engine
//!
//! Runs a versioned, deterministic ruleset over a harmonized dataset and
//! produces an ordered, severity-tagged issue list.
//!
//! ## Ruleset 1.0.0
//!
//! | Rule | Severity | Condition |
//! |------|----------|-----------|
//! | `REQUIRED_FIELD_001` | blocker | required field empty |
//! | `FORMAT_001` | blocker | value does not match the field pattern |
//! | `FORMAT_002` | blocker | integer field not an integer |
//! | `FORMAT_003` | blocker | date not in any accepted format |
//! | `REF_INTEGRITY_001` | blocker | foreign key does not resolve |
//! | `REF_INTEGRITY_002` | blocker | child linked to more than one parent |
//! | `REF_INTEGRITY_003` | blocker | child never linked to a parent |
//! | `ENUM_VALIDATION_001` | warning | value resolved via synonym table |
//! | `ENUM_VALIDATION_002` | blocker | value not in vocabulary |
//! | `DATE_FORMAT_001` | warning | non-ISO date reformatted |
//! | `WHITESPACE_001` | warning | leading/trailing whitespace |
//! | `CASE_NORMALIZATION_001` | warning | case coerced |
//! | `ATTRIBUTE_CONFLICT_001` | warning | conflicting attribute value ignored |
//! | `OPTIONAL_FIELD_001` | info | optional field empty |
//! | `OPTIONAL_FIELD_002` | info | optional field not mapped |
//!
//! ## Ordering
//!
//! Issues are sorted by rule category (in the table order above), then row
//! (column-level issues first), then source column, then rule id, then
//! value. Ids are assigned after sorting: `B001...` for blockers, `W001...`
//! for warnings and `I001...` for infos. The same input always yields the
//! same list.

mod error;
mod report;
mod rules;
mod suggest;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::harmonize::{Finding, FindingKind, HarmonizedDataset};
use crate::ingest::RawTable;
use crate::schema::{CompiledTemplate, SchemaTemplate};

pub use error::ValidationError;
pub use report::ValidationReport;
pub use rules::{Rule, RuleCategory, RuleId, Ruleset, Severity, RULESET_VERSION};
pub use suggest::VOCABULARY_SUGGESTION_THRESHOLD;

/// Validation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Year used to rebuild identifiers in `FORMAT_001` suggestions.
    /// When absent the year is inferred per column.
    pub reference_year: Option<i32>,
}

impl ValidationOptions {
    /// Set the reference year
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }
}

/// One validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// `B001`, `W003`, `I012`, ...
    pub id: String,
    /// Severity fixed by the ruleset
    pub severity: Severity,
    /// Rule that raised the issue
    pub rule: RuleId,
    /// Operator-facing description
    pub message: String,
    /// 1-based data row; `None` for column-level issues
    pub row: Option<usize>,
    /// Source column
    pub column: Option<String>,
    /// Offending raw value
    pub value: Option<String>,
    /// Corrected value or fix instruction
    pub suggestion: Option<String>,
}

/// Issue totals by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    /// Blocker count
    pub blockers: usize,
    /// Warning count
    pub warnings: usize,
    /// Info count
    pub info: usize,
}

impl IssueCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Blocker => self.blockers += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.info += 1,
        }
    }

    /// Total issues
    pub fn total(&self) -> usize {
        self.blockers + self.warnings + self.info
    }
}

/// Result of validating one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    ruleset_version: String,
    issues: Vec<ValidationIssue>,
    counts: IssueCounts,
}

impl ValidationOutcome {
    /// Version of the ruleset applied
    pub fn ruleset_version(&self) -> &str {
        &self.ruleset_version
    }

    /// Issues in report order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Totals by severity
    pub fn counts(&self) -> IssueCounts {
        self.counts
    }

    /// Whether any blocker exists
    pub fn is_blocked(&self) -> bool {
        self.counts.blockers > 0
    }

    /// Issues of one severity, in report order
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Issues raised by one rule, in report order
    pub fn with_rule(&self, rule: RuleId) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.rule == rule)
    }
}

/// An issue before sorting and id assignment
struct Draft {
    rule: RuleId,
    row: Option<usize>,
    column_index: Option<usize>,
    field_index: usize,
    issue: ValidationIssue,
}

impl Draft {
    fn sort_key(&self) -> (usize, Option<usize>, Option<usize>, RuleId, &Option<String>, usize) {
        (
            self.rule.category() as usize,
            self.row,
            self.column_index,
            self.rule,
            &self.issue.value,
            self.field_index,
        )
    }
}

struct Context<'a> {
    dataset: &'a HarmonizedDataset,
    table: &'a RawTable,
    compiled: CompiledTemplate<'a>,
    ruleset: &'a Ruleset,
    options: &'a ValidationOptions,
    years: BTreeMap<usize, Option<i32>>,
}

impl Context<'_> {
    fn year_for(&mut self, field_index: usize, column_index: usize) -> Option<i32> {
        if let Some(year) = self.options.reference_year {
            return Some(year);
        }
        let (compiled, table) = (&self.compiled, self.table);
        *self
            .years
            .entry(field_index)
            .or_insert_with(|| suggest::infer_year(compiled, field_index, table, column_index))
    }

    fn draft(&mut self, finding: &Finding) -> Option<Draft> {
        let template = self.compiled.template();
        let dataset = self.dataset;
        let field_index = template.field_index(&finding.field)?;
        let field = &template.fields[field_index];
        let binding = dataset.mapping().binding(&finding.field);
        let value = &finding.value;
        let normalized = finding.normalized.clone();

        let (rule, message, suggestion) = match &finding.kind {
            FindingKind::MissingRequired => (
                RuleId::RequiredField001,
                format!("Required field '{}' is empty", field.name),
                None,
            ),
            FindingKind::MissingOptional => (
                RuleId::OptionalField001,
                format!("Optional field '{}' is empty", field.name),
                None,
            ),
            FindingKind::PatternMismatch => {
                let year = match (field.id_format.as_ref(), binding) {
                    (Some(format), Some(binding)) if format.year => {
                        self.year_for(field_index, binding.column_index)
                    }
                    _ => None,
                };
                let hint = field.format_hint().unwrap_or_default();
                (
                    RuleId::Format001,
                    format!("Value '{}' does not match format {}", value.trim(), hint),
                    suggest::format_suggestion(&self.compiled, field_index, value.trim(), year),
                )
            }
            FindingKind::NotInteger => (
                RuleId::Format002,
                format!("Value '{}' is not an integer", value.trim()),
                None,
            ),
            FindingKind::InvalidDate => (
                RuleId::Format003,
                format!("Value '{}' is not a recognized date", value.trim()),
                Some("Use YYYY-MM-DD".to_string()),
            ),
            FindingKind::DanglingReference { parent } => (
                RuleId::RefIntegrity001,
                format!(
                    "{} '{}' does not exist",
                    parent,
                    normalized.as_deref().unwrap_or(value)
                ),
                None,
            ),
            FindingKind::MultipleParents {
                child,
                parent,
                parents,
            } => (
                RuleId::RefIntegrity002,
                format!(
                    "{} is linked to {} {} entities: {}",
                    child,
                    parents.len(),
                    parent,
                    parents.join(", ")
                ),
                None,
            ),
            FindingKind::Orphan { child, parent } => (
                RuleId::RefIntegrity003,
                format!("{} has no {}", child, parent),
                None,
            ),
            FindingKind::SynonymResolved => (
                RuleId::EnumValidation001,
                format!(
                    "Value '{}' resolved to '{}' via synonym table",
                    value.trim(),
                    normalized.as_deref().unwrap_or_default()
                ),
                normalized,
            ),
            FindingKind::NotInVocabulary => {
                let allowed = field.vocabulary.as_deref().unwrap_or_default().join(", ");
                (
                    RuleId::EnumValidation002,
                    format!(
                        "Value '{}' is not a valid {} (allowed: {})",
                        value.trim(),
                        field.name,
                        allowed
                    ),
                    suggest::nearest_term(field, value.trim()),
                )
            }
            FindingKind::DateReformatted => (
                RuleId::DateFormat001,
                format!("Date '{}' is not ISO-8601", value.trim()),
                normalized,
            ),
            FindingKind::Whitespace => (
                RuleId::Whitespace001,
                format!("Value '{}' has leading or trailing whitespace", value),
                normalized,
            ),
            FindingKind::CaseCoerced => (
                RuleId::CaseNormalization001,
                format!("Value '{}' has non-canonical case", value.trim()),
                normalized,
            ),
            FindingKind::AttributeConflict {
                entity,
                natural_key,
                kept,
            } => (
                RuleId::AttributeConflict001,
                format!(
                    "{} '{}' already has {} '{}'; '{}' ignored",
                    entity,
                    natural_key,
                    field.name,
                    kept,
                    normalized.as_deref().unwrap_or(value)
                ),
                Some(kept.clone()),
            ),
        };

        let severity = self.ruleset.severity(rule);
        Some(Draft {
            rule,
            row: Some(finding.row),
            column_index: binding.map(|b| b.column_index),
            field_index,
            issue: ValidationIssue {
                id: String::new(),
                severity,
                rule,
                message,
                row: Some(finding.row),
                column: binding.map(|b| b.column.clone()),
                value: (!value.is_empty()).then(|| value.clone()),
                suggestion,
            },
        })
    }
}

/// Validate a harmonized dataset.
///
/// `table` must be the table the dataset was harmonized from; it is used for
/// column-wide context such as year inference.
pub fn validate(
    dataset: &HarmonizedDataset,
    table: &RawTable,
    template: &SchemaTemplate,
    ruleset: &Ruleset,
    options: &ValidationOptions,
) -> Result<ValidationOutcome, ValidationError> {
    if dataset.template_id() != template.id || dataset.template_version() != template.version {
        return Err(ValidationError::TemplateMismatch {
            expected: template.reference(),
            found: format!("{}@{}", dataset.template_id(), dataset.template_version()),
        });
    }
    if table.row_count() != dataset.total_rows() {
        return Err(ValidationError::TableMismatch {
            expected: dataset.total_rows(),
            found: table.row_count(),
        });
    }

    let mut context = Context {
        dataset,
        table,
        compiled: template.compile()?,
        ruleset,
        options,
        years: BTreeMap::new(),
    };

    let mut drafts: Vec<Draft> = dataset
        .findings()
        .iter()
        .filter_map(|finding| context.draft(finding))
        .collect();

    for field in dataset.mapping().unmapped_fields() {
        let Some(field_index) = template.field_index(field) else {
            continue;
        };
        let rule = RuleId::OptionalField002;
        drafts.push(Draft {
            rule,
            row: None,
            column_index: None,
            field_index,
            issue: ValidationIssue {
                id: String::new(),
                severity: ruleset.severity(rule),
                rule,
                message: format!("Optional field '{}' is not mapped", field),
                row: None,
                column: None,
                value: None,
                suggestion: None,
            },
        });
    }

    drafts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut counts = IssueCounts::default();
    let mut ordinals: BTreeMap<Severity, usize> = BTreeMap::new();
    let issues: Vec<ValidationIssue> = drafts
        .into_iter()
        .map(|draft| {
            let mut issue = draft.issue;
            let ordinal = ordinals.entry(issue.severity).or_default();
            *ordinal += 1;
            issue.id = format!("{}{:03}", issue.severity.id_prefix(), ordinal);
            counts.add(issue.severity);
            issue
        })
        .collect();

    info!(
        "Validated {} against ruleset {}: {} blocker(s), {} warning(s), {} info",
        template.reference(),
        ruleset.version(),
        counts.blockers,
        counts.warnings,
        counts.info
    );
    if counts.blockers > 0 {
        warn!("Run is blocked by {} blocker issue(s)", counts.blockers);
    }

    Ok(ValidationOutcome {
        ruleset_version: ruleset.version().to_string(),
        issues,
        counts,
    })
}
