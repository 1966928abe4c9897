use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

use super::{IssueCounts, Severity, ValidationIssue, ValidationOutcome};
use crate::harmonize::{EntityRelationship, HarmonizedDataset};
use crate::schema::EntityType;

/// Human-readable validation report for one run.
///
/// The plain [`Display`](fmt::Display) form carries no timestamp, so the same
/// run always renders the same text.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Template reference (`id@version`)
    pub template: String,
    /// Ruleset version applied
    pub ruleset_version: String,
    /// Data rows in the source table
    pub total_rows: usize,
    /// Entity counts for the template's entity types
    pub entity_counts: Vec<(EntityType, usize)>,
    /// Relationship states
    pub relationships: Vec<EntityRelationship>,
    /// Issues in report order
    pub issues: Vec<ValidationIssue>,
    /// Totals by severity
    pub counts: IssueCounts,
}

fn relationship_problems(relationship: &EntityRelationship) -> String {
    format!(
        "{} dangling reference(s), {} multi-parent child(ren), {} orphan(s)",
        relationship.dangling, relationship.conflicts, relationship.orphans
    )
}

fn location(issue: &ValidationIssue) -> String {
    match (issue.row, &issue.column) {
        (Some(row), Some(column)) => format!("row {}, {}", row, column),
        (Some(row), None) => format!("row {}", row),
        (None, Some(column)) => column.clone(),
        (None, None) => "mapping".to_string(),
    }
}

impl ValidationReport {
    /// Build the report for a validated dataset
    pub fn new(dataset: &HarmonizedDataset, outcome: &ValidationOutcome) -> Self {
        Self {
            template: format!("{}@{}", dataset.template_id(), dataset.template_version()),
            ruleset_version: outcome.ruleset_version().to_string(),
            total_rows: dataset.total_rows(),
            entity_counts: dataset
                .entity_types()
                .map(|t| (t, dataset.entities(t).len()))
                .collect(),
            relationships: dataset.relationships().to_vec(),
            issues: outcome.issues().to_vec(),
            counts: outcome.counts(),
        }
    }

    /// Check if any blocker exists
    pub fn has_blockers(&self) -> bool {
        self.counts.blockers > 0
    }

    /// Check if any warning exists
    pub fn has_warnings(&self) -> bool {
        self.counts.warnings > 0
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");
            static INFO: Emoji<'_, '_> = Emoji("ℹ", "[INFO]");

            let mut output = String::new();

            output.push_str(&format!("{}\n", style("CMMO Validation Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("======================").cyan()));
            output.push_str(&format!("{}: {}\n", style("Template").bold(), self.template));
            output.push_str(&format!("{}: {}\n", style("Ruleset").bold(), self.ruleset_version));
            output.push_str(&format!("{}: {}\n\n", style("Rows").bold(), self.total_rows));

            output.push_str(&format!("{}\n", style("Entities").bold()));
            for (entity_type, count) in &self.entity_counts {
                output.push_str(&format!("  {}: {}\n", entity_type, count));
            }

            output.push_str(&format!("\n{}\n", style("Relationships").bold()));
            for relationship in &self.relationships {
                let name = format!(
                    "{} {} {}",
                    relationship.from, relationship.cardinality, relationship.to
                );
                if relationship.valid {
                    output.push_str(&format!(
                        "[{}] {} ({} edges)\n",
                        OK,
                        style(name).green(),
                        relationship.edges
                    ));
                } else {
                    output.push_str(&format!(
                        "[{}] {} - {}: {}\n",
                        FAIL,
                        style(name).red(),
                        style("INVALID").red().bold(),
                        relationship_problems(relationship)
                    ));
                }
            }

            output.push_str(&format!("\n{}\n", style("Issues").bold()));
            for issue in &self.issues {
                let (symbol, color_fn): (_, fn(&str) -> console::StyledObject<&str>) =
                    match issue.severity {
                        Severity::Blocker => (FAIL, |s| style(s).red()),
                        Severity::Warning => (WARN, |s| style(s).yellow()),
                        Severity::Info => (INFO, |s| style(s).cyan()),
                    };
                output.push_str(&format!(
                    "[{}] {} {} ({}): {}\n",
                    symbol,
                    color_fn(&issue.id),
                    issue.rule,
                    location(issue),
                    issue.message
                ));
                if let Some(suggestion) = &issue.suggestion {
                    output.push_str(&format!("      {}: {}\n", style("suggestion").dim(), suggestion));
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} blockers, {} warnings, {} info\n",
                style("Summary").bold(),
                style(self.counts.blockers).red(),
                style(self.counts.warnings).yellow(),
                style(self.counts.info).cyan()
            ));

            output.push('\n');
            if self.has_blockers() {
                output.push_str(&format!("{}\n", style("Validation BLOCKED").red().bold()));
            } else if self.has_warnings() {
                output.push_str(&format!("{}\n", style("Validation PASSED with warnings").yellow().bold()));
            } else {
                output.push_str(&format!("{}\n", style("Validation PASSED").green().bold()));
            }

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CMMO Validation Report")?;
        writeln!(f, "======================")?;
        writeln!(f, "Template: {}", self.template)?;
        writeln!(f, "Ruleset: {}", self.ruleset_version)?;
        writeln!(f, "Rows: {}", self.total_rows)?;
        writeln!(f)?;

        writeln!(f, "Entities")?;
        for (entity_type, count) in &self.entity_counts {
            writeln!(f, "  {}: {}", entity_type, count)?;
        }
        writeln!(f)?;

        writeln!(f, "Relationships")?;
        for relationship in &self.relationships {
            let name = format!(
                "{} {} {}",
                relationship.from, relationship.cardinality, relationship.to
            );
            if relationship.valid {
                writeln!(f, "[✓] {} ({} edges)", name, relationship.edges)?;
            } else {
                writeln!(f, "[✗] {} - INVALID: {}", name, relationship_problems(relationship))?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Issues")?;
        for issue in &self.issues {
            let symbol = match issue.severity {
                Severity::Blocker => "✗",
                Severity::Warning => "⚠",
                Severity::Info => "ℹ",
            };
            writeln!(
                f,
                "[{}] {} {} ({}): {}",
                symbol,
                issue.id,
                issue.rule,
                location(issue),
                issue.message
            )?;
            if let Some(suggestion) = &issue.suggestion {
                writeln!(f, "      suggestion: {}", suggestion)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} blockers, {} warnings, {} info",
            self.counts.blockers, self.counts.warnings, self.counts.info
        )?;

        writeln!(f)?;
        if self.has_blockers() {
            writeln!(f, "Validation BLOCKED")?;
        } else if self.has_warnings() {
            writeln!(f, "Validation PASSED with warnings")?;
        } else {
            writeln!(f, "Validation PASSED")?;
        }

        Ok(())
    }
}
