use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::ValidationError;

/// Version of the only ruleset shipped with this build
pub const RULESET_VERSION: &str = "1.0.0";

/// Issue severity. Only blockers prevent export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents export
    Blocker,
    /// Auto-correctable deviation
    Warning,
    /// Purely informational
    Info,
}

impl Severity {
    /// Prefix of issue ids (`B001`, `W001`, `I001`)
    pub fn id_prefix(&self) -> char {
        match self {
            Severity::Blocker => 'B',
            Severity::Warning => 'W',
            Severity::Info => 'I',
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Blocker => write!(f, "blocker"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Rule categories in evaluation (and report) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleCategory {
    /// `REQUIRED_FIELD_*`
    RequiredField,
    /// `FORMAT_*`
    Format,
    /// `REF_INTEGRITY_*`
    RefIntegrity,
    /// `ENUM_VALIDATION_*`
    EnumValidation,
    /// `DATE_FORMAT_*`
    DateFormat,
    /// `WHITESPACE_*`
    Whitespace,
    /// `CASE_NORMALIZATION_*`
    CaseNormalization,
    /// `ATTRIBUTE_CONFLICT_*`
    AttributeConflict,
    /// `OPTIONAL_FIELD_*`
    OptionalField,
}

/// Identifier of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    /// Required field empty
    RequiredField001,
    /// Value does not match the field pattern
    Format001,
    /// Integer field not an integer
    Format002,
    /// Date not parseable
    Format003,
    /// Foreign key does not resolve
    RefIntegrity001,
    /// Child linked to more than one parent
    RefIntegrity002,
    /// Child never linked to a parent
    RefIntegrity003,
    /// Value resolved through the synonym table
    EnumValidation001,
    /// Value not in the vocabulary
    EnumValidation002,
    /// Non-ISO date reformatted
    DateFormat001,
    /// Leading or trailing whitespace
    Whitespace001,
    /// Case coerced
    CaseNormalization001,
    /// Conflicting attribute values for one entity
    AttributeConflict001,
    /// Optional field empty
    OptionalField001,
    /// Optional field not mapped
    OptionalField002,
}

impl RuleId {
    /// Every rule id, in report order
    pub const ALL: [RuleId; 15] = [
        RuleId::RequiredField001,
        RuleId::Format001,
        RuleId::Format002,
        RuleId::Format003,
        RuleId::RefIntegrity001,
        RuleId::RefIntegrity002,
        RuleId::RefIntegrity003,
        RuleId::EnumValidation001,
        RuleId::EnumValidation002,
        RuleId::DateFormat001,
        RuleId::Whitespace001,
        RuleId::CaseNormalization001,
        RuleId::AttributeConflict001,
        RuleId::OptionalField001,
        RuleId::OptionalField002,
    ];

    /// Rule identifier as written in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::RequiredField001 => "REQUIRED_FIELD_001",
            RuleId::Format001 => "FORMAT_001",
            RuleId::Format002 => "FORMAT_002",
            RuleId::Format003 => "FORMAT_003",
            RuleId::RefIntegrity001 => "REF_INTEGRITY_001",
            RuleId::RefIntegrity002 => "REF_INTEGRITY_002",
            RuleId::RefIntegrity003 => "REF_INTEGRITY_003",
            RuleId::EnumValidation001 => "ENUM_VALIDATION_001",
            RuleId::EnumValidation002 => "ENUM_VALIDATION_002",
            RuleId::DateFormat001 => "DATE_FORMAT_001",
            RuleId::Whitespace001 => "WHITESPACE_001",
            RuleId::CaseNormalization001 => "CASE_NORMALIZATION_001",
            RuleId::AttributeConflict001 => "ATTRIBUTE_CONFLICT_001",
            RuleId::OptionalField001 => "OPTIONAL_FIELD_001",
            RuleId::OptionalField002 => "OPTIONAL_FIELD_002",
        }
    }

    /// Category the rule belongs to
    pub fn category(&self) -> RuleCategory {
        match self {
            RuleId::RequiredField001 => RuleCategory::RequiredField,
            RuleId::Format001 | RuleId::Format002 | RuleId::Format003 => RuleCategory::Format,
            RuleId::RefIntegrity001 | RuleId::RefIntegrity002 | RuleId::RefIntegrity003 => {
                RuleCategory::RefIntegrity
            }
            RuleId::EnumValidation001 | RuleId::EnumValidation002 => RuleCategory::EnumValidation,
            RuleId::DateFormat001 => RuleCategory::DateFormat,
            RuleId::Whitespace001 => RuleCategory::Whitespace,
            RuleId::CaseNormalization001 => RuleCategory::CaseNormalization,
            RuleId::AttributeConflict001 => RuleCategory::AttributeConflict,
            RuleId::OptionalField001 | RuleId::OptionalField002 => RuleCategory::OptionalField,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One rule of a ruleset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Rule id
    pub id: RuleId,
    /// Severity fixed by the ruleset version
    pub severity: Severity,
    /// What the rule checks
    pub description: &'static str,
}

/// A versioned, immutable set of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    version: &'static str,
    rules: BTreeMap<RuleId, Rule>,
}

const RULES_1_0_0: [(RuleId, Severity, &str); 15] = [
    (RuleId::RequiredField001, Severity::Blocker, "Required field is empty"),
    (RuleId::Format001, Severity::Blocker, "Value does not match the field pattern"),
    (RuleId::Format002, Severity::Blocker, "Integer field is not an integer"),
    (RuleId::Format003, Severity::Blocker, "Date is not in any accepted format"),
    (RuleId::RefIntegrity001, Severity::Blocker, "Foreign key does not resolve to an existing parent"),
    (RuleId::RefIntegrity002, Severity::Blocker, "Child is linked to more than one parent"),
    (RuleId::RefIntegrity003, Severity::Blocker, "Child is never linked to a parent"),
    (RuleId::EnumValidation001, Severity::Warning, "Value resolved through the synonym table"),
    (RuleId::EnumValidation002, Severity::Blocker, "Value is not in the vocabulary"),
    (RuleId::DateFormat001, Severity::Warning, "Non-ISO date reformatted"),
    (RuleId::Whitespace001, Severity::Warning, "Leading or trailing whitespace"),
    (RuleId::CaseNormalization001, Severity::Warning, "Case coerced"),
    (RuleId::AttributeConflict001, Severity::Warning, "Conflicting attribute value ignored"),
    (RuleId::OptionalField001, Severity::Info, "Optional field is empty"),
    (RuleId::OptionalField002, Severity::Info, "Optional field is not mapped"),
];

impl Ruleset {
    /// Look up a ruleset by version
    pub fn by_version(version: &str) -> Result<Self, ValidationError> {
        match version {
            RULESET_VERSION => Ok(Self::latest()),
            other => Err(ValidationError::UnknownRuleset {
                version: other.to_string(),
                available: vec![RULESET_VERSION.to_string()],
            }),
        }
    }

    /// The newest ruleset
    pub fn latest() -> Self {
        let rules = RULES_1_0_0
            .iter()
            .map(|&(id, severity, description)| {
                (
                    id,
                    Rule {
                        id,
                        severity,
                        description,
                    },
                )
            })
            .collect();
        Self {
            version: RULESET_VERSION,
            rules,
        }
    }

    /// Ruleset version
    pub fn version(&self) -> &str {
        self.version
    }

    /// Look up a rule
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Severity of a rule; rules missing from the ruleset are treated as blockers
    pub fn severity(&self, id: RuleId) -> Severity {
        self.rule(id).map_or(Severity::Blocker, |r| r.severity)
    }

    /// Rules in report order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::latest()
    }
}
