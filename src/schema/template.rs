use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{EntityType, SchemaError};
use crate::vocabulary::Vocabulary;

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text, optionally constrained by a pattern
    String,
    /// Calendar date, normalized to ISO-8601 (`YYYY-MM-DD`)
    Date,
    /// Value from a controlled vocabulary
    Enum,
    /// Signed integer
    Int,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Date => write!(f, "date"),
            FieldType::Enum => write!(f, "enum"),
            FieldType::Int => write!(f, "int"),
        }
    }
}

/// Case coercion applied to string values during normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseRule {
    /// Keep the value as written
    #[default]
    Preserve,
    /// Coerce to upper case
    Upper,
    /// Coerce to lower case
    Lower,
}

impl CaseRule {
    /// Apply the rule to a value
    pub fn apply(&self, value: &str) -> String {
        match self {
            CaseRule::Preserve => value.to_string(),
            CaseRule::Upper => value.to_uppercase(),
            CaseRule::Lower => value.to_lowercase(),
        }
    }
}

/// Role a field plays in entity construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldBinding {
    /// The natural key of an entity type
    Key(EntityType),
    /// An attribute carried by an entity type
    Attribute(EntityType),
}

impl FieldBinding {
    /// Entity type the field belongs to
    pub fn entity_type(&self) -> EntityType {
        match self {
            FieldBinding::Key(e) | FieldBinding::Attribute(e) => *e,
        }
    }
}

/// Structured identifier format such as `SLD-YYYY-####`.
///
/// `YYYY` stands for a four-digit year and each `#` for one digit of a
/// zero-padded serial number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdFormat {
    /// Literal prefix (e.g., "SLD")
    pub prefix: String,
    /// Whether a year segment follows the prefix
    pub year: bool,
    /// Width of the zero-padded serial
    pub digits: usize,
}

impl IdFormat {
    /// Create a format with a year segment
    pub fn with_year(prefix: &str, digits: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            year: true,
            digits,
        }
    }

    /// Create a format without a year segment
    pub fn serial(prefix: &str, digits: usize) -> Self {
        Self {
            prefix: prefix.to_string(),
            year: false,
            digits,
        }
    }

    /// Regex source matching exactly this format
    pub fn pattern(&self) -> String {
        let year = if self.year { r"\d{4}-" } else { "" };
        format!("{}-{}\\d{{{}}}", regex::escape(&self.prefix), year, self.digits)
    }

    /// Rebuild a conforming identifier from the digits found in `value`.
    ///
    /// The last digit run is the serial. A leading four-digit run between
    /// 1900 and 2099 followed by another run is taken as the year, otherwise
    /// `year` is used. Returns `None` when the serial does not fit or a
    /// required year is unknown.
    pub fn reformat(&self, value: &str, year: Option<i32>) -> Option<String> {
        let runs: Vec<&str> = value
            .split(|c: char| !c.is_ascii_digit())
            .filter(|run| !run.is_empty())
            .collect();
        let serial_run = runs.last()?;
        let serial: u64 = serial_run.parse().ok()?;
        let serial_text = serial.to_string();
        if serial_text.len() > self.digits {
            return None;
        }

        if !self.year {
            return Some(format!("{}-{:0width$}", self.prefix, serial, width = self.digits));
        }

        let embedded_year = match runs.as_slice() {
            [first, _, ..] if first.len() == 4 => first
                .parse::<i32>()
                .ok()
                .filter(|y| (1900..=2099).contains(y)),
            _ => None,
        };
        let year = embedded_year.or(year)?;
        Some(format!(
            "{}-{:04}-{:0width$}",
            self.prefix,
            year,
            serial,
            width = self.digits
        ))
    }

    /// Extract the year segment from a conforming identifier
    pub fn year_of(&self, value: &str) -> Option<i32> {
        if !self.year {
            return None;
        }
        let rest = value.strip_prefix(&self.prefix)?.strip_prefix('-')?;
        rest.get(..4)?.parse().ok()
    }
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-", self.prefix)?;
        if self.year {
            write!(f, "YYYY-")?;
        }
        write!(f, "{}", "#".repeat(self.digits))
    }
}

impl FromStr for IdFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments: Vec<&str> = s.split('-').collect();
        let serial = segments
            .pop()
            .filter(|seg| !seg.is_empty() && seg.chars().all(|c| c == '#'))
            .ok_or_else(|| format!("id format '{}' must end with a '#' serial segment", s))?;
        let year = segments.last() == Some(&"YYYY");
        if year {
            segments.pop();
        }
        let prefix = segments.join("-");
        if prefix.is_empty() {
            return Err(format!("id format '{}' has no prefix", s));
        }
        Ok(Self {
            prefix,
            year,
            digits: serial.len(),
        })
    }
}

impl TryFrom<String> for IdFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IdFormat> for String {
    fn from(value: IdFormat) -> Self {
        value.to_string()
    }
}

/// Definition of one canonical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Canonical field name (e.g., "Slide_ID")
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether every row must carry a value
    #[serde(default)]
    pub required: bool,
    /// Value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Regex the normalized value must match in full
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Structured identifier format; implies a pattern when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_format: Option<IdFormat>,
    /// Canonical values of an enum field, in display order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<String>>,
    /// Synonym → canonical value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub synonyms: BTreeMap<String, String>,
    /// Case coercion for string values
    #[serde(default)]
    pub case: CaseRule,
    /// Alternative column names used for mapping proposals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Entity binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<FieldBinding>,
}

impl FieldSpec {
    /// Create an optional, unbound field
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            required: false,
            field_type,
            pattern: None,
            id_format: None,
            vocabulary: None,
            synonyms: BTreeMap::new(),
            case: CaseRule::Preserve,
            aliases: Vec::new(),
            binding: None,
        }
    }

    /// Create an enum field backed by a controlled vocabulary
    pub fn enumerated(name: &str, vocabulary: &Vocabulary) -> Self {
        let mut field = Self::new(name, FieldType::Enum);
        field.vocabulary = Some(vocabulary.values());
        field.synonyms = vocabulary.synonym_table();
        field
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the description
    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Constrain the value with a regex
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Constrain the value with an identifier format
    pub fn with_id_format(mut self, format: IdFormat) -> Self {
        self.id_format = Some(format);
        self
    }

    /// Set the case rule
    pub fn with_case(mut self, case: CaseRule) -> Self {
        self.case = case;
        self
    }

    /// Add alternative column names
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    /// Bind the field as the natural key of an entity type
    pub fn key_of(mut self, entity: EntityType) -> Self {
        self.binding = Some(FieldBinding::Key(entity));
        self
    }

    /// Bind the field as an attribute of an entity type
    pub fn attribute_of(mut self, entity: EntityType) -> Self {
        self.binding = Some(FieldBinding::Attribute(entity));
        self
    }

    /// Pattern source in effect: the explicit pattern, else the id format's
    pub fn effective_pattern(&self) -> Option<String> {
        self.pattern
            .clone()
            .or_else(|| self.id_format.as_ref().map(IdFormat::pattern))
    }

    /// Human-readable form of the expected format, for messages
    pub fn format_hint(&self) -> Option<String> {
        self.id_format
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.pattern.clone())
    }

    /// Whether the field is the key of `entity`
    pub fn is_key_of(&self, entity: EntityType) -> bool {
        self.binding == Some(FieldBinding::Key(entity))
    }
}

/// Cardinality of a declared relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// `from` is the parent of many `to`
    HasMany,
    /// `from` is a child belonging to one `to`
    BelongsTo,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::HasMany => write!(f, "has_many"),
            Cardinality::BelongsTo => write!(f, "belongs_to"),
        }
    }
}

/// A declared parent/child relationship between two entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Source entity type
    pub from: EntityType,
    /// Target entity type
    pub to: EntityType,
    /// Direction of the relationship
    pub cardinality: Cardinality,
}

impl RelationshipSpec {
    /// `parent has_many child`
    pub fn has_many(parent: EntityType, child: EntityType) -> Self {
        Self {
            from: parent,
            to: child,
            cardinality: Cardinality::HasMany,
        }
    }

    /// `child belongs_to parent`
    pub fn belongs_to(child: EntityType, parent: EntityType) -> Self {
        Self {
            from: child,
            to: parent,
            cardinality: Cardinality::BelongsTo,
        }
    }

    /// The parent side of the relationship
    pub fn parent(&self) -> EntityType {
        match self.cardinality {
            Cardinality::HasMany => self.from,
            Cardinality::BelongsTo => self.to,
        }
    }

    /// The child side of the relationship
    pub fn child(&self) -> EntityType {
        match self.cardinality {
            Cardinality::HasMany => self.to,
            Cardinality::BelongsTo => self.from,
        }
    }
}

impl fmt::Display for RelationshipSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.from, self.cardinality, self.to)
    }
}

/// Listing entry for a registered template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    /// Template id
    pub id: String,
    /// Template version
    pub version: String,
    /// Display name
    pub name: String,
    /// Platform vendor
    pub vendor: String,
    /// Assay category
    pub category: String,
}

/// A versioned, immutable schema template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTemplate {
    /// Template id (e.g., "cosmx")
    pub id: String,
    /// Template version (e.g., "1.2")
    pub version: String,
    /// Display name
    pub name: String,
    /// Platform vendor
    pub vendor: String,
    /// Assay category
    pub category: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Canonical fields in display order
    pub fields: Vec<FieldSpec>,
    /// Declared relationships between entity types
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
}

impl SchemaTemplate {
    /// `id@version`
    pub fn reference(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    /// Listing entry
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            category: self.category.clone(),
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in template order
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The key field of an entity type
    pub fn key_field(&self, entity: EntityType) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.is_key_of(entity))
    }

    /// Attribute fields of an entity type, in template order
    pub fn attribute_fields(&self, entity: EntityType) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields
            .iter()
            .filter(move |f| f.binding == Some(FieldBinding::Attribute(entity)))
    }

    /// Entity types that have a key field, in hierarchy order
    pub fn entity_types(&self) -> Vec<EntityType> {
        self.fields
            .iter()
            .filter_map(|f| match f.binding {
                Some(FieldBinding::Key(e)) => Some(e),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Parent entity types of `child`, in hierarchy order
    pub fn parent_types(&self, child: EntityType) -> Vec<EntityType> {
        self.relationships
            .iter()
            .filter(|r| r.child() == child)
            .map(RelationshipSpec::parent)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check the template's internal consistency
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.id.trim().is_empty() || self.version.trim().is_empty() {
            return Err(SchemaError::MissingIdentity);
        }
        let template = self.reference();

        let mut names = BTreeSet::new();
        let mut keys: BTreeMap<EntityType, &str> = BTreeMap::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    template,
                    field: field.name.clone(),
                });
            }

            if field.field_type == FieldType::Enum {
                let vocabulary = field.vocabulary.as_ref().filter(|v| !v.is_empty()).ok_or_else(|| {
                    SchemaError::MissingVocabulary {
                        template: template.clone(),
                        field: field.name.clone(),
                    }
                })?;
                for (synonym, target) in &field.synonyms {
                    if !vocabulary.contains(target) {
                        return Err(SchemaError::InvalidSynonym {
                            template,
                            field: field.name.clone(),
                            synonym: synonym.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }

            match field.field_type {
                FieldType::Date | FieldType::Int if !field.synonyms.is_empty() => {
                    return Err(SchemaError::SynonymsOnTypedField {
                        template,
                        field: field.name.clone(),
                        field_type: field.field_type,
                    });
                }
                FieldType::String => {
                    let folded: BTreeSet<String> =
                        field.synonyms.keys().map(|k| k.to_lowercase()).collect();
                    for (synonym, target) in &field.synonyms {
                        if folded.contains(&field.case.apply(target).to_lowercase()) {
                            return Err(SchemaError::ChainedSynonym {
                                template,
                                field: field.name.clone(),
                                synonym: synonym.clone(),
                                target: target.clone(),
                            });
                        }
                    }
                }
                _ => {}
            }

            if let Some(pattern) = field.effective_pattern() {
                anchored(&pattern).map_err(|source| SchemaError::InvalidPattern {
                    template: template.clone(),
                    field: field.name.clone(),
                    source,
                })?;
            }

            if let Some(FieldBinding::Key(entity)) = field.binding {
                if let Some(first) = keys.insert(entity, &field.name) {
                    return Err(SchemaError::DuplicateKey {
                        template,
                        entity,
                        first: first.to_string(),
                        second: field.name.clone(),
                    });
                }
            }
        }

        for relationship in &self.relationships {
            for entity in [relationship.from, relationship.to] {
                if !keys.contains_key(&entity) {
                    return Err(SchemaError::UnkeyedRelationship {
                        template,
                        from: relationship.from,
                        to: relationship.to,
                        entity,
                    });
                }
            }
        }

        if let Some(entity) = self.find_cycle() {
            return Err(SchemaError::CyclicRelationships { template, entity });
        }

        Ok(())
    }

    fn find_cycle(&self) -> Option<EntityType> {
        fn visit(
            node: EntityType,
            edges: &[(EntityType, EntityType)],
            on_path: &mut Vec<EntityType>,
            done: &mut BTreeSet<EntityType>,
        ) -> Option<EntityType> {
            if on_path.contains(&node) {
                return Some(node);
            }
            if done.contains(&node) {
                return None;
            }
            on_path.push(node);
            for &(_, child) in edges.iter().filter(|(parent, _)| *parent == node) {
                if let Some(hit) = visit(child, edges, on_path, done) {
                    return Some(hit);
                }
            }
            on_path.pop();
            done.insert(node);
            None
        }

        let edges: Vec<(EntityType, EntityType)> = self
            .relationships
            .iter()
            .map(|r| (r.parent(), r.child()))
            .collect();
        let mut done = BTreeSet::new();
        EntityType::ALL
            .iter()
            .find_map(|&start| visit(start, &edges, &mut Vec::new(), &mut done))
    }

    /// Compile every field pattern once for a run
    pub fn compile(&self) -> Result<CompiledTemplate<'_>, SchemaError> {
        let patterns = self
            .fields
            .iter()
            .map(|field| {
                field
                    .effective_pattern()
                    .map(|p| anchored(&p))
                    .transpose()
                    .map_err(|source| SchemaError::InvalidPattern {
                        template: self.reference(),
                        field: field.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledTemplate {
            template: self,
            patterns,
        })
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// A template with its field patterns compiled, shared read-only by a run
#[derive(Debug, Clone)]
pub struct CompiledTemplate<'t> {
    template: &'t SchemaTemplate,
    patterns: Vec<Option<Regex>>,
}

impl<'t> CompiledTemplate<'t> {
    /// The underlying template
    pub fn template(&self) -> &'t SchemaTemplate {
        self.template
    }

    /// Compiled pattern of the field at `index` (template order)
    pub fn pattern(&self, index: usize) -> Option<&Regex> {
        self.patterns.get(index).and_then(Option::as_ref)
    }

    /// Whether `value` satisfies the pattern of the field at `index`.
    /// Fields without a pattern accept every value.
    pub fn conforms(&self, index: usize, value: &str) -> bool {
        self.pattern(index).map_or(true, |re| re.is_match(value))
    }
}
