use super::{EntityType, FieldType};

/// Errors raised while registering, loading or looking up templates
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// No template with this id and version is registered
    #[error("Template not found: {id}@{version}")]
    TemplateNotFound {
        /// Template id
        id: String,
        /// Template version
        version: String,
    },

    /// A template with this id and version is already registered
    #[error("Template already registered: {id}@{version}")]
    DuplicateTemplate {
        /// Template id
        id: String,
        /// Template version
        version: String,
    },

    /// Two fields share a name
    #[error("Template {template}: duplicate field '{field}'")]
    DuplicateField {
        /// Template reference (`id@version`)
        template: String,
        /// Repeated field name
        field: String,
    },

    /// An enum field has no vocabulary
    #[error("Template {template}: enum field '{field}' has no vocabulary")]
    MissingVocabulary {
        /// Template reference
        template: String,
        /// Field name
        field: String,
    },

    /// A synonym resolves to a value outside the vocabulary
    #[error("Template {template}: synonym '{synonym}' of field '{field}' targets '{target}', which is not in the vocabulary")]
    InvalidSynonym {
        /// Template reference
        template: String,
        /// Field name
        field: String,
        /// Synonym spelling
        synonym: String,
        /// Target value
        target: String,
    },

    /// Date and integer fields are parsed, never looked up
    #[error("Template {template}: field '{field}' of type {field_type} cannot carry synonyms")]
    SynonymsOnTypedField {
        /// Template reference
        template: String,
        /// Field name
        field: String,
        /// The field's type
        field_type: FieldType,
    },

    /// A free-text synonym resolves to another synonym
    #[error("Template {template}: synonym '{synonym}' of field '{field}' targets '{target}', which is itself a synonym")]
    ChainedSynonym {
        /// Template reference
        template: String,
        /// Field name
        field: String,
        /// Synonym spelling
        synonym: String,
        /// Target value
        target: String,
    },

    /// A field pattern does not compile
    #[error("Template {template}: invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        /// Template reference
        template: String,
        /// Field name
        field: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// More than one field is the key of the same entity type
    #[error("Template {template}: entity {entity} has more than one key field ('{first}', '{second}')")]
    DuplicateKey {
        /// Template reference
        template: String,
        /// Entity type
        entity: EntityType,
        /// First key field
        first: String,
        /// Second key field
        second: String,
    },

    /// A relationship names an entity type without a key field
    #[error("Template {template}: relationship {from} -> {to} references {entity}, which has no key field")]
    UnkeyedRelationship {
        /// Template reference
        template: String,
        /// Relationship source
        from: EntityType,
        /// Relationship target
        to: EntityType,
        /// The entity type lacking a key
        entity: EntityType,
    },

    /// The relationship graph contains a cycle or a self-edge
    #[error("Template {template}: relationships form a cycle through {entity}")]
    CyclicRelationships {
        /// Template reference
        template: String,
        /// An entity type on the cycle
        entity: EntityType,
    },

    /// A template id or version is empty
    #[error("Template has an empty id or version")]
    MissingIdentity,

    /// I/O error while loading template files
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON template could not be parsed
    #[error("JSON template error in {path}: {source}")]
    JsonError {
        /// Template file path
        path: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// TOML template could not be parsed
    #[error("TOML template error in {path}: {source}")]
    TomlError {
        /// Template file path
        path: String,
        /// Parse error
        #[source]
        source: toml::de::Error,
    },
}
