use super::*;

fn minimal_template() -> SchemaTemplate {
    SchemaTemplate {
        id: "mini".to_string(),
        version: "0.1".to_string(),
        name: "Minimal".to_string(),
        vendor: "Test".to_string(),
        category: "Test".to_string(),
        description: String::new(),
        fields: vec![
            FieldSpec::new("Block_ID", FieldType::String)
                .required()
                .key_of(EntityType::Block),
            FieldSpec::new("Slide_ID", FieldType::String)
                .required()
                .with_id_format(IdFormat::with_year("SLD", 4))
                .key_of(EntityType::Slide),
        ],
        relationships: vec![RelationshipSpec::has_many(EntityType::Block, EntityType::Slide)],
    }
}

#[test]
fn test_builtin_templates_validate() {
    let registry = SchemaRegistry::builtin();
    assert_eq!(registry.len(), 5);
    for summary in registry.list() {
        let template = registry.get(&summary.id, &summary.version).unwrap();
        template.validate().unwrap();
        template.compile().unwrap();
    }
}

#[test]
fn test_list_sorted_by_id_and_version() {
    let registry = SchemaRegistry::builtin();
    let ids: Vec<String> = registry
        .list()
        .into_iter()
        .map(|s| format!("{}@{}", s.id, s.version))
        .collect();
    assert_eq!(
        ids,
        vec![
            "cosmx@1.2",
            "geomx@2.0",
            "illumina-run@3.0",
            "visium-hd@1.5",
            "xenium@1.0"
        ]
    );
}

#[test]
fn test_get_unknown_template() {
    let registry = SchemaRegistry::builtin();
    let err = registry.get("cosmx", "9.9").unwrap_err();
    assert!(matches!(err, SchemaError::TemplateNotFound { .. }));
    assert_eq!(err.to_string(), "Template not found: cosmx@9.9");
}

#[test]
fn test_cosmx_shape() {
    let registry = SchemaRegistry::builtin();
    let template = registry.get("cosmx", "1.2").unwrap();
    assert_eq!(template.entity_types(), EntityType::ALL.to_vec());
    assert_eq!(
        template.key_field(EntityType::Slide).map(|f| f.name.as_str()),
        Some("Slide_ID")
    );
    assert_eq!(
        template.parent_types(EntityType::Library),
        vec![EntityType::Roi, EntityType::Run]
    );
    let required: Vec<&str> = template
        .fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(
        required,
        vec![
            "Specimen_ID",
            "Block_ID",
            "Slide_ID",
            "ROI_ID",
            "Library_ID",
            "Run_ID",
            "Platform"
        ]
    );
}

#[test]
fn test_relationship_direction() {
    let has_many = RelationshipSpec::has_many(EntityType::Slide, EntityType::Roi);
    assert_eq!(has_many.parent(), EntityType::Slide);
    assert_eq!(has_many.child(), EntityType::Roi);

    let belongs_to = RelationshipSpec::belongs_to(EntityType::Library, EntityType::Run);
    assert_eq!(belongs_to.parent(), EntityType::Run);
    assert_eq!(belongs_to.child(), EntityType::Library);
    assert_eq!(belongs_to.to_string(), "Library belongs_to Run");
}

#[test]
fn test_id_format_display_and_parse() {
    let format = IdFormat::with_year("SLD", 4);
    assert_eq!(format.to_string(), "SLD-YYYY-####");
    assert_eq!("SLD-YYYY-####".parse::<IdFormat>().unwrap(), format);
    assert_eq!(
        "ROI-###".parse::<IdFormat>().unwrap(),
        IdFormat::serial("ROI", 3)
    );
    assert_eq!(
        "CM-X-YYYY-##".parse::<IdFormat>().unwrap().prefix,
        "CM-X"
    );
    assert!("SLD-YYYY".parse::<IdFormat>().is_err());
    assert!("-####".parse::<IdFormat>().is_err());
}

#[test]
fn test_id_format_reformat() {
    let format = IdFormat::with_year("SLD", 4);
    assert_eq!(
        format.reformat("SLIDE_042", Some(2024)).as_deref(),
        Some("SLD-2024-0042")
    );
    assert_eq!(format.reformat("SLIDE_042", None), None);
    assert_eq!(
        format.reformat("sld_2023_7", None).as_deref(),
        Some("SLD-2023-0007")
    );
    assert_eq!(format.reformat("SLIDE", Some(2024)), None);
    assert_eq!(format.reformat("SLIDE_123456", Some(2024)), None);

    let serial = IdFormat::serial("ROI", 3);
    assert_eq!(serial.reformat("roi 7", None).as_deref(), Some("ROI-007"));
    assert_eq!(format.year_of("SLD-2024-0042"), Some(2024));
    assert_eq!(serial.year_of("ROI-007"), None);
}

#[test]
fn test_compiled_patterns_are_anchored() {
    let template = minimal_template();
    let compiled = template.compile().unwrap();
    let slide = template.field_index("Slide_ID").unwrap();
    assert!(compiled.conforms(slide, "SLD-2024-0042"));
    assert!(!compiled.conforms(slide, "XSLD-2024-0042"));
    assert!(!compiled.conforms(slide, "SLD-2024-00421"));
    let block = template.field_index("Block_ID").unwrap();
    assert!(compiled.conforms(block, "anything"));
}

#[test]
fn test_register_rejects_duplicate_template() {
    let mut registry = SchemaRegistry::new();
    registry.register(minimal_template()).unwrap();
    let err = registry.register(minimal_template()).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateTemplate { .. }));
}

#[test]
fn test_register_rejects_duplicate_field() {
    let mut template = minimal_template();
    template
        .fields
        .push(FieldSpec::new("Block_ID", FieldType::String));
    let err = SchemaRegistry::new().register(template).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateField { .. }));
}

#[test]
fn test_register_rejects_enum_without_vocabulary() {
    let mut template = minimal_template();
    template
        .fields
        .push(FieldSpec::new("Tissue_Type", FieldType::Enum));
    let err = template.validate().unwrap_err();
    assert!(matches!(err, SchemaError::MissingVocabulary { .. }));
}

#[test]
fn test_register_rejects_foreign_synonym() {
    let mut template = minimal_template();
    let mut field = FieldSpec::enumerated("Tissue_Type", &crate::vocabulary::tissue_types::vocabulary());
    field
        .synonyms
        .insert("Tumor".to_string(), "Not_A_Value".to_string());
    template.fields.push(field);
    let err = template.validate().unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSynonym { .. }));
}

#[test]
fn test_synonyms_on_typed_field_are_rejected() {
    let mut template = minimal_template();
    let mut field = FieldSpec::new("Collection_Date", FieldType::Date);
    field
        .synonyms
        .insert("unknown".to_string(), "1900-01-01".to_string());
    template.fields.push(field);
    let err = template.validate().unwrap_err();
    assert!(matches!(
        err,
        SchemaError::SynonymsOnTypedField {
            field_type: FieldType::Date,
            ..
        }
    ));
}

#[test]
fn test_free_text_synonyms_must_not_chain() {
    let mut template = minimal_template();
    let mut field = FieldSpec::new("Kit_Version", FieldType::String).with_case(CaseRule::Upper);
    field
        .synonyms
        .insert("v1 kit".to_string(), "KIT-V1".to_string());
    template.fields.push(field.clone());
    template.validate().unwrap();

    field
        .synonyms
        .insert("kit-v1".to_string(), "KIT-V1".to_string());
    template.fields.pop();
    template.fields.push(field);
    let err = template.validate().unwrap_err();
    assert!(matches!(err, SchemaError::ChainedSynonym { ref synonym, .. } if synonym == "kit-v1"));
}

#[test]
fn test_register_rejects_bad_pattern() {
    let mut template = minimal_template();
    template
        .fields
        .push(FieldSpec::new("Lane", FieldType::Int).with_pattern("[1-"));
    assert!(matches!(
        template.validate(),
        Err(SchemaError::InvalidPattern { .. })
    ));
}

#[test]
fn test_register_rejects_second_key() {
    let mut template = minimal_template();
    template.fields.push(
        FieldSpec::new("Slide_Barcode", FieldType::String).key_of(EntityType::Slide),
    );
    assert!(matches!(
        template.validate(),
        Err(SchemaError::DuplicateKey { .. })
    ));
}

#[test]
fn test_register_rejects_unkeyed_relationship() {
    let mut template = minimal_template();
    template
        .relationships
        .push(RelationshipSpec::has_many(EntityType::Slide, EntityType::Roi));
    assert!(matches!(
        template.validate(),
        Err(SchemaError::UnkeyedRelationship {
            entity: EntityType::Roi,
            ..
        })
    ));
}

#[test]
fn test_register_rejects_cycle() {
    let mut template = minimal_template();
    template
        .relationships
        .push(RelationshipSpec::belongs_to(EntityType::Block, EntityType::Slide));
    assert!(matches!(
        template.validate(),
        Err(SchemaError::CyclicRelationships { .. })
    ));
}

#[test]
fn test_template_json_round_trip() {
    let registry = SchemaRegistry::builtin();
    let template = registry.get("geomx", "2.0").unwrap();
    let json = serde_json::to_string_pretty(template).unwrap();
    assert!(json.contains("\"id_format\": \"SLD-YYYY-####\""));
    assert!(json.contains("\"key\": \"ROI\""));
    let back: SchemaTemplate = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, template);
}

#[test]
fn test_load_dir_registers_json_and_toml() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::to_string(&minimal_template()).unwrap();
    std::fs::write(dir.path().join("a_mini.json"), json).unwrap();

    let toml_template = r#"
id = "tiny"
version = "1.0"
name = "Tiny"
vendor = "Test"
category = "Test"

[[fields]]
name = "Specimen_ID"
type = "string"
required = true
id_format = "SPEC-YYYY-###"
case = "upper"
binding = { key = "Specimen" }

[[fields]]
name = "Notes"
type = "string"
"#;
    std::fs::write(dir.path().join("b_tiny.toml"), toml_template).unwrap();
    std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

    let mut registry = SchemaRegistry::new();
    assert_eq!(registry.load_dir(dir.path()).unwrap(), 2);
    let tiny = registry.get("tiny", "1.0").unwrap();
    assert_eq!(tiny.fields[0].case, CaseRule::Upper);
    assert_eq!(tiny.fields[0].id_format, Some(IdFormat::with_year("SPEC", 3)));
    assert_eq!(tiny.entity_types(), vec![EntityType::Specimen]);
}

#[test]
fn test_load_file_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = SchemaRegistry::new().load_file(&path).unwrap_err();
    assert!(matches!(err, SchemaError::JsonError { .. }));
}

#[test]
fn test_entity_type_names() {
    assert_eq!(EntityType::Roi.to_string(), "ROI");
    assert_eq!(EntityType::Roi.id_prefix(), "ROI");
    assert_eq!(EntityType::Specimen.id_prefix(), "SPC");
    assert_eq!(EntityType::Library.table_name(), "library");
    assert_eq!(serde_json::to_string(&EntityType::Roi).unwrap(), "\"ROI\"");
}
