use super::*;
use crate::mapping::FieldMapping;
use crate::schema::{
    CaseRule, EntityType, FieldSpec, FieldType, IdFormat, SchemaRegistry,
};

const HEADER: &[&str] = &[
    "Sample_Name",
    "Block",
    "Slide_Barcode",
    "ROI",
    "Library",
    "Run",
    "Platform",
];

fn cosmx() -> SchemaTemplate {
    SchemaRegistry::builtin().get("cosmx", "1.2").unwrap().clone()
}

fn mapping() -> FieldMapping {
    FieldMapping::new()
        .with("Specimen_ID", "Sample_Name")
        .with("Block_ID", "Block")
        .with("Slide_ID", "Slide_Barcode")
        .with("ROI_ID", "ROI")
        .with("Library_ID", "Library")
        .with("Run_ID", "Run")
        .with("Platform", "Platform")
}

fn row(
    specimen: &str,
    block: &str,
    slide: &str,
    roi: &str,
    library: &str,
    run: &str,
) -> Vec<String> {
    [specimen, block, slide, roi, library, run, "CosMx"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn clean_rows() -> Vec<Vec<String>> {
    vec![
        row("SPEC-2024-001", "BLK-2024-001", "SLD-2024-0002", "ROI-001", "LIB-2024-001", "RUN-2024-001"),
        row("SPEC-2024-001", "BLK-2024-001", "SLD-2024-0002", "ROI-002", "LIB-2024-002", "RUN-2024-001"),
        row("SPEC-2024-001", "BLK-2024-001", "SLD-2024-0001", "ROI-003", "LIB-2024-003", "RUN-2024-001"),
        row("SPEC-2024-002", "BLK-2024-002", "SLD-2024-0003", "ROI-004", "LIB-2024-004", "RUN-2024-002"),
    ]
}

fn run_rows(rows: Vec<Vec<String>>) -> HarmonizedDataset {
    run_with(rows, &cosmx(), mapping())
}

fn run_with(rows: Vec<Vec<String>>, template: &SchemaTemplate, draft: FieldMapping) -> HarmonizedDataset {
    let table = RawTable::from_rows(HEADER.iter().copied(), rows).unwrap();
    let confirmed = draft.confirm(&table, template).unwrap();
    harmonize(&table, &confirmed, template, &HarmonizeOptions::sequential()).unwrap()
}

fn kinds(dataset: &HarmonizedDataset) -> Vec<&FindingKind> {
    dataset.findings().iter().map(|f| &f.kind).collect()
}

fn field_spec(name: &str) -> FieldSpec {
    cosmx().field(name).unwrap().clone()
}

#[test]
fn test_clean_table_builds_every_entity() {
    let dataset = run_rows(clean_rows());
    assert!(dataset.findings().is_empty(), "{:?}", dataset.findings());

    let summary = dataset.summary();
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.entity_counts[&EntityType::Specimen], 2);
    assert_eq!(summary.entity_counts[&EntityType::Block], 2);
    assert_eq!(summary.entity_counts[&EntityType::Slide], 3);
    assert_eq!(summary.entity_counts[&EntityType::Roi], 4);
    assert_eq!(summary.entity_counts[&EntityType::Library], 4);
    assert_eq!(summary.entity_counts[&EntityType::Run], 2);
    assert_eq!(summary.relationships.len(), 5);
    assert!(summary.all_relationships_valid());
}

#[test]
fn test_summary_counts_every_entity_type() {
    let dataset = run_rows(clean_rows());
    let counts = dataset.summary().entity_counts;
    assert_eq!(counts.len(), EntityType::ALL.len());
    assert!(counts.values().all(|n| *n > 0));
}

#[test]
fn test_canonical_ids_follow_natural_key_order() {
    let dataset = run_rows(clean_rows());
    let slides = dataset.entities(EntityType::Slide);
    let pairs: Vec<(&str, &str)> = slides
        .iter()
        .map(|s| (s.canonical_id.as_str(), s.natural_key.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("CM-SLD-000001", "SLD-2024-0001"),
            ("CM-SLD-000002", "SLD-2024-0002"),
            ("CM-SLD-000003", "SLD-2024-0003"),
        ]
    );
    assert_eq!(canonical_id(EntityType::Library, 12), "CM-LIB-000012");
}

#[test]
fn test_duplicate_rows_collapse() {
    let mut rows = clean_rows();
    rows.push(rows[0].clone());
    rows.push(rows[0].clone());
    let dataset = run_rows(rows);

    assert_eq!(dataset.entities(EntityType::Slide).len(), 3);
    let slide = dataset
        .find_by_key(EntityType::Slide, "SLD-2024-0002")
        .unwrap();
    assert_eq!(slide.source_rows, vec![1, 2, 5, 6]);
    let roi = dataset.find_by_key(EntityType::Roi, "ROI-001").unwrap();
    assert_eq!(roi.source_rows, vec![1, 5, 6]);
    assert!(dataset.summary().all_relationships_valid());
}

#[test]
fn test_row_order_does_not_change_entities() {
    let forward = run_rows(clean_rows());
    let mut reversed_rows = clean_rows();
    reversed_rows.reverse();
    let reversed = run_rows(reversed_rows);

    for entity_type in EntityType::ALL {
        let left: Vec<_> = forward
            .entities(entity_type)
            .iter()
            .map(|e| (&e.canonical_id, &e.natural_key, &e.parents, &e.children))
            .collect();
        let right: Vec<_> = reversed
            .entities(entity_type)
            .iter()
            .map(|e| (&e.canonical_id, &e.natural_key, &e.parents, &e.children))
            .collect();
        assert_eq!(left, right, "{entity_type}");
    }
    assert_eq!(forward.relationships(), reversed.relationships());
    assert_eq!(forward.join_paths(), reversed.join_paths());
}

#[test]
fn test_harmonize_is_repeatable() {
    let first = run_rows(clean_rows());
    let second = run_rows(clean_rows());
    assert_eq!(first, second);
}

#[test]
fn test_parent_and_child_links() {
    let dataset = run_rows(clean_rows());
    let block = dataset.find_by_key(EntityType::Block, "BLK-2024-001").unwrap();
    assert_eq!(block.parents.len(), 1);
    assert_eq!(block.parents[0].canonical_id, "CM-SPC-000001");
    let slide_ids: Vec<&str> = block.children.iter().map(|c| c.canonical_id.as_str()).collect();
    assert_eq!(slide_ids, vec!["CM-SLD-000001", "CM-SLD-000002"]);

    let library = dataset.find_by_key(EntityType::Library, "LIB-2024-004").unwrap();
    let parent_types: Vec<EntityType> = library.parents.iter().map(|p| p.entity_type).collect();
    assert_eq!(parent_types, vec![EntityType::Roi, EntityType::Run]);
    assert_eq!(library.parents_of_type(EntityType::Run).count(), 1);
}

#[test]
fn test_normalization_findings() {
    let mut rows = clean_rows();
    rows[0][0] = " spec-2024-001".to_string();
    rows[1][6] = "GeoMx".to_string();
    rows[2][6] = "cosmx".to_string();
    let dataset = run_rows(rows);

    let findings = dataset.findings();
    let whitespace = findings
        .iter()
        .find(|f| f.kind == FindingKind::Whitespace)
        .unwrap();
    assert_eq!(whitespace.row, 1);
    assert_eq!(whitespace.field, "Specimen_ID");
    assert_eq!(whitespace.value, " spec-2024-001");
    assert_eq!(whitespace.normalized.as_deref(), Some("SPEC-2024-001"));

    let case: Vec<_> = findings
        .iter()
        .filter(|f| f.kind == FindingKind::CaseCoerced)
        .map(|f| (f.row, f.field.as_str(), f.normalized.as_deref()))
        .collect();
    assert_eq!(
        case,
        vec![
            (1, "Specimen_ID", Some("SPEC-2024-001")),
            (3, "Platform", Some("CosMx")),
        ]
    );

    let synonym = findings
        .iter()
        .find(|f| f.kind == FindingKind::SynonymResolved)
        .unwrap();
    assert_eq!(synonym.row, 2);
    assert_eq!(synonym.normalized.as_deref(), Some("GeoMx_DSP"));

    // The corrected specimen key merges with its clean twin
    assert_eq!(dataset.entities(EntityType::Specimen).len(), 2);
}

#[test]
fn test_attribute_conflict_keeps_first_value() {
    let mut rows = clean_rows();
    rows[1][6] = "Xenium".to_string();
    let dataset = run_rows(rows);

    let run = dataset.find_by_key(EntityType::Run, "RUN-2024-001").unwrap();
    assert_eq!(run.attributes["Platform"], "CosMx");

    let conflicts: Vec<&Finding> = dataset
        .findings()
        .iter()
        .filter(|f| matches!(f.kind, FindingKind::AttributeConflict { .. }))
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].row, 2);
    assert_eq!(conflicts[0].value, "Xenium");
    assert_eq!(
        conflicts[0].kind,
        FindingKind::AttributeConflict {
            entity: EntityType::Run,
            natural_key: "RUN-2024-001".to_string(),
            kept: "CosMx".to_string(),
        }
    );
}

#[test]
fn test_dangling_reference_when_parent_not_constructed() {
    let mut rows = clean_rows();
    rows.push(row(
        "SPEC-2024-002",
        "BLK-2024-002",
        "SLD-2024-0003",
        "ROI-005",
        "LIB-2024-005",
        "RUN-2024-009",
    ));
    // Platform is a required Run attribute: without it RUN-2024-009 never exists
    rows[4][6] = String::new();
    let dataset = run_rows(rows);

    assert!(dataset.find_by_key(EntityType::Run, "RUN-2024-009").is_none());
    let dangling: Vec<&Finding> = dataset
        .findings()
        .iter()
        .filter(|f| matches!(f.kind, FindingKind::DanglingReference { .. }))
        .collect();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].row, 5);
    assert_eq!(dangling[0].field, "Run_ID");
    assert_eq!(dangling[0].value, "RUN-2024-009");
    assert!(kinds(&dataset).contains(&&FindingKind::MissingRequired));

    let run_link = dataset
        .relationships()
        .iter()
        .find(|r| r.to == EntityType::Run)
        .unwrap();
    assert!(!run_link.valid);
    assert_eq!(run_link.dangling, 1);
    assert_eq!(run_link.orphans, 0);
}

#[test]
fn test_child_with_two_parents() {
    let mut rows = clean_rows();
    rows.push(row(
        "SPEC-2024-002",
        "BLK-2024-002",
        "SLD-2024-0003",
        "ROI-001",
        "LIB-2024-001",
        "RUN-2024-001",
    ));
    let dataset = run_rows(rows);

    let conflict = dataset
        .findings()
        .iter()
        .find(|f| {
            matches!(
                f.kind,
                FindingKind::MultipleParents {
                    child: EntityType::Roi,
                    ..
                }
            )
        })
        .unwrap();
    assert_eq!(conflict.row, 5);
    assert_eq!(conflict.field, "Slide_ID");
    assert_eq!(
        conflict.kind,
        FindingKind::MultipleParents {
            child: EntityType::Roi,
            parent: EntityType::Slide,
            parents: vec!["SLD-2024-0002".to_string(), "SLD-2024-0003".to_string()],
        }
    );
    let slide_roi = dataset
        .relationships()
        .iter()
        .find(|r| r.from == EntityType::Slide)
        .unwrap();
    assert_eq!(slide_roi.conflicts, 1);
    assert!(!slide_roi.valid);
}

#[test]
fn test_malformed_foreign_key_is_not_reported_twice() {
    let mut rows = clean_rows();
    rows.push(row(
        "SPEC-2024-003",
        "BLK-2024-003",
        "SLIDE_042",
        "ROI-006",
        "LIB-2024-006",
        "RUN-2024-002",
    ));
    let dataset = run_rows(rows);

    let at_row_five: Vec<&FindingKind> = dataset
        .findings()
        .iter()
        .filter(|f| f.row == 5)
        .map(|f| &f.kind)
        .collect();
    assert_eq!(at_row_five, vec![&FindingKind::PatternMismatch]);
    assert!(dataset.find_by_key(EntityType::Roi, "ROI-006").is_some());
    assert!(dataset.find_by_key(EntityType::Slide, "SLIDE_042").is_none());
}

#[test]
fn test_optional_missing_foreign_key_is_an_orphan() {
    let mut template = cosmx();
    for field in &mut template.fields {
        if field.name == "Run_ID" {
            field.required = false;
        }
    }
    let mut rows = clean_rows();
    rows[3][5] = String::new();
    let dataset = run_with(rows, &template, mapping());

    let orphan = dataset
        .findings()
        .iter()
        .find(|f| matches!(f.kind, FindingKind::Orphan { .. }))
        .unwrap();
    assert_eq!(orphan.row, 4);
    assert_eq!(orphan.field, "Run_ID");
    assert_eq!(
        orphan.kind,
        FindingKind::Orphan {
            child: EntityType::Library,
            parent: EntityType::Run,
        }
    );
    assert!(kinds(&dataset).contains(&&FindingKind::MissingOptional));
}

#[test]
fn test_required_attribute_gates_construction() {
    let mut template = cosmx();
    template.fields.push(
        FieldSpec::new("Section_Thickness", FieldType::Int)
            .required()
            .attribute_of(EntityType::Slide),
    );
    let header: Vec<&str> = HEADER.iter().copied().chain(["Thickness"]).collect();
    let mut rows = clean_rows();
    for (i, r) in rows.iter_mut().enumerate() {
        r.push(if i == 2 { "thick".to_string() } else { "5".to_string() });
    }
    let table = RawTable::from_rows(header, rows).unwrap();
    let confirmed = mapping()
        .with("Section_Thickness", "Thickness")
        .confirm(&table, &template)
        .unwrap();
    let dataset = harmonize(&table, &confirmed, &template, &HarmonizeOptions::sequential()).unwrap();

    assert!(dataset.find_by_key(EntityType::Slide, "SLD-2024-0001").is_none());
    let slide = dataset.find_by_key(EntityType::Slide, "SLD-2024-0002").unwrap();
    assert_eq!(slide.attributes["Section_Thickness"], "5");
    let dangling = dataset
        .findings()
        .iter()
        .find(|f| matches!(f.kind, FindingKind::DanglingReference { .. }))
        .unwrap();
    assert_eq!((dangling.row, dangling.field.as_str()), (3, "Slide_ID"));
}

#[test]
fn test_join_paths() {
    let dataset = run_rows(clean_rows());
    let index = dataset.join_paths();
    assert_eq!(index.columns, EntityType::ALL.to_vec());
    assert_eq!(index.rows.len(), 4);
    let first: Vec<Option<&str>> = index.rows[0].iter().map(|c| c.as_deref()).collect();
    assert_eq!(
        first,
        vec![
            Some("CM-SPC-000001"),
            Some("CM-BLK-000001"),
            Some("CM-SLD-000001"),
            Some("CM-ROI-000003"),
            Some("CM-LIB-000003"),
            Some("CM-RUN-000001"),
        ]
    );
}

#[test]
fn test_rejects_mapping_for_another_template() {
    let table = RawTable::from_rows(HEADER.iter().copied(), clean_rows()).unwrap();
    let confirmed = mapping().confirm(&table, &cosmx()).unwrap();
    let mut other = cosmx();
    other.version = "9.9".to_string();
    let err = harmonize(&table, &confirmed, &other, &HarmonizeOptions::default()).unwrap_err();
    assert!(matches!(err, HarmonizationError::TemplateMismatch { .. }));

    let shuffled = RawTable::from_rows(
        ["Run", "Sample_Name", "Block", "Slide_Barcode", "ROI", "Library", "Platform"],
        vec![vec![""; 7]],
    )
    .unwrap();
    let err = harmonize(&shuffled, &confirmed, &cosmx(), &HarmonizeOptions::default()).unwrap_err();
    assert!(matches!(err, HarmonizationError::TableMismatch { .. }));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let mut rows = Vec::new();
    for i in 0..300 {
        rows.push(row(
            &format!("SPEC-2024-{:03}", i % 7),
            &format!("BLK-2024-{:03}", i % 7),
            &format!("SLD-2024-{:04}", i % 31),
            &format!("ROI-{:03}", i % 97),
            &format!("LIB-2024-{:03}", i),
            "RUN-2024-001",
        ));
    }
    let table = RawTable::from_rows(HEADER.iter().copied(), rows).unwrap();
    let template = cosmx();
    let confirmed = mapping().confirm(&table, &template).unwrap();
    let parallel = HarmonizeOptions {
        parallel: true,
        parallel_threshold: 1,
    };
    let a = harmonize(&table, &confirmed, &template, &parallel).unwrap();
    let b = harmonize(&table, &confirmed, &template, &HarmonizeOptions::sequential()).unwrap();
    assert_eq!(a, b);
}

mod normalization {
    use super::*;

    #[test]
    fn test_dates() {
        assert_eq!(parse_date("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("03/05/2024").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("2024/03/05").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("05.03.2024").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("20240305").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("05-Mar-2024").as_deref(), Some("2024-03-05"));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("03/05/24"), None);
    }

    #[test]
    fn test_date_field() {
        let field = field_spec("Collection_Date");
        let value = normalize_value(&field, None, "03/05/2024");
        assert_eq!(value.value.as_deref(), Some("2024-03-05"));
        assert_eq!(value.adjustments, vec![Adjustment::DateReformatted]);

        let bad = normalize_value(&field, None, "Q1 2024");
        assert_eq!(bad.defect, Some(Defect::InvalidDate));
    }

    #[test]
    fn test_enum_resolution_order() {
        let field = field_spec("Platform");
        let exact = normalize_value(&field, None, "Xenium");
        assert!(exact.adjustments.is_empty());
        let synonym = normalize_value(&field, None, "Visium HD");
        assert_eq!(synonym.value.as_deref(), Some("Visium_HD"));
        assert_eq!(synonym.adjustments, vec![Adjustment::SynonymResolved]);
        let folded = normalize_value(&field, None, "XENIUM");
        assert_eq!(folded.adjustments, vec![Adjustment::CaseCoerced]);
        let folded_synonym = normalize_value(&field, None, "visium hd");
        assert_eq!(folded_synonym.value.as_deref(), Some("Visium_HD"));
        assert_eq!(folded_synonym.adjustments, vec![Adjustment::SynonymResolved]);
        let unknown = normalize_value(&field, None, "MERSCOPE");
        assert_eq!(unknown.defect, Some(Defect::NotInVocabulary));
        assert_eq!(unknown.value, None);
    }

    #[test]
    fn test_missing_and_integer() {
        let field = FieldSpec::new("Lane", FieldType::Int);
        assert_eq!(normalize_value(&field, None, "   ").defect, Some(Defect::Missing));
        assert_eq!(normalize_value(&field, None, "-3").value.as_deref(), Some("-3"));
        assert_eq!(normalize_value(&field, None, "3.5").defect, Some(Defect::NotInteger));
    }

    #[test]
    fn test_free_text_synonyms() {
        let mut field = FieldSpec::new("Kit_Version", FieldType::String).with_case(CaseRule::Upper);
        field
            .synonyms
            .insert("v1 kit".to_string(), "Kit-v1".to_string());

        let synonym = normalize_value(&field, None, "v1 kit");
        assert_eq!(synonym.value.as_deref(), Some("KIT-V1"));
        assert_eq!(
            synonym.adjustments,
            vec![Adjustment::SynonymResolved, Adjustment::CaseCoerced]
        );

        let folded = normalize_value(&field, None, " V1 Kit");
        assert_eq!(folded.value.as_deref(), Some("KIT-V1"));
        assert_eq!(folded.adjustments[..2], [Adjustment::Trimmed, Adjustment::SynonymResolved]);

        let again = normalize_value(&field, None, "KIT-V1");
        assert!(again.adjustments.is_empty());

        let other = normalize_value(&field, None, "v2 kit");
        assert_eq!(other.value.as_deref(), Some("V2 KIT"));
        assert_eq!(other.adjustments, vec![Adjustment::CaseCoerced]);
    }

    #[test]
    fn test_pattern_after_case_rule() {
        let template = cosmx();
        let compiled = template.compile().unwrap();
        let index = template.field_index("Slide_ID").unwrap();
        let field = &template.fields[index];

        let ok = normalize_value(field, compiled.pattern(index), " sld-2024-0042 ");
        assert_eq!(ok.value.as_deref(), Some("SLD-2024-0042"));
        assert_eq!(ok.adjustments, vec![Adjustment::Trimmed, Adjustment::CaseCoerced]);

        let bad = normalize_value(field, compiled.pattern(index), "SLIDE_042");
        assert_eq!(bad.defect, Some(Defect::PatternMismatch));
        assert_eq!(bad.trimmed, "SLIDE_042");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let template = cosmx();
        let compiled = template.compile().unwrap();
        let custom = FieldSpec::new("Code", FieldType::String)
            .with_case(CaseRule::Lower)
            .with_id_format(IdFormat::serial("x", 2));
        let inputs = [" sld-2024-0042", "GeoMx", "cosmx", "03/05/2024", " v1.2 ", "12", "X-07"];
        for (index, field) in template.fields.iter().enumerate().chain([(usize::MAX, &custom)]) {
            for input in inputs {
                let first = normalize_value(field, compiled.pattern(index), input);
                if let Some(value) = first.value {
                    let second = normalize_value(field, compiled.pattern(index), &value);
                    assert_eq!(second.value.as_deref(), Some(value.as_str()), "{}", field.name);
                    assert!(second.adjustments.is_empty(), "{}: {value}", field.name);
                }
            }
        }
    }
}
