use super::*;
use crate::harmonize::{harmonize, HarmonizeOptions};
use crate::mapping::FieldMapping;
use crate::schema::{EntityType, FieldSpec, FieldType, SchemaRegistry};

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

fn row(slide: &str, roi: &str, library: &str, platform: &str) -> Vec<String> {
    [
        "SPEC-2024-001",
        "BLK-2024-001",
        slide,
        roi,
        library,
        "RUN-2024-001",
        platform,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn clean_rows() -> Vec<Vec<String>> {
    vec![
        row("SLD-2024-0001", "ROI-001", "LIB-2024-001", "CosMx"),
        row("SLD-2024-0001", "ROI-002", "LIB-2024-002", "CosMx"),
        row("SLD-2024-0002", "ROI-003", "LIB-2024-003", "CosMx"),
    ]
}

fn check(
    rows: Vec<Vec<String>>,
    options: &ValidationOptions,
) -> (HarmonizedDataset, ValidationOutcome) {
    check_with(&cosmx(), HEADER, rows, mapping(), options)
}

fn check_with(
    template: &SchemaTemplate,
    header: &[&str],
    rows: Vec<Vec<String>>,
    draft: FieldMapping,
    options: &ValidationOptions,
) -> (HarmonizedDataset, ValidationOutcome) {
    let table = RawTable::from_rows(header.iter().copied(), rows).unwrap();
    let confirmed = draft.confirm(&table, template).unwrap();
    let dataset = harmonize(&table, &confirmed, template, &HarmonizeOptions::sequential()).unwrap();
    let outcome = validate(&dataset, &table, template, &Ruleset::latest(), options).unwrap();
    (dataset, outcome)
}

fn rules(outcome: &ValidationOutcome) -> Vec<&'static str> {
    outcome.issues().iter().map(|i| i.rule.as_str()).collect()
}

#[test]
fn test_clean_table_has_only_infos() {
    let (_, outcome) = check(clean_rows(), &ValidationOptions::default());
    assert!(!outcome.is_blocked());
    assert_eq!(outcome.counts().blockers, 0);
    assert_eq!(outcome.counts().warnings, 0);

    let infos: Vec<(&str, &str)> = outcome
        .issues()
        .iter()
        .map(|i| (i.id.as_str(), i.message.as_str()))
        .collect();
    assert_eq!(
        infos,
        vec![
            ("I001", "Optional field 'Tissue_Type' is not mapped"),
            ("I002", "Optional field 'Collection_Date' is not mapped"),
            ("I003", "Optional field 'Kit_Version' is not mapped"),
            ("I004", "Optional field 'Notes' is not mapped"),
        ]
    );
    assert!(outcome.issues().iter().all(|i| i.row.is_none()));
}

#[test]
fn test_format_suggestion_with_reference_year() {
    let mut rows = clean_rows();
    rows.push(row("SLIDE_042", "ROI-004", "LIB-2024-004", "CosMx"));
    let options = ValidationOptions::default().with_reference_year(2024);
    let (_, outcome) = check(rows, &options);

    let blockers: Vec<&ValidationIssue> = outcome.with_severity(Severity::Blocker).collect();
    assert_eq!(blockers.len(), 1);
    let issue = blockers[0];
    assert_eq!(issue.id, "B001");
    assert_eq!(issue.rule, RuleId::Format001);
    assert_eq!(issue.row, Some(4));
    assert_eq!(issue.column.as_deref(), Some("Slide_Barcode"));
    assert_eq!(issue.value.as_deref(), Some("SLIDE_042"));
    assert_eq!(issue.suggestion.as_deref(), Some("SLD-2024-0042"));
    assert_eq!(issue.message, "Value 'SLIDE_042' does not match format SLD-YYYY-####");
}

#[test]
fn test_format_suggestion_infers_year_from_column() {
    let mut rows = clean_rows();
    rows.push(row("slide 42", "ROI-004", "LIB-2024-004", "CosMx"));
    let (_, outcome) = check(rows, &ValidationOptions::default());
    let issue = outcome.with_rule(RuleId::Format001).next().unwrap();
    assert_eq!(issue.suggestion.as_deref(), Some("SLD-2024-0042"));
}

#[test]
fn test_format_suggestion_without_year_context() {
    let rows = vec![row("SLIDE_042", "ROI-001", "LIB-2024-001", "CosMx")];
    let (_, outcome) = check(rows, &ValidationOptions::default());
    let issue = outcome.with_rule(RuleId::Format001).next().unwrap();
    assert_eq!(
        issue.suggestion.as_deref(),
        Some("Reformat to pattern SLD-YYYY-####")
    );
    assert_eq!(outcome.counts().blockers, 1);
}

#[test]
fn test_unresolved_reference_is_one_blocker() {
    let mut template = cosmx();
    template.fields.push(
        FieldSpec::new("Slide_Lot", FieldType::String)
            .required()
            .attribute_of(EntityType::Slide),
    );
    let header: Vec<&str> = HEADER.iter().copied().chain(["Lot"]).collect();
    let mut rows = clean_rows();
    rows.push(row("SLD-2024-0042", "ROI-004", "LIB-2024-004", "CosMx"));
    for (i, r) in rows.iter_mut().enumerate() {
        r.push(if i == 3 { String::new() } else { "L7".to_string() });
    }
    let draft = mapping().with("Slide_Lot", "Lot");
    let (dataset, outcome) =
        check_with(&template, &header, rows, draft, &ValidationOptions::default());

    assert!(dataset.find_by_key(EntityType::Slide, "SLD-2024-0042").is_none());
    let refs: Vec<&ValidationIssue> = outcome
        .issues()
        .iter()
        .filter(|i| i.rule.category() == RuleCategory::RefIntegrity)
        .collect();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].rule, RuleId::RefIntegrity001);
    assert_eq!(refs[0].row, Some(4));
    assert_eq!(refs[0].column.as_deref(), Some("Slide_Barcode"));
    assert_eq!(refs[0].value.as_deref(), Some("SLD-2024-0042"));
    assert_eq!(refs[0].message, "Slide 'SLD-2024-0042' does not exist");
    assert_eq!(rules(&outcome)[..2], ["REQUIRED_FIELD_001", "REF_INTEGRITY_001"]);
}

#[test]
fn test_issue_order_and_ids() {
    let mut rows = clean_rows();
    rows[0][6] = "cosmx".to_string();
    rows[1][2] = " SLD-2024-0001".to_string();
    rows.push(row("SLD-2024-0002", "", "LIB-2024-005", "CosMx"));
    rows.push(row("SLIDE_042", "ROI-006", "LIB-2024-006", "CosMx"));
    let mut unknown_run = row("SLD-2024-0001", "ROI-007", "LIB-2024-007", "Xenum");
    unknown_run[5] = "RUN-2024-009".to_string();
    rows.push(unknown_run);
    let (_, outcome) = check(rows, &ValidationOptions::default());

    let summary: Vec<(&str, &str, Option<usize>)> = outcome
        .issues()
        .iter()
        .filter(|i| i.row.is_some())
        .map(|i| (i.id.as_str(), i.rule.as_str(), i.row))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("B001", "REQUIRED_FIELD_001", Some(4)),
            ("B002", "FORMAT_001", Some(5)),
            ("B003", "REF_INTEGRITY_001", Some(6)),
            ("B004", "ENUM_VALIDATION_002", Some(6)),
            ("W001", "WHITESPACE_001", Some(2)),
            ("W002", "CASE_NORMALIZATION_001", Some(1)),
        ]
    );

    let dangling = outcome.with_rule(RuleId::RefIntegrity001).next().unwrap();
    assert_eq!(dangling.column.as_deref(), Some("Run"));
    assert_eq!(dangling.message, "Run 'RUN-2024-009' does not exist");

    let last = outcome.issues().last().unwrap();
    assert_eq!((last.id.as_str(), last.rule), ("I004", RuleId::OptionalField002));
    assert_eq!(outcome.counts().total(), outcome.issues().len());
}

#[test]
fn test_vocabulary_suggestion() {
    let mut rows = clean_rows();
    rows[2][6] = "Xenum".to_string();
    let (_, outcome) = check(rows, &ValidationOptions::default());
    let issue = outcome.with_rule(RuleId::EnumValidation002).next().unwrap();
    assert_eq!(issue.suggestion.as_deref(), Some("Xenium"));
    assert!(issue.message.contains("allowed: CosMx, GeoMx_DSP, Visium_HD, Xenium, Illumina"));

    let mut rows = clean_rows();
    rows[2][6] = "MERSCOPE".to_string();
    let (_, outcome) = check(rows, &ValidationOptions::default());
    let issue = outcome.with_rule(RuleId::EnumValidation002).next().unwrap();
    assert_eq!(issue.suggestion, None);
}

#[test]
fn test_warnings_carry_corrected_value() {
    let mut rows = clean_rows();
    rows[0][6] = "cosmx".to_string();
    rows[1][6] = "Visium HD".to_string();
    let (_, outcome) = check(rows, &ValidationOptions::default());

    let case = outcome.with_rule(RuleId::CaseNormalization001).next().unwrap();
    assert_eq!(case.suggestion.as_deref(), Some("CosMx"));
    let synonym = outcome.with_rule(RuleId::EnumValidation001).next().unwrap();
    assert_eq!(synonym.suggestion.as_deref(), Some("Visium_HD"));
    assert_eq!(synonym.severity, Severity::Warning);
    assert!(!outcome.is_blocked());
}

#[test]
fn test_validation_is_repeatable() {
    let mut rows = clean_rows();
    rows[0][6] = "GeoMx".to_string();
    rows.push(row("SLIDE_042", "ROI-009", "LIB-2024-009", "CosMx"));
    let (_, first) = check(rows.clone(), &ValidationOptions::default());
    let (_, second) = check(rows, &ValidationOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_unknown_ruleset() {
    let err = Ruleset::by_version("0.9.0").unwrap_err();
    assert!(matches!(err, ValidationError::UnknownRuleset { .. }));
    assert_eq!(err.to_string(), "Unknown ruleset version '0.9.0' (available: 1.0.0)");
    assert_eq!(Ruleset::by_version("1.0.0").unwrap().version(), RULESET_VERSION);
}

#[test]
fn test_ruleset_severities() {
    let ruleset = Ruleset::latest();
    assert_eq!(ruleset.rules().count(), RuleId::ALL.len());
    for id in RuleId::ALL {
        let expected = match id.category() {
            RuleCategory::OptionalField => Severity::Info,
            RuleCategory::DateFormat
            | RuleCategory::Whitespace
            | RuleCategory::CaseNormalization
            | RuleCategory::AttributeConflict => Severity::Warning,
            RuleCategory::EnumValidation if id == RuleId::EnumValidation001 => Severity::Warning,
            _ => Severity::Blocker,
        };
        assert_eq!(ruleset.severity(id), expected, "{id}");
    }
}

#[test]
fn test_rejects_mismatched_inputs() {
    let template = cosmx();
    let table = RawTable::from_rows(HEADER.iter().copied(), clean_rows()).unwrap();
    let confirmed = mapping().confirm(&table, &template).unwrap();
    let dataset = harmonize(&table, &confirmed, &template, &HarmonizeOptions::default()).unwrap();

    let mut other = template.clone();
    other.id = "geomx".to_string();
    let err = validate(&dataset, &table, &other, &Ruleset::latest(), &ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(err, ValidationError::TemplateMismatch { .. }));

    let shorter = RawTable::from_rows(HEADER.iter().copied(), vec![clean_rows().remove(0)]).unwrap();
    let err = validate(&dataset, &shorter, &template, &Ruleset::latest(), &ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(err, ValidationError::TableMismatch { expected: 3, found: 1 }));
}

#[test]
fn test_issue_json_shape() {
    let mut rows = clean_rows();
    rows[0][6] = "GeoMx".to_string();
    let (_, outcome) = check(rows, &ValidationOptions::default());
    let warning = outcome.with_severity(Severity::Warning).next().unwrap();
    let json = serde_json::to_value(warning).unwrap();
    assert_eq!(json["rule"], "ENUM_VALIDATION_001");
    assert_eq!(json["severity"], "warning");
    assert_eq!(json["suggestion"], "GeoMx_DSP");
    assert_eq!(json["row"], 1);
}

#[test]
fn test_report_display() {
    let mut rows = clean_rows();
    rows.push(row("SLIDE_042", "ROI-004", "LIB-2024-004", "CosMx"));
    let options = ValidationOptions::default().with_reference_year(2024);
    let (dataset, outcome) = check(rows, &options);
    let report = ValidationReport::new(&dataset, &outcome);
    let output = format!("{}", report);

    assert!(output.contains("Template: cosmx@1.2"));
    assert!(output.contains("Ruleset: 1.0.0"));
    assert!(output.contains("  Slide: 2"));
    assert!(output.contains("[✓] Specimen has_many Block (1 edges)"));
    assert!(output.contains("[✗] B001 FORMAT_001 (row 4, Slide_Barcode)"));
    assert!(output.contains("      suggestion: SLD-2024-0042"));
    assert!(output.contains("[ℹ] I001 OPTIONAL_FIELD_002 (mapping)"));
    assert!(output.contains("Summary: 1 blockers, 0 warnings, 4 info"));
    assert!(output.ends_with("Validation BLOCKED\n"));
    assert!(report.has_blockers());
}
