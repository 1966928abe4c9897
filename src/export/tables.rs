//! CSV rendering of canonical tables, the join index and the issue list.

use csv::{Terminator, WriterBuilder};

use super::ExportError;
use crate::harmonize::{HarmonizedDataset, JoinIndex};
use crate::schema::{EntityType, SchemaTemplate};
use crate::validator::ValidationOutcome;

/// File name of the canonical table of one entity type
pub fn canonical_table_name(entity_type: EntityType) -> String {
    format!("canonical_{}.csv", entity_type.table_name())
}

/// Column name holding canonical ids of an entity type
fn id_column(entity_type: EntityType) -> String {
    format!("{}_id", entity_type.table_name())
}

fn write_records<I, R>(records: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::IoError(e.into_error()))
}

/// `canonical_<type>.csv`: id, natural key, one id column per parent type,
/// then attributes in template order. Rows follow canonical id order.
pub(crate) fn canonical_table(
    dataset: &HarmonizedDataset,
    template: &SchemaTemplate,
    entity_type: EntityType,
) -> Result<Vec<u8>, ExportError> {
    let parent_types = template.parent_types(entity_type);
    let attributes: Vec<&str> = template
        .attribute_fields(entity_type)
        .map(|f| f.name.as_str())
        .collect();

    let mut header = vec!["canonical_id".to_string(), "natural_key".to_string()];
    header.extend(parent_types.iter().map(|&p| id_column(p)));
    header.extend(attributes.iter().map(|a| a.to_string()));

    let rows = dataset.entities(entity_type).iter().map(|entity| {
        let mut record = vec![entity.canonical_id.clone(), entity.natural_key.clone()];
        for &parent in &parent_types {
            let ids: Vec<&str> = entity
                .parents_of_type(parent)
                .map(|p| p.canonical_id.as_str())
                .collect();
            record.push(ids.join("|"));
        }
        for attribute in &attributes {
            record.push(entity.attributes.get(*attribute).cloned().unwrap_or_default());
        }
        record
    });

    write_records(std::iter::once(header).chain(rows))
}

/// `cross_modal_join_index.csv`: one id column per entity type
pub(crate) fn join_index(index: &JoinIndex) -> Result<Vec<u8>, ExportError> {
    let header: Vec<String> = index.columns.iter().map(|&t| id_column(t)).collect();
    let rows = index
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.clone().unwrap_or_default()).collect::<Vec<_>>());
    write_records(std::iter::once(header).chain(rows))
}

/// `validation_issues.csv`
pub(crate) fn issue_list(outcome: &ValidationOutcome) -> Result<Vec<u8>, ExportError> {
    let header = [
        "id",
        "severity",
        "rule",
        "row",
        "column",
        "value",
        "message",
        "suggestion",
    ]
    .map(String::from)
    .to_vec();
    let rows = outcome.issues().iter().map(|issue| {
        vec![
            issue.id.clone(),
            issue.severity.to_string(),
            issue.rule.to_string(),
            issue.row.map(|r| r.to_string()).unwrap_or_default(),
            issue.column.clone().unwrap_or_default(),
            issue.value.clone().unwrap_or_default(),
            issue.message.clone(),
            issue.suggestion.clone().unwrap_or_default(),
        ]
    });
    write_records(std::iter::once(header).chain(rows))
}
