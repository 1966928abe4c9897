//! Entity construction, canonical id assignment and relationship linking.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use super::dataset::{CanonicalEntity, EntityRef, EntityRelationship};
use super::normalize::{Defect, NormalizedValue};
use super::{Finding, FindingKind};
use crate::ingest::RawTable;
use crate::schema::{EntityType, FieldBinding, RelationshipSpec, SchemaTemplate};

/// Normalized rows, addressable by template field index
pub(crate) struct Projection<'a> {
    pub template: &'a SchemaTemplate,
    pub table: &'a RawTable,
    /// Field index → (position in each normalized row, source column index)
    pub slots: Vec<Option<(usize, usize)>>,
    /// One entry per data row, one value per mapped field
    pub rows: Vec<Vec<NormalizedValue>>,
}

impl<'a> Projection<'a> {
    /// Normalized value of a field in a 0-based row; `None` when unmapped
    pub fn value(&self, row: usize, field_index: usize) -> Option<&NormalizedValue> {
        let (slot, _) = self.slots.get(field_index).copied().flatten()?;
        self.rows.get(row)?.get(slot)
    }

    /// Raw cell of a field in a 0-based row; empty when unmapped
    pub fn raw(&self, row: usize, field_index: usize) -> &'a str {
        self.slots
            .get(field_index)
            .copied()
            .flatten()
            .and_then(|(_, column)| self.table.cell(row + 1, column))
            .unwrap_or("")
    }

    fn valid(&self, row: usize, field_index: usize) -> Option<&str> {
        self.value(row, field_index)?.value.as_deref()
    }
}

struct EntityBuilder {
    attributes: BTreeMap<String, String>,
    source_rows: Vec<usize>,
}

/// Entities of one type keyed by natural key, plus which rows constructed them
struct TypedEntities {
    by_key: BTreeMap<String, EntityBuilder>,
    /// 0-based row → natural key, for rows that constructed an entity
    row_keys: Vec<Option<String>>,
}

/// Entity set and relationships produced from a projection
pub(crate) struct EntityGraph {
    pub entities: BTreeMap<EntityType, Vec<CanonicalEntity>>,
    pub relationships: Vec<EntityRelationship>,
}

/// Build one entity type.
///
/// A row constructs an entity when the key is valid and every required
/// attribute of the type is valid. Attributes are first-write-wins in row
/// order; later differing values become conflicts.
fn build_type(
    projection: &Projection<'_>,
    entity_type: EntityType,
    findings: &mut Vec<Finding>,
) -> TypedEntities {
    let template = projection.template;
    let row_count = projection.rows.len();
    let mut typed = TypedEntities {
        by_key: BTreeMap::new(),
        row_keys: vec![None; row_count],
    };

    let Some(key_index) = template.fields.iter().position(|f| f.is_key_of(entity_type)) else {
        return typed;
    };
    if projection.slots[key_index].is_none() {
        warn!(
            "{} key field '{}' is not mapped; no {} entities will be built",
            entity_type, template.fields[key_index].name, entity_type
        );
        return typed;
    }

    let attributes: Vec<usize> = template
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.binding == Some(FieldBinding::Attribute(entity_type)))
        .map(|(i, _)| i)
        .collect();

    for row in 0..row_count {
        let Some(key) = projection.valid(row, key_index) else {
            continue;
        };
        let complete = attributes
            .iter()
            .filter(|&&i| template.fields[i].required)
            .all(|&i| projection.valid(row, i).is_some());
        if !complete {
            continue;
        }

        let builder = typed
            .by_key
            .entry(key.to_string())
            .or_insert_with(|| EntityBuilder {
                attributes: BTreeMap::new(),
                source_rows: Vec::new(),
            });
        builder.source_rows.push(row + 1);

        for &i in &attributes {
            let Some(value) = projection.valid(row, i) else {
                continue;
            };
            let field = &template.fields[i];
            match builder.attributes.get(&field.name) {
                Some(kept) if kept != value => findings.push(Finding {
                    kind: FindingKind::AttributeConflict {
                        entity: entity_type,
                        natural_key: key.to_string(),
                        kept: kept.clone(),
                    },
                    field: field.name.clone(),
                    row: row + 1,
                    value: projection.raw(row, i).to_string(),
                    normalized: Some(value.to_string()),
                }),
                Some(_) => {}
                None => {
                    builder
                        .attributes
                        .insert(field.name.clone(), value.to_string());
                }
            }
        }
        typed.row_keys[row] = Some(key.to_string());
    }

    debug!(
        "{}: {} distinct key(s) from {} row(s)",
        entity_type,
        typed.by_key.len(),
        typed.row_keys.iter().filter(|k| k.is_some()).count()
    );
    typed
}

/// Canonical id of the `ordinal`-th (1-based) entity of a type
pub fn canonical_id(entity_type: EntityType, ordinal: usize) -> String {
    format!("CM-{}-{:06}", entity_type.id_prefix(), ordinal)
}

/// Per-relationship link state
struct LinkState {
    /// child key → (row, parent key) in row order
    links: BTreeMap<String, Vec<(usize, String)>>,
    /// Children whose foreign key problem is already reported elsewhere
    reported: BTreeSet<String>,
    dangling: usize,
}

fn link_relationship(
    projection: &Projection<'_>,
    relationship: &RelationshipSpec,
    typed: &BTreeMap<EntityType, TypedEntities>,
    dangling_seen: &mut BTreeSet<(usize, usize)>,
    findings: &mut Vec<Finding>,
) -> (LinkState, Option<usize>) {
    let parent_type = relationship.parent();
    let child_type = relationship.child();
    let mut state = LinkState {
        links: BTreeMap::new(),
        reported: BTreeSet::new(),
        dangling: 0,
    };

    let fk_index = projection
        .template
        .fields
        .iter()
        .position(|f| f.is_key_of(parent_type));
    let (Some(children), Some(parents)) = (typed.get(&child_type), typed.get(&parent_type)) else {
        return (state, fk_index);
    };
    let Some(fk_index) = fk_index else {
        return (state, None);
    };
    let fk_field = &projection.template.fields[fk_index];

    for (row, child_key) in children.row_keys.iter().enumerate() {
        let Some(child_key) = child_key else {
            continue;
        };
        let Some(fk) = projection.value(row, fk_index) else {
            continue;
        };
        match (&fk.value, fk.defect) {
            (Some(parent_key), _) if parents.by_key.contains_key(parent_key) => {
                state
                    .links
                    .entry(child_key.clone())
                    .or_default()
                    .push((row + 1, parent_key.clone()));
            }
            (Some(parent_key), _) => {
                state.dangling += 1;
                state.reported.insert(child_key.clone());
                if dangling_seen.insert((row, fk_index)) {
                    findings.push(Finding {
                        kind: FindingKind::DanglingReference {
                            parent: parent_type,
                        },
                        field: fk_field.name.clone(),
                        row: row + 1,
                        value: projection.raw(row, fk_index).to_string(),
                        normalized: Some(parent_key.clone()),
                    });
                }
            }
            (None, Some(Defect::Missing)) if !fk_field.required => {}
            (None, _) => {
                state.reported.insert(child_key.clone());
            }
        }
    }
    (state, Some(fk_index))
}

impl EntityGraph {
    /// Build entities and link them per the template's relationships
    pub fn build(projection: &Projection<'_>, findings: &mut Vec<Finding>) -> Self {
        let template = projection.template;

        let typed: BTreeMap<EntityType, TypedEntities> = template
            .entity_types()
            .into_iter()
            .map(|t| (t, build_type(projection, t, findings)))
            .collect();

        // Ids follow natural key order, independent of row order
        let ids: BTreeMap<(EntityType, &str), String> = typed
            .iter()
            .flat_map(|(&t, entities)| {
                entities
                    .by_key
                    .keys()
                    .enumerate()
                    .map(move |(i, key)| ((t, key.as_str()), canonical_id(t, i + 1)))
            })
            .collect();

        let mut edges: BTreeSet<(EntityRef, EntityRef)> = BTreeSet::new();
        let mut relationships = Vec::with_capacity(template.relationships.len());
        let mut dangling_seen = BTreeSet::new();

        for relationship in &template.relationships {
            let parent_type = relationship.parent();
            let child_type = relationship.child();
            let (state, fk_index) =
                link_relationship(projection, relationship, &typed, &mut dangling_seen, findings);
            let fk_name = fk_index
                .map(|i| template.fields[i].name.clone())
                .unwrap_or_default();

            let mut conflicts = 0;
            let mut orphans = 0;
            let mut relationship_edges = 0;
            let child_keys = typed
                .get(&child_type)
                .map(|t| t.by_key.iter().collect::<Vec<_>>())
                .unwrap_or_default();

            for (child_key, builder) in child_keys {
                let Some(links) = state.links.get(child_key) else {
                    if !state.reported.contains(child_key) {
                        orphans += 1;
                        let first_row = builder.source_rows.first().copied().unwrap_or(1);
                        findings.push(Finding {
                            kind: FindingKind::Orphan {
                                child: child_type,
                                parent: parent_type,
                            },
                            field: fk_name.clone(),
                            row: first_row,
                            value: fk_index
                                .map(|i| projection.raw(first_row - 1, i))
                                .unwrap_or("")
                                .to_string(),
                            normalized: None,
                        });
                    }
                    continue;
                };

                let distinct: BTreeSet<&str> = links.iter().map(|(_, p)| p.as_str()).collect();
                relationship_edges += distinct.len();
                if distinct.len() > 1 {
                    conflicts += 1;
                    let first_parent = &links[0].1;
                    if let Some((row, parent_key)) = links.iter().find(|(_, p)| p != first_parent) {
                        findings.push(Finding {
                            kind: FindingKind::MultipleParents {
                                child: child_type,
                                parent: parent_type,
                                parents: distinct.iter().map(|p| p.to_string()).collect(),
                            },
                            field: fk_name.clone(),
                            row: *row,
                            value: fk_index
                                .map(|i| projection.raw(row - 1, i))
                                .unwrap_or("")
                                .to_string(),
                            normalized: Some(parent_key.clone()),
                        });
                    }
                }

                for parent_key in distinct {
                    if let (Some(child_id), Some(parent_id)) = (
                        ids.get(&(child_type, child_key.as_str())),
                        ids.get(&(parent_type, parent_key)),
                    ) {
                        edges.insert((
                            EntityRef {
                                entity_type: child_type,
                                canonical_id: child_id.clone(),
                            },
                            EntityRef {
                                entity_type: parent_type,
                                canonical_id: parent_id.clone(),
                            },
                        ));
                    }
                }
            }

            let valid = state.dangling == 0 && conflicts == 0 && orphans == 0;
            if !valid {
                warn!(
                    "Relationship {} invalid: {} dangling, {} conflict(s), {} orphan(s)",
                    relationship, state.dangling, conflicts, orphans
                );
            }
            relationships.push(EntityRelationship {
                from: relationship.from,
                to: relationship.to,
                cardinality: relationship.cardinality,
                valid,
                edges: relationship_edges,
                dangling: state.dangling,
                conflicts,
                orphans,
            });
        }

        let mut parents: BTreeMap<&EntityRef, Vec<EntityRef>> = BTreeMap::new();
        let mut children: BTreeMap<&EntityRef, Vec<EntityRef>> = BTreeMap::new();
        for (child, parent) in &edges {
            parents.entry(child).or_default().push(parent.clone());
            children.entry(parent).or_default().push(child.clone());
        }

        let entities = typed
            .into_iter()
            .map(|(entity_type, typed)| {
                let list = typed
                    .by_key
                    .into_iter()
                    .enumerate()
                    .map(|(i, (natural_key, builder))| {
                        let me = EntityRef {
                            entity_type,
                            canonical_id: canonical_id(entity_type, i + 1),
                        };
                        let mut entity_parents = parents.get(&me).cloned().unwrap_or_default();
                        let mut entity_children = children.get(&me).cloned().unwrap_or_default();
                        entity_parents.sort();
                        entity_children.sort();
                        CanonicalEntity {
                            entity_type,
                            canonical_id: me.canonical_id,
                            natural_key,
                            attributes: builder.attributes,
                            parents: entity_parents,
                            children: entity_children,
                            source_rows: builder.source_rows,
                        }
                    })
                    .collect();
                (entity_type, list)
            })
            .collect();

        EntityGraph {
            entities,
            relationships,
        }
    }
}
