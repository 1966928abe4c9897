use std::collections::BTreeMap;

use serde::Serialize;

use super::Finding;
use crate::mapping::ConfirmedMapping;
use crate::schema::{Cardinality, EntityType};

/// Reference from one entity to another
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    /// Type of the referenced entity
    pub entity_type: EntityType,
    /// Canonical id of the referenced entity
    pub canonical_id: String,
}

/// A deduplicated, identity-bearing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    /// Entity type
    pub entity_type: EntityType,
    /// `CM-{PREFIX}-{ordinal:06}`
    pub canonical_id: String,
    /// Normalized key field value
    pub natural_key: String,
    /// Normalized attribute values by field name
    pub attributes: BTreeMap<String, String>,
    /// Linked parents, sorted
    pub parents: Vec<EntityRef>,
    /// Linked children, sorted
    pub children: Vec<EntityRef>,
    /// Data rows that constructed this entity, ascending
    pub source_rows: Vec<usize>,
}

impl CanonicalEntity {
    /// Reference to this entity
    pub fn to_ref(&self) -> EntityRef {
        EntityRef {
            entity_type: self.entity_type,
            canonical_id: self.canonical_id.clone(),
        }
    }

    /// Parents of a given type
    pub fn parents_of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &EntityRef> {
        self.parents
            .iter()
            .filter(move |p| p.entity_type == entity_type)
    }
}

/// Computed state of one declared relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelationship {
    /// Source entity type
    pub from: EntityType,
    /// Target entity type
    pub to: EntityType,
    /// Direction
    pub cardinality: Cardinality,
    /// No dangling references, no multi-parent children, no orphans
    pub valid: bool,
    /// Distinct child → parent links
    pub edges: usize,
    /// Rows with an unresolved foreign key
    pub dangling: usize,
    /// Children linked to more than one parent
    pub conflicts: usize,
    /// Children never linked
    pub orphans: usize,
}

/// Entity counts and relationship snapshot of a run. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonizationSummary {
    /// Data rows in the source table
    pub total_rows: usize,
    /// Instance count for every entity type (zero when absent)
    pub entity_counts: BTreeMap<EntityType, usize>,
    /// Relationship validity
    pub relationships: Vec<EntityRelationship>,
}

impl HarmonizationSummary {
    /// Whether every relationship is valid
    pub fn all_relationships_valid(&self) -> bool {
        self.relationships.iter().all(|r| r.valid)
    }
}

/// Distinct lineage tuples of canonical ids, one column per entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinIndex {
    /// Entity types, in hierarchy order
    pub columns: Vec<EntityType>,
    /// Sorted, distinct tuples; `None` where the lineage has no entity of that type
    pub rows: Vec<Vec<Option<String>>>,
}

/// Output of [`harmonize`](super::harmonize)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonizedDataset {
    pub(crate) template_id: String,
    pub(crate) template_version: String,
    pub(crate) total_rows: usize,
    pub(crate) mapping: ConfirmedMapping,
    pub(crate) entities: BTreeMap<EntityType, Vec<CanonicalEntity>>,
    pub(crate) relationships: Vec<EntityRelationship>,
    pub(crate) findings: Vec<Finding>,
}

impl HarmonizedDataset {
    /// Template id
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Template version
    pub fn template_version(&self) -> &str {
        &self.template_version
    }

    /// Data rows in the source table
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// The mapping the run used
    pub fn mapping(&self) -> &ConfirmedMapping {
        &self.mapping
    }

    /// Entity types the template defines, in hierarchy order
    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.entities.keys().copied()
    }

    /// Entities of a type, sorted by canonical id
    pub fn entities(&self, entity_type: EntityType) -> &[CanonicalEntity] {
        self.entities
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up an entity by canonical id
    pub fn entity(&self, entity_type: EntityType, canonical_id: &str) -> Option<&CanonicalEntity> {
        let entities = self.entities(entity_type);
        entities
            .binary_search_by(|e| e.canonical_id.as_str().cmp(canonical_id))
            .ok()
            .map(|i| &entities[i])
    }

    /// Look up an entity by natural key
    pub fn find_by_key(&self, entity_type: EntityType, natural_key: &str) -> Option<&CanonicalEntity> {
        self.entities(entity_type)
            .iter()
            .find(|e| e.natural_key == natural_key)
    }

    /// Relationship states in template order
    pub fn relationships(&self) -> &[EntityRelationship] {
        &self.relationships
    }

    /// Row and entity observations, in discovery order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Derive the summary
    pub fn summary(&self) -> HarmonizationSummary {
        let entity_counts = EntityType::ALL
            .iter()
            .map(|&t| (t, self.entities(t).len()))
            .collect();
        HarmonizationSummary {
            total_rows: self.total_rows,
            entity_counts,
            relationships: self.relationships.clone(),
        }
    }

    /// Derive the cross-entity lineage.
    ///
    /// Every leaf entity (one without children) is expanded through its
    /// ancestors; each combination of ancestors becomes one tuple.
    pub fn join_paths(&self) -> JoinIndex {
        let columns: Vec<EntityType> = self.entity_types().collect();
        let mut rows: Vec<Vec<Option<String>>> = self
            .entities
            .values()
            .flatten()
            .filter(|e| e.children.is_empty())
            .flat_map(|leaf| self.lineage(leaf))
            .map(|tuple| columns.iter().map(|t| tuple.get(t).cloned()).collect())
            .collect();
        rows.sort();
        rows.dedup();
        JoinIndex { columns, rows }
    }

    fn lineage(&self, entity: &CanonicalEntity) -> Vec<BTreeMap<EntityType, String>> {
        let mut tuples = vec![BTreeMap::from([(
            entity.entity_type,
            entity.canonical_id.clone(),
        )])];

        let mut by_type: BTreeMap<EntityType, Vec<&EntityRef>> = BTreeMap::new();
        for parent in &entity.parents {
            by_type.entry(parent.entity_type).or_default().push(parent);
        }

        for parents in by_type.values() {
            let options: Vec<BTreeMap<EntityType, String>> = parents
                .iter()
                .filter_map(|p| self.entity(p.entity_type, &p.canonical_id))
                .flat_map(|p| self.lineage(p))
                .collect();
            if options.is_empty() {
                continue;
            }
            tuples = tuples
                .iter()
                .flat_map(|tuple| options.iter().filter_map(move |option| merge(tuple, option)))
                .collect();
        }
        tuples
    }
}

/// Union of two partial tuples; `None` when they disagree on a shared type
fn merge(
    left: &BTreeMap<EntityType, String>,
    right: &BTreeMap<EntityType, String>,
) -> Option<BTreeMap<EntityType, String>> {
    let mut merged = left.clone();
    for (entity_type, id) in right {
        match merged.get(entity_type) {
            Some(existing) if existing != id => return None,
            Some(_) => {}
            None => {
                merged.insert(*entity_type, id.clone());
            }
        }
    }
    Some(merged)
}
