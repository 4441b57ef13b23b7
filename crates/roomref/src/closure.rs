//
// closure.rs
//
// Dependency-closure resolver: reverse-computes the room of a datasheet
// from its field schema and the external reverse-reference index
//

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};

use crate::formula::extract_referenced_field_ids;
use crate::rel_index::RoomResourceIndex;
use crate::schema::{DocumentSchema, FieldType};

/// Read access to persisted document field schemas.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Schema of a document; `None` when the document no longer exists.
    async fn schema(&self, document_id: &str) -> Result<Option<DocumentSchema>>;
}

/// The externally maintained forward field-reference index, read in reverse:
/// which other documents' fields reference `(document_id, field_id)`.
#[async_trait]
pub trait ReverseReferenceIndex: Send + Sync {
    /// Referencing documents mapped to the referencing field ids on each;
    /// `None` or empty when nothing references the field.
    async fn reverse_references(
        &self,
        document_id: &str,
        field_id: &str,
    ) -> Result<Option<IndexMap<String, Vec<String>>>>;
}

/// Reverse-computes, from one document's field definitions, the transitive
/// set of documents its room depends on.
///
/// The index this feeds is a cache; the schema is the source of truth, so
/// the resolver can always rebuild an expired or missing association from
/// scratch. Worst case is O(documents x fields) over a densely cross-linked
/// schema graph, which is acceptable because this runs per cache miss, not
/// per change.
pub struct DependencyClosureResolver {
    index: Arc<RoomResourceIndex>,
    schemas: Arc<dyn SchemaProvider>,
    references: Arc<dyn ReverseReferenceIndex>,
}

impl DependencyClosureResolver {
    pub fn new(
        index: Arc<RoomResourceIndex>,
        schemas: Arc<dyn SchemaProvider>,
        references: Arc<dyn ReverseReferenceIndex>,
    ) -> Self {
        Self {
            index,
            schemas,
            references,
        }
    }

    /// Every datasheet room affected by changes to the given resources.
    ///
    /// Resources with an indexed room set contribute their datasheet-typed
    /// rooms; a resource with no association gets its room reverse-computed
    /// from schema (repairing the index as a side effect).
    pub async fn effect_datasheet_ids(&self, resource_ids: &[String]) -> Result<Vec<String>> {
        let mut all: IndexSet<String> = IndexSet::new();
        for resource_id in resource_ids {
            let room_ids = self.index.datasheet_room_ids(resource_id, true).await?;
            if room_ids.is_empty() {
                log::debug!("no room for {}, reverse computing", resource_id);
                all.extend(self.reverse_compute_datasheet_room(resource_id).await?);
                continue;
            }
            all.extend(room_ids);
        }
        Ok(all.into_iter().collect())
    }

    /// Reverse-compute the full resource closure of a datasheet's room.
    ///
    /// Collects the datasheets this document links out to, persists that
    /// partial closure immediately, then chases each neighbour's affected
    /// fields (link + lookup + formula) upward through the reverse-reference
    /// index. The closure set is the sole cycle guard: a document id already
    /// present is never processed again, so mutually linked or
    /// self-referential schemas terminate.
    pub async fn reverse_compute_datasheet_room(&self, document_id: &str) -> Result<Vec<String>> {
        let schema = self
            .schemas
            .schema(document_id)
            .await?
            .unwrap_or_else(|| {
                log::warn!("no schema for {}, treating as self-contained", document_id);
                DocumentSchema::default()
            });

        // Link fields, grouped by the datasheet they point into. The field
        // recorded per neighbour is the brother field: the field on the
        // other side that observes this relation. Self-links contribute
        // nothing beyond the document itself.
        let mut foreign: IndexMap<String, Vec<String>> = IndexMap::new();
        for field in schema.fields_of_type(FieldType::Link) {
            let Some(foreign_id) = field.property.foreign_datasheet_id.as_deref() else {
                continue;
            };
            if foreign_id == document_id {
                continue;
            }
            let entry = foreign.entry(foreign_id.to_string()).or_default();
            if let Some(brother) = field.property.brother_field_id.clone() {
                entry.push(brother);
            }
        }

        let mut closure: IndexSet<String> = IndexSet::new();
        closure.insert(document_id.to_string());
        closure.extend(foreign.keys().cloned());

        // Persist what is known so far; even a partial closure is a valid
        // association and a head start for the next attempt
        let seed: Vec<String> = closure.iter().cloned().collect();
        self.index.create_or_update_rel(document_id, &seed).await?;
        if foreign.is_empty() {
            return Ok(seed);
        }

        for (foreign_id, link_field_ids) in &foreign {
            let Some(foreign_schema) = self.schemas.schema(foreign_id).await? else {
                continue;
            };

            // Nothing further to chase unless this neighbour links to a
            // document outside the closure under construction
            let links_outward = foreign_schema.fields_of_type(FieldType::Link).any(|f| {
                f.property
                    .foreign_datasheet_id
                    .as_deref()
                    .is_some_and(|id| !closure.contains(id))
            });
            if !links_outward {
                continue;
            }

            // LookUp fields reading through one of the affected link fields
            let lookup_field_ids: Vec<String> = foreign_schema
                .fields_of_type(FieldType::LookUp)
                .filter(|f| {
                    f.property
                        .related_link_field_id
                        .as_deref()
                        .is_some_and(|id| link_field_ids.iter().any(|l| l == id))
                })
                .map(|f| f.id.clone())
                .collect();

            let mut effect_field_ids = link_field_ids.clone();
            effect_field_ids.extend(lookup_field_ids);

            // Formula fields whose expression references an affected field
            let formula_field_ids: Vec<String> = foreign_schema
                .fields_of_type(FieldType::Formula)
                .filter_map(|f| {
                    let expression = f.property.expression.as_deref()?;
                    let referenced = extract_referenced_field_ids(expression);
                    referenced
                        .iter()
                        .any(|id| effect_field_ids.contains(id))
                        .then(|| f.id.clone())
                })
                .collect();
            effect_field_ids.extend(formula_field_ids);

            log::debug!(
                "tracing {} affected fields of {} upward",
                effect_field_ids.len(),
                foreign_id
            );
            self.trace_upward(foreign_id, &effect_field_ids, &mut closure)
                .await?;
        }

        Ok(closure.into_iter().collect())
    }

    /// Chase inverse references upward from a document's affected fields,
    /// growing the closure.
    ///
    /// Explicit worklist rather than recursion: depth is bounded only by the
    /// number of distinct documents in the reference graph, and the closure
    /// set doubles as the visited guard (membership-before-insert), so each
    /// document is expanded at most once and traversal terminates.
    async fn trace_upward(
        &self,
        document_id: &str,
        field_ids: &[String],
        closure: &mut IndexSet<String>,
    ) -> Result<()> {
        let mut worklist: Vec<(String, Vec<String>)> =
            vec![(document_id.to_string(), field_ids.to_vec())];
        while let Some((doc_id, field_ids)) = worklist.pop() {
            for field_id in &field_ids {
                let Some(referrers) =
                    self.references.reverse_references(&doc_id, field_id).await?
                else {
                    continue;
                };
                for (other_doc_id, other_field_ids) in referrers {
                    if !closure.insert(other_doc_id.clone()) {
                        continue;
                    }
                    log::trace!(
                        "field {}.{} referenced by {}, joining closure",
                        doc_id,
                        field_id,
                        other_doc_id
                    );
                    worklist.push((other_doc_id, other_field_ids));
                }
            }
        }
        Ok(())
    }
}
