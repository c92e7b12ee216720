//! Generic repository over the document store.
//!
//! One `Repository<E>` serves every entity; the per-entity differences
//! (collection, hidden fields, relations, stats shape) come from
//! `E::DESCRIPTOR`.

use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use pms_shared::types::Pagination;

use super::document_store::{DocumentRecord, DocumentStore};
use crate::entity::{Entity, MetricKind, Relation};
use crate::error::DomainError;
use crate::query::filter::lookup;
use crate::query::{Filter, ListQuery, QueryEngine, Scope, SortKey, StoreQuery};

/// One page of public documents
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn collection(&self) -> &'static str {
        E::DESCRIPTOR.collection
    }

    pub async fn list(&self, query: &ListQuery, scope: &Scope) -> Result<Page, DomainError> {
        let store_query = QueryEngine::build(E::DESCRIPTOR, query, scope);
        let docs = self.store.find(self.collection(), &store_query).await?;
        let total = self.store.count(self.collection(), &store_query.filter).await?;

        let mut data: Vec<Value> = docs.into_iter().map(strip_hidden::<E>).collect();
        match &query.fields {
            Some(fields) => {
                data = data
                    .into_iter()
                    .map(|doc| QueryEngine::project(doc, fields))
                    .collect();
            }
            None => self.join_relations(&mut data).await?,
        }

        Ok(Page {
            data,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    /// Raw lookup, soft-deleted documents included
    pub async fn find(&self, id: Uuid) -> Result<Option<E>, DomainError> {
        self.store
            .find_by_id(self.collection(), id)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(DomainError::from)
    }

    /// Missing and soft-deleted documents are both reported as not found
    pub async fn find_active(&self, id: Uuid) -> Result<E, DomainError> {
        match self.find(id).await? {
            Some(entity) if entity.is_active() => Ok(entity),
            _ => Err(DomainError::NotFound(E::DESCRIPTOR.label)),
        }
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<E>, DomainError> {
        let query = StoreQuery {
            filter,
            sort: SortKey::default(),
            skip: 0,
            limit: 1,
        };
        let docs = self.store.find(self.collection(), &query).await?;
        docs.into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(DomainError::from)
    }

    pub async fn find_all(&self, filter: Filter) -> Result<Vec<E>, DomainError> {
        let total = self.store.count(self.collection(), &filter).await?;
        let query = StoreQuery {
            filter,
            sort: SortKey::default(),
            skip: 0,
            limit: total.max(1),
        };
        self.store
            .find(self.collection(), &query)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(DomainError::from))
            .collect()
    }

    pub async fn insert(&self, entity: &E) -> Result<(), DomainError> {
        let record = self.record(entity)?;
        self.store.insert(self.collection(), record).await
    }

    pub async fn save(&self, entity: &E) -> Result<(), DomainError> {
        let record = self.record(entity)?;
        self.store.replace(self.collection(), record).await
    }

    fn record(&self, entity: &E) -> Result<DocumentRecord, DomainError> {
        Ok(DocumentRecord {
            id: entity.id(),
            tenant_id: entity.tenant_id(),
            created_at: entity.created_at(),
            body: serde_json::to_value(entity)?,
        })
    }

    /// Serialized form safe to return or cache
    pub fn to_public(&self, entity: &E) -> Result<Value, DomainError> {
        Ok(strip_hidden::<E>(serde_json::to_value(entity)?))
    }

    /// Public form with related summaries joined in
    pub async fn detail(&self, entity: &E) -> Result<Value, DomainError> {
        let mut docs = vec![self.to_public(entity)?];
        self.join_relations(&mut docs).await?;
        Ok(docs.pop().unwrap_or(Value::Null))
    }

    async fn join_relations(&self, docs: &mut [Value]) -> Result<(), DomainError> {
        for relation in E::DESCRIPTOR.relations {
            let ids: BTreeSet<Uuid> = docs
                .iter()
                .filter_map(|doc| reference_id(doc, relation.path))
                .collect();
            if ids.is_empty() {
                continue;
            }
            let ids: Vec<Uuid> = ids.into_iter().collect();
            let related = self.store.find_by_ids(relation.collection, &ids).await?;
            let summaries: HashMap<String, Value> = related
                .iter()
                .filter_map(|doc| {
                    let id = doc.get("id")?.as_str()?.to_string();
                    Some((id, summary(doc, relation)))
                })
                .collect();

            for doc in docs.iter_mut() {
                let Some(id) = reference_id(doc, relation.path) else {
                    continue;
                };
                if let (Some(summary), Value::Object(map)) =
                    (summaries.get(&id.to_string()), &mut *doc)
                {
                    map.insert(relation.alias.to_string(), summary.clone());
                }
            }
        }
        Ok(())
    }

    /// Fixed-shape statistics for one tenant's active documents
    pub async fn stats(&self, tenant_id: Uuid) -> Result<Value, DomainError> {
        let desc = E::DESCRIPTOR;
        let filter = Filter::and(vec![
            Filter::eq(desc.owner_path, tenant_id.to_string()),
            Filter::eq("isActive", true),
        ]);

        let mut out = Map::new();
        let total = self.store.count(desc.collection, &filter).await?;
        out.insert(desc.stats.count_key.to_string(), json!(total));

        for dist in desc.stats.distributions {
            let mut buckets: Map<String, Value> = dist
                .values
                .iter()
                .map(|v| (v.to_string(), json!(0)))
                .collect();
            for (value, count) in self
                .store
                .group_count(desc.collection, &filter, dist.path)
                .await?
            {
                if let Some(slot) = buckets.get_mut(&value) {
                    *slot = json!(count);
                }
            }
            out.insert(dist.key.to_string(), Value::Object(buckets));
        }

        for metric in desc.stats.metrics {
            let summary = self
                .store
                .numeric_summary(desc.collection, &filter, metric.path)
                .await?;
            let value = match metric.kind {
                MetricKind::Sum => summary.sum,
                MetricKind::Avg => summary.average(),
            };
            out.insert(metric.key.to_string(), json!(value));
        }

        Ok(Value::Object(out))
    }
}

fn strip_hidden<E: Entity>(mut doc: Value) -> Value {
    if let Value::Object(map) = &mut doc {
        for field in E::DESCRIPTOR.hidden_fields {
            map.remove(*field);
        }
    }
    doc
}

fn reference_id(doc: &Value, path: &str) -> Option<Uuid> {
    lookup(doc, path)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn summary(doc: &Value, relation: &Relation) -> Value {
    let mut out = Map::new();
    if let Some(id) = doc.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for field in relation.select {
        if let Some(value) = doc.get(*field) {
            out.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(out)
}
