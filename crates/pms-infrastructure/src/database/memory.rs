//! In-memory document store for tests and `database.driver = "memory"`.
//!
//! Evaluates [`Filter`]s directly against the stored JSON. Data lives for
//! the lifetime of the process.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use pms_core::error::DomainError;
use pms_core::query::filter::{compare_values, lookup};
use pms_core::query::{Filter, SortDirection, StoreQuery};
use pms_core::repositories::{DocumentRecord, DocumentStore, NumericSummary};

type Collection = BTreeMap<Uuid, Value>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching(&self, collection: &str, filter: &Filter) -> Vec<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&record.id) {
            return Err(DomainError::Duplicate {
                field: "id".to_string(),
                message: "Data duplikat".to_string(),
            });
        }
        docs.insert(record.id, record.body);
        Ok(())
    }

    async fn replace(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError> {
        let mut collections = self.collections.write().await;
        match collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&record.id))
        {
            Some(doc) => {
                *doc = record.body;
                Ok(())
            }
            None => Err(DomainError::NotFound("Dokumen")),
        }
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, DomainError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, DomainError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| ids.iter().filter_map(|id| docs.get(id)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, DomainError> {
        let mut docs = self.matching(collection, &query.filter).await;
        let path = query.sort.path.as_str();
        docs.sort_by(|a, b| {
            let ordering = compare_values(lookup(a, path), lookup(b, path));
            let ordering = match query.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            match ordering {
                Ordering::Equal => compare_values(a.get("id"), b.get("id")),
                other => other,
            }
        });

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(docs.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DomainError> {
        Ok(self.matching(collection, filter).await.len() as u64)
    }

    async fn group_count(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<Vec<(String, u64)>, DomainError> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in self.matching(collection, filter).await {
            if let Some(value) = lookup(&doc, path).and_then(Value::as_str) {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn numeric_summary(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<NumericSummary, DomainError> {
        let mut summary = NumericSummary::default();
        for doc in self.matching(collection, filter).await {
            if let Some(value) = lookup(&doc, path).and_then(Value::as_f64) {
                summary.count += 1;
                summary.sum += value;
            }
        }
        Ok(summary)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
