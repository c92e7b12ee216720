//! Document store trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DomainError;
use crate::query::{Filter, StoreQuery};

/// A document plus the columns stores index separately
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericSummary {
    /// Documents with a numeric value at the path
    pub count: u64,
    pub sum: f64,
}

impl NumericSummary {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError>;

    /// Whole-document replace of an existing id
    async fn replace(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, DomainError>;

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, DomainError>;

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, DomainError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DomainError>;

    /// Number of matching documents per distinct string value at `path`
    async fn group_count(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<Vec<(String, u64)>, DomainError>;

    async fn numeric_summary(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<NumericSummary, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}
