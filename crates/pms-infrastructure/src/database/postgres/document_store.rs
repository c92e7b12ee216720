// ============================================================================
// PMS Infrastructure - PostgreSQL Document Store
// File: crates/pms-infrastructure/src/database/postgres/document_store.rs
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use tracing::error;
use uuid::Uuid;

use pms_core::error::DomainError;
use pms_core::query::{Filter, StoreQuery};
use pms_core::repositories::{DocumentRecord, DocumentStore, NumericSummary};

use super::filter_sql::{path_array, push_filter, push_order};

/// All collections live in one `documents` table keyed by (collection, id)
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select<'a>(collection: &str, head: &str, filter: &Filter) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new(head);
        qb.push(" FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        qb
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let (field, message) = match db.constraint() {
                Some("documents_user_email_key") => ("email", "Email sudah terdaftar"),
                Some("documents_tenant_code_key") => ("code", "Kode tenant sudah digunakan"),
                Some("documents_unit_number_key") => {
                    ("unitNumber", "Nomor unit sudah digunakan di properti ini")
                }
                _ => ("id", "Data duplikat"),
            };
            return DomainError::Duplicate {
                field: field.to_string(),
                message: message.to_string(),
            };
        }
    }
    error!("Database error {}: {}", context, e);
    DomainError::DatabaseError(e.to_string())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, tenant_id, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(collection)
        .bind(record.id)
        .bind(record.tenant_id)
        .bind(record.created_at)
        .bind(Json(&record.body))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("inserting document", e))?;

        Ok(())
    }

    async fn replace(&self, collection: &str, record: DocumentRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET doc = $3, tenant_id = $4, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(record.id)
        .bind(Json(&record.body))
        .bind(record.tenant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("replacing document", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Dokumen"));
        }
        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, DomainError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding document by id", e))?;

        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> Result<Vec<Value>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(Json<Value>,)> =
            sqlx::query_as("SELECT doc FROM documents WHERE collection = $1 AND id = ANY($2)")
                .bind(collection)
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("finding documents by ids", e))?;

        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>, DomainError> {
        let mut qb = Self::select(collection, "SELECT doc", &query.filter);
        push_order(&mut qb, &query.sort);
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));

        let rows: Vec<(Json<Value>,)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing documents", e))?;

        Ok(rows.into_iter().map(|(Json(doc),)| doc).collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, DomainError> {
        let mut qb = Self::select(collection, "SELECT COUNT(*)", filter);
        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting documents", e))?;

        Ok(count.max(0) as u64)
    }

    async fn group_count(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<Vec<(String, u64)>, DomainError> {
        let mut qb = QueryBuilder::new("SELECT doc #>> ");
        qb.push_bind(path_array(path));
        qb.push(" AS value, COUNT(*) FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND ");
        push_filter(&mut qb, filter);
        qb.push(" GROUP BY 1");

        let rows: Vec<(Option<String>, i64)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("grouping documents", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(value, count)| value.map(|v| (v, count.max(0) as u64)))
            .collect())
    }

    async fn numeric_summary(
        &self,
        collection: &str,
        filter: &Filter,
        path: &str,
    ) -> Result<NumericSummary, DomainError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*), COALESCE(SUM((doc #>> ");
        qb.push_bind(path_array(path));
        qb.push(")::float8), 0)::float8 FROM documents WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND jsonb_typeof(doc #> ");
        qb.push_bind(path_array(path));
        qb.push(") = 'number' AND ");
        push_filter(&mut qb, filter);

        let (count, sum): (i64, f64) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("summarizing documents", e))?;

        Ok(NumericSummary {
            count: count.max(0) as u64,
            sum,
        })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("pinging database", e))?;
        Ok(())
    }
}
