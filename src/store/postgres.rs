//! PostgreSQL document store: one JSONB table per collection.

use crate::error::AppError;
use crate::id::{IdentifierCodec, ObjectIdCodec, RecordId};
use crate::query::{Filter, Projection, QueryDescriptor};
use crate::store::sql::{self, QueryBuf, SqlParam};
use crate::store::{Document, DocumentStore, ID_FIELD};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
    codec: Arc<dyn IdentifierCodec>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDocumentStore {
            pool,
            schema: schema.into(),
            codec: Arc::new(ObjectIdCodec),
        }
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&self.pool).await.map_err(from_db)?)
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        Ok(bind_all(sqlx::query(&q.sql), &q.params).fetch_optional(&self.pool).await.map_err(from_db)?)
    }
}

/// SQLSTATE for a pattern `like_regex` cannot compile.
const INVALID_REGULAR_EXPRESSION: &str = "2201B";
const UNIQUE_VIOLATION: &str = "23505";

fn from_db(err: sqlx::Error) -> AppError {
    let code = err.as_database_error().and_then(|db| db.code()).map(|c| c.into_owned());
    classify(code.as_deref(), err)
}

fn classify(code: Option<&str>, err: sqlx::Error) -> AppError {
    match code {
        Some(INVALID_REGULAR_EXPRESSION) => AppError::BadQuerySyntax(format!("invalid $regex: {}", err)),
        Some(UNIQUE_VIOLATION) => AppError::Conflict("a record with this value already exists".into()),
        _ => AppError::Db(err),
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            SqlParam::Text(s) => query.bind(s.clone()),
            SqlParam::TextArray(v) => query.bind(v.clone()),
            SqlParam::Json(v) => query.bind(sqlx::types::Json(v.clone())),
            SqlParam::I64(n) => query.bind(*n),
        };
    }
    query
}

fn row_to_document(row: &PgRow) -> Result<Document, AppError> {
    match row.try_get::<Value, _>("doc")? {
        Value::Object(doc) => Ok(doc),
        other => Err(AppError::Internal(format!(
            "stored document is not an object: {}",
            other
        ))),
    }
}

fn project(doc: Document, projection: Option<&Projection>) -> Document {
    match projection {
        Some(p) => p.apply(doc),
        None => doc,
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn codec(&self) -> &dyn IdentifierCodec {
        self.codec.as_ref()
    }

    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<Vec<Document>, AppError> {
        let q = sql::select_many(&self.schema, collection, query);
        self.fetch_all(&q)
            .await?
            .iter()
            .map(|row| row_to_document(row).map(|d| project(d, query.projection.as_ref())))
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let q = sql::count(&self.schema, collection, filter);
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, AppError> {
        let q = sql::select_one(&self.schema, collection, filter);
        match self.fetch_optional(&q).await? {
            Some(row) => Ok(Some(project(row_to_document(&row)?, projection))),
            None => Ok(None),
        }
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, AppError> {
        let id = self.codec.generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
        let q = sql::insert(&self.schema, collection, id.as_str(), Value::Object(doc));
        let row = self
            .fetch_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        row_to_document(&row)
    }

    async fn update(&self, collection: &str, id: &RecordId, mut patch: Document) -> Result<Option<Document>, AppError> {
        patch.remove(ID_FIELD);
        let q = sql::update(&self.schema, collection, id.as_str(), Value::Object(patch));
        match self.fetch_optional(&q).await? {
            Some(row) => Ok(Some(row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<Option<Document>, AppError> {
        let q = sql::delete(&self.schema, collection, id.as_str());
        match self.fetch_optional(&q).await? {
            Some(row) => Ok(Some(row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn sqlstate_maps_to_client_errors() {
        let regex = classify(Some("2201B"), sqlx::Error::PoolTimedOut);
        assert_eq!(regex.kind(), ErrorKind::BadQuerySyntax);
        let dup = classify(Some("23505"), sqlx::Error::PoolTimedOut);
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert!(matches!(classify(Some("57014"), sqlx::Error::PoolTimedOut), AppError::Db(_)));
        assert!(matches!(classify(None, sqlx::Error::PoolTimedOut), AppError::Db(_)));
    }
}
