//! Document store port and its adapters.
//!
//! The engine only talks to `DocumentStore`. `MemoryStore` keeps collections in process;
//! `PgDocumentStore` keeps one JSONB table per collection.

use crate::error::AppError;
use crate::id::{IdentifierCodec, RecordId};
use crate::query::{Filter, Projection, QueryDescriptor};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod memory;
pub mod postgres;
pub mod schema;
mod sql;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A persisted record: a JSON object carrying `_id`, `createdAt`, `updatedAt` and resource fields.
pub type Document = Map<String, Value>;

/// Field name of the native identifier inside every stored document.
pub const ID_FIELD: &str = "_id";

/// Filter that selects exactly one record by identifier.
pub fn by_id(id: &RecordId) -> Filter {
    Filter::Eq(ID_FIELD.to_string(), Value::String(id.as_str().to_string()))
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Identifier syntax of this store; checked by the engine before any call below.
    fn codec(&self) -> &dyn IdentifierCodec;

    /// Filtered, sorted, offset and limited read. Projection is applied to each result.
    ///
    /// Mixed types sort in jsonb order: missing and null, strings, numbers, booleans, arrays, objects.
    /// Postgres compares strings under the database collation, and case-insensitive sorts there
    /// compare the text form of every value.
    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<Vec<Document>, AppError>;

    /// Count of all records matching `filter`, ignoring offset and limit.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, AppError>;

    /// Insert a new record. The store assigns `_id`; any `_id` in `doc` is replaced.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, AppError>;

    /// Shallow-merge `patch` into an existing record. Never inserts; `None` when `id` is absent.
    async fn update(&self, collection: &str, id: &RecordId, patch: Document) -> Result<Option<Document>, AppError>;

    /// Remove a record and return it; `None` when nothing was removed.
    async fn delete(&self, collection: &str, id: &RecordId) -> Result<Option<Document>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}
