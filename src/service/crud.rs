//! Generic CRUD execution over any `ResourceAdapter`.

use crate::clock;
use crate::config::PaginationPolicy;
use crate::error::{AppError, NotFoundLevel};
use crate::id::RecordId;
use crate::query::{self, Filter, QueryDescriptor, RawQuery};
use crate::resource::{HookResult, ResourceAdapter};
use crate::response::{success_many, success_one, success_paginated, DeletedId, Envelope};
use crate::service::{normalize, RequestValidator};
use crate::store::{by_id, Document, DocumentStore, ID_FIELD};
use serde_json::Value;
use std::sync::Arc;

/// Client-supplied fields the store owns.
const PROTECTED_FIELDS: &[&str] = &[ID_FIELD, "id", "createdAt"];

pub struct CrudEngine<R: ResourceAdapter> {
    store: Arc<dyn DocumentStore>,
    adapter: R,
}

impl<R: ResourceAdapter> CrudEngine<R> {
    pub fn new(store: Arc<dyn DocumentStore>, adapter: R) -> Self {
        CrudEngine { store, adapter }
    }

    pub fn adapter(&self) -> &R {
        &self.adapter
    }

    /// Filtered, sorted, paginated list. Paginated resources also get the total match count.
    pub async fn find(&self, query: &QueryDescriptor) -> Result<Envelope<Vec<R::Domain>>, AppError> {
        self.run_find(query)
            .await
            .map_err(|e| normalize("find", R::NAME, None, e))
    }

    /// `find` from the flat query-string map.
    pub async fn find_raw(&self, raw: &RawQuery) -> Result<Envelope<Vec<R::Domain>>, AppError> {
        let query = query::parse(raw).map_err(|e| normalize("find", R::NAME, None, e))?;
        self.find(&query).await
    }

    pub async fn find_one(&self, id: &str, query: &QueryDescriptor) -> Result<Envelope<R::Domain>, AppError> {
        self.run_find_one(id, query)
            .await
            .map_err(|e| normalize("find_one", R::NAME, Some(id), e))
    }

    /// Lookup by any field; `data` is null when nothing matches.
    pub async fn find_one_by_field(
        &self,
        field: &str,
        value: Value,
        query: &QueryDescriptor,
    ) -> Result<Envelope<Option<R::Domain>>, AppError> {
        let filter = Filter::Eq(field.to_string(), value).and(query.filter.clone());
        let doc = self
            .store
            .find_one(R::COLLECTION, &filter, query.projection.as_ref())
            .await
            .map_err(|e| normalize("find_one_by_field", R::NAME, None, e))?;
        Ok(success_one(R::to_domain(doc.as_ref())))
    }

    pub async fn create(&self, body: Document) -> Result<Envelope<R::Domain>, AppError> {
        let envelope = self
            .run_create(body)
            .await
            .map_err(|e| normalize("create", R::NAME, None, e))?;
        let outcome = self.adapter.on_created(&envelope.data).await;
        self.log_hook("on_created", None, outcome);
        Ok(envelope)
    }

    pub async fn update(&self, id: &str, body: Document) -> Result<Envelope<R::Domain>, AppError> {
        let envelope = self
            .run_update(id, body)
            .await
            .map_err(|e| normalize("update", R::NAME, Some(id), e))?;
        let outcome = self.adapter.on_updated(&envelope.data).await;
        self.log_hook("on_updated", Some(id), outcome);
        Ok(envelope)
    }

    pub async fn delete(&self, id: &str) -> Result<Envelope<DeletedId>, AppError> {
        let (envelope, removed) = self
            .run_delete(id)
            .await
            .map_err(|e| normalize("delete", R::NAME, Some(id), e))?;
        if let Some(record) = removed {
            let outcome = self.adapter.on_deleted(&record).await;
            self.log_hook("on_deleted", Some(id), outcome);
        }
        Ok(envelope)
    }

    async fn run_find(&self, query: &QueryDescriptor) -> Result<Envelope<Vec<R::Domain>>, AppError> {
        let docs = self.store.find(R::COLLECTION, query).await?;
        let data: Vec<R::Domain> = docs.iter().filter_map(|d| R::to_domain(Some(d))).collect();
        match R::PAGINATION {
            PaginationPolicy::Paginate => {
                let total = self.store.count(R::COLLECTION, &query.filter).await?;
                Ok(success_paginated(data, total))
            }
            PaginationPolicy::NoPaginate => Ok(success_many(data)),
        }
    }

    async fn run_find_one(&self, id: &str, query: &QueryDescriptor) -> Result<Envelope<R::Domain>, AppError> {
        let id = self.parse_id(id)?;
        let filter = by_id(&id).and(query.filter.clone());
        let doc = self
            .store
            .find_one(R::COLLECTION, &filter, query.projection.as_ref())
            .await?;
        let record = R::to_domain(doc.as_ref()).ok_or_else(|| self.not_found(&id))?;
        Ok(success_one(record))
    }

    async fn run_create(&self, body: Document) -> Result<Envelope<R::Domain>, AppError> {
        let mut doc = self.adapter.create_transform(strip_protected(body))?;
        RequestValidator::validate(&doc, &self.adapter.validation_rules())?;
        self.ensure_unique(&doc, None).await?;
        let now = clock::stamp_after(None);
        doc.insert("createdAt".into(), clock::to_value(now));
        doc.insert("updatedAt".into(), clock::to_value(now));
        let record = R::to_domain(Some(&doc))
            .ok_or_else(|| AppError::Internal("create produced no record".into()))?;
        let stored = self.store.insert(R::COLLECTION, R::to_persistence(&record)).await?;
        tracing::debug!(resource = R::NAME, id = ?stored.get(ID_FIELD), "created");
        let record = R::to_domain(Some(&stored))
            .ok_or_else(|| AppError::Internal("insert returned no document".into()))?;
        Ok(success_one(record))
    }

    /// Existence check, then a merge write. The two steps are not atomic: a delete landing
    /// between them surfaces as NotFound from the write.
    async fn run_update(&self, id: &str, body: Document) -> Result<Envelope<R::Domain>, AppError> {
        let id = self.parse_id(id)?;
        let existing = self
            .store
            .find_one(R::COLLECTION, &by_id(&id), None)
            .await?
            .ok_or_else(|| self.not_found(&id))?;

        let mut patch = self.adapter.update_transform(strip_protected(body))?;
        patch.remove("updatedAt");
        let rules = self.adapter.validation_rules();
        RequestValidator::validate_partial(&patch, &rules)?;
        let mut preview = existing.clone();
        preview.extend(patch.clone());
        RequestValidator::validate(&preview, &rules)?;
        self.ensure_unique(&patch, Some(&id)).await?;

        let stamp = clock::stamp_after(clock::from_value(existing.get("updatedAt")));
        patch.insert("updatedAt".into(), clock::to_value(stamp));
        let updated = self
            .store
            .update(R::COLLECTION, &id, patch)
            .await?
            .ok_or_else(|| self.not_found(&id))?;
        let record = R::to_domain(Some(&updated))
            .ok_or_else(|| AppError::Internal("update returned no document".into()))?;
        Ok(success_one(record))
    }

    async fn run_delete(&self, id: &str) -> Result<(Envelope<DeletedId>, Option<R::Domain>), AppError> {
        let id = self.parse_id(id)?;
        let removed = self
            .store
            .delete(R::COLLECTION, &id)
            .await?
            .ok_or_else(|| self.not_found(&id))?;
        Ok((success_one(DeletedId { id: id.into_string() }), R::to_domain(Some(&removed))))
    }

    /// Conflict when another record already holds a value `doc` sets on a unique field.
    async fn ensure_unique(&self, doc: &Document, own: Option<&RecordId>) -> Result<(), AppError> {
        for field in R::UNIQUE {
            let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let mut filter = Filter::Eq(field.to_string(), value.clone());
            if let Some(own) = own {
                filter = filter.and(Filter::Ne(ID_FIELD.to_string(), Value::String(own.as_str().to_string())));
            }
            if self.store.count(R::COLLECTION, &filter).await? > 0 {
                return Err(AppError::Conflict(format!("{} with this {} already exists", R::NAME, field)));
            }
        }
        Ok(())
    }

    /// Syntax check through the store's codec; no I/O.
    fn parse_id(&self, raw: &str) -> Result<RecordId, AppError> {
        self.store.codec().parse(raw)
    }

    fn not_found(&self, id: &RecordId) -> AppError {
        AppError::not_found(R::NAME, NotFoundLevel::Record, id.as_str())
    }

    fn log_hook(&self, hook: &'static str, id: Option<&str>, outcome: HookResult) {
        if let Err(err) = outcome {
            tracing::warn!(resource = R::NAME, hook, id = id.unwrap_or("-"), error = %err, "hook failed");
        }
    }
}

fn strip_protected(mut body: Document) -> Document {
    for f in PROTECTED_FIELDS {
        body.remove(*f);
    }
    body
}
