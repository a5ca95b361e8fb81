//! Per-resource adapters: mapping, write transforms, validation rules and lifecycle hooks.

use crate::clock;
use crate::config::{PaginationPolicy, ValidationRule};
use crate::error::AppError;
use crate::store::{Document, ID_FIELD};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod image;
pub mod person;
pub mod playground;
pub mod user;

pub use image::{Face, Image, ImageResource, ImageStatus};
pub use person::{Person, PersonResource};
pub use playground::{Playground, PlaygroundResource};
pub use user::{User, UserResource};

/// Failure reported by a lifecycle hook. Logged by the engine, never returned to the caller.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

pub type HookResult = Result<(), HookError>;

/// Everything the generic engine needs to know about one entity type.
#[async_trait]
pub trait ResourceAdapter: Send + Sync + 'static {
    type Domain: Serialize + Clone + Send + Sync + 'static;

    /// Singular display name used in errors and logs.
    const NAME: &'static str;
    const COLLECTION: &'static str;
    const PAGINATION: PaginationPolicy = PaginationPolicy::Paginate;
    /// Field holding the owning user's id, for resources scoped to their caller.
    const OWNER_FIELD: Option<&'static str> = None;
    /// Fields whose values may appear on at most one record of the collection.
    const UNIQUE: &'static [&'static str] = &[];

    /// `None` in, `None` out; otherwise every domain field is populated.
    fn to_domain(record: Option<&Document>) -> Option<Self::Domain>;

    /// Persistable shape without the identifier. Every create is written through this mapper.
    fn to_persistence(domain: &Self::Domain) -> Document;

    fn create_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(body)
    }

    fn update_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(body)
    }

    fn validation_rules(&self) -> Vec<(&'static str, ValidationRule)> {
        Vec::new()
    }

    async fn on_created(&self, _record: &Self::Domain) -> HookResult {
        Ok(())
    }

    async fn on_updated(&self, _record: &Self::Domain) -> HookResult {
        Ok(())
    }

    /// Receives the record as it was before removal.
    async fn on_deleted(&self, _record: &Self::Domain) -> HookResult {
        Ok(())
    }
}

/// A resource that embeds an ordered list of elements addressed by their own key.
pub trait EmbeddedList: ResourceAdapter {
    /// Display name of one element, e.g. `Face`.
    const ELEMENT: &'static str;
    const LIST_FIELD: &'static str;
    const KEY_FIELD: &'static str;
    /// Element fields a patch may change; anything else in the patch is ignored.
    const PATCHABLE: &'static [&'static str];

    /// Check the allow-listed patch fields before they are applied.
    fn validate_element_patch(patch: &Document) -> Result<(), AppError>;
}

/// Keep only `fields` from `body`.
pub(crate) fn pick(body: &Document, fields: &[&str]) -> Document {
    fields
        .iter()
        .filter_map(|f| body.get(*f).map(|v| (f.to_string(), v.clone())))
        .collect()
}

pub(crate) fn id_of(doc: &Document) -> String {
    match doc.get(ID_FIELD) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

pub(crate) fn str_field(doc: &Document, key: &str) -> String {
    opt_str_field(doc, key).unwrap_or_default()
}

pub(crate) fn opt_str_field(doc: &Document, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Unparsable or missing timestamps read as the epoch.
pub(crate) fn time_field(doc: &Document, key: &str) -> DateTime<Utc> {
    clock::from_value(doc.get(key)).unwrap_or_default()
}

pub(crate) fn put_timestamps(doc: &mut Document, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
    doc.insert("createdAt".into(), clock::to_value(created_at));
    doc.insert("updatedAt".into(), clock::to_value(updated_at));
}
