//! In-process document store. Used when no database is configured and in tests.

use crate::error::AppError;
use crate::id::{IdentifierCodec, ObjectIdCodec, RecordId};
use crate::query::filter::resolve;
use crate::query::{Collation, Filter, Projection, QueryDescriptor, SortDirection, SortKey};
use crate::store::{Document, DocumentStore, ID_FIELD};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collections = HashMap<String, Vec<Document>>;

/// Collections keep insertion order, which is the default result order.
pub struct MemoryStore {
    codec: Arc<dyn IdentifierCodec>,
    collections: RwLock<Collections>,
    calls: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_codec(Arc::new(ObjectIdCodec))
    }

    pub fn with_codec(codec: Arc<dyn IdentifierCodec>) -> Self {
        MemoryStore {
            codec,
            collections: RwLock::new(HashMap::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of records in `collection`; does not count as a store call.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn tick(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, AppError> {
        self.collections
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, AppError> {
        self.collections
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

fn has_id(doc: &Document, id: &RecordId) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn codec(&self) -> &dyn IdentifierCodec {
        self.codec.as_ref()
    }

    async fn find(&self, collection: &str, query: &QueryDescriptor) -> Result<Vec<Document>, AppError> {
        self.tick();
        let guard = self.read()?;
        let mut hits: Vec<&Document> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.filter.matches(d)).collect())
            .unwrap_or_default();
        if !query.sort.is_empty() {
            hits.sort_by(|a, b| compare_docs(a, b, &query.sort, &query.collation));
        }
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d.clone(), query.projection.as_ref()))
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        self.tick();
        let guard = self.read()?;
        let n = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, AppError> {
        self.tick();
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .map(|d| project(d.clone(), projection)))
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, AppError> {
        self.tick();
        let id = self.codec.generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.into_string()));
        let mut guard = self.write()?;
        guard.entry(collection.to_string()).or_default().push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &RecordId, patch: Document) -> Result<Option<Document>, AppError> {
        self.tick();
        let mut guard = self.write()?;
        let Some(doc) = guard
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
        else {
            return Ok(None);
        };
        for (k, v) in patch {
            if k != ID_FIELD {
                doc.insert(k, v);
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<Option<Document>, AppError> {
        self.tick();
        let mut guard = self.write()?;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| has_id(d, id))
            .map(|pos| docs.remove(pos)))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}

fn project(doc: Document, projection: Option<&Projection>) -> Document {
    match projection {
        Some(p) => p.apply(doc),
        None => doc,
    }
}

fn compare_docs(a: &Document, b: &Document, keys: &[SortKey], collation: &Collation) -> Ordering {
    for key in keys {
        let va = resolve(a, &key.field).into_iter().next();
        let vb = resolve(b, &key.field).into_iter().next();
        let ord = compare_values(va, vb, collation);
        let ord = match key.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Missing sorts as null. Brackets follow jsonb: null < strings < numbers < booleans < arrays < objects.
fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::String(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>, collation: &Collation) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => compare_strings(x, y, collation),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ (Value::Object(_) | Value::Array(_))), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}

/// Letters first compare without case; at strength 3 lowercase then sorts before uppercase.
fn compare_strings(x: &str, y: &str, collation: &Collation) -> Ordering {
    let primary = x.to_lowercase().cmp(&y.to_lowercase());
    if primary != Ordering::Equal || collation.case_insensitive() {
        return primary;
    }
    y.cmp(x)
}
