#![allow(dead_code)]

use async_trait::async_trait;
use faceplay::config::PaginationPolicy;
use faceplay::resource::{HookError, HookResult, ResourceAdapter};
use faceplay::store::Document;
use faceplay::{AppState, CrudEngine, DocumentStore, MemoryStore};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CALLER: &str = "685b7426961a92e9ec1d2a00";

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn app_state(store: Arc<MemoryStore>) -> AppState {
    let store: Arc<dyn DocumentStore> = store;
    AppState::new(store)
}

/// Insert a document directly, bypassing the engine. Returns the assigned `_id`.
pub async fn seed(store: &MemoryStore, collection: &str, value: Value) -> String {
    let stored = store.insert(collection, doc(value)).await.unwrap();
    stored["_id"].as_str().unwrap().to_string()
}

pub fn image_body(file_key: &str, faces: Value) -> Value {
    serde_json::json!({
        "userId": CALLER,
        "fileKey": file_key,
        "playgroundId": "pg-1",
        "faces": faces
    })
}

/// Minimal note record used to exercise engine behavior independent of the real resources.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Note {
    pub id: String,
    pub title: String,
}

/// Note adapter whose hooks always fail and count their invocations.
#[derive(Default)]
pub struct FailingHooks {
    pub fired: AtomicUsize,
    /// Records handed to `on_deleted`.
    pub deleted: Mutex<Vec<Note>>,
}

impl FailingHooks {
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<Note> {
        self.deleted.lock().unwrap().clone()
    }

    fn fail(&self) -> HookResult {
        self.fired.fetch_add(1, Ordering::SeqCst);
        Err(HookError("downstream unavailable".into()))
    }
}

#[async_trait]
impl ResourceAdapter for FailingHooks {
    type Domain = Note;

    const NAME: &'static str = "note";
    const COLLECTION: &'static str = "notes";

    fn to_domain(record: Option<&Document>) -> Option<Note> {
        let doc = record?;
        Some(Note {
            id: doc.get("_id").and_then(Value::as_str).unwrap_or_default().to_string(),
            title: doc.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
        })
    }

    fn to_persistence(note: &Note) -> Document {
        let mut doc = Document::new();
        doc.insert("title".into(), Value::String(note.title.clone()));
        doc
    }

    async fn on_created(&self, _record: &Note) -> HookResult {
        self.fail()
    }

    async fn on_updated(&self, _record: &Note) -> HookResult {
        self.fail()
    }

    async fn on_deleted(&self, record: &Note) -> HookResult {
        self.deleted.lock().unwrap().push(record.clone());
        self.fail()
    }
}

pub fn note_engine(store: Arc<MemoryStore>) -> CrudEngine<FailingHooks> {
    CrudEngine::new(store, FailingHooks::default())
}

/// Note adapter listed without pagination: lists carry no `total`.
#[derive(Default)]
pub struct PlainNotes;

impl ResourceAdapter for PlainNotes {
    type Domain = Note;

    const NAME: &'static str = "note";
    const COLLECTION: &'static str = "notes";
    const PAGINATION: PaginationPolicy = PaginationPolicy::NoPaginate;

    fn to_domain(record: Option<&Document>) -> Option<Note> {
        FailingHooks::to_domain(record)
    }

    fn to_persistence(note: &Note) -> Document {
        FailingHooks::to_persistence(note)
    }
}
