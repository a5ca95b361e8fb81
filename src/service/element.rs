//! Updates one element of a parent's embedded list, addressed by the element's own key.

use crate::clock;
use crate::error::{AppError, NotFoundLevel};
use crate::resource::{pick, EmbeddedList};
use crate::response::{success_with_message, Envelope};
use crate::service::{normalize, RequestValidator};
use crate::store::{by_id, Document, DocumentStore, ID_FIELD};
use serde_json::Value;
use std::sync::Arc;

pub struct ElementMutator<R: EmbeddedList> {
    store: Arc<dyn DocumentStore>,
    adapter: R,
}

fn key_matches(candidate: &Value, key: &str) -> bool {
    match candidate {
        Value::String(s) => s == key,
        Value::Number(n) => n.to_string() == key,
        _ => false,
    }
}

impl<R: EmbeddedList> ElementMutator<R> {
    pub fn new(store: Arc<dyn DocumentStore>, adapter: R) -> Self {
        ElementMutator { store, adapter }
    }

    /// Apply the allow-listed fields of `patch` to the element whose key equals `element_key`.
    /// Sibling elements and list order are left as stored.
    pub async fn update_element(
        &self,
        parent_id: &str,
        element_key: &str,
        patch: Document,
    ) -> Result<Envelope<R::Domain>, AppError> {
        let envelope = self
            .run(parent_id, element_key, patch)
            .await
            .map_err(|e| normalize("update_element", R::NAME, Some(parent_id), e))?;
        if let Err(err) = self.adapter.on_updated(&envelope.data).await {
            tracing::warn!(resource = R::NAME, hook = "on_updated", id = parent_id, error = %err, "hook failed");
        }
        Ok(envelope)
    }

    async fn run(&self, parent_id: &str, element_key: &str, patch: Document) -> Result<Envelope<R::Domain>, AppError> {
        let id = self.store.codec().parse(parent_id)?;
        let mut parent = self
            .store
            .find_one(R::COLLECTION, &by_id(&id), None)
            .await?
            .ok_or_else(|| AppError::not_found(R::NAME, NotFoundLevel::Parent, id.as_str()))?;

        let mut list = match parent.remove(R::LIST_FIELD) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let element = list
            .iter_mut()
            .find(|e| e.get(R::KEY_FIELD).map_or(false, |k| key_matches(k, element_key)))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| AppError::not_found(R::ELEMENT, NotFoundLevel::Element, element_key))?;

        let allowed = pick(&patch, R::PATCHABLE);
        R::validate_element_patch(&allowed)?;
        element.extend(allowed);

        let stamp = clock::stamp_after(clock::from_value(parent.get("updatedAt")));
        parent.remove(ID_FIELD);
        parent.insert(R::LIST_FIELD.into(), Value::Array(list));
        parent.insert("updatedAt".into(), clock::to_value(stamp));
        RequestValidator::validate(&parent, &self.adapter.validation_rules())?;

        let updated = self
            .store
            .update(R::COLLECTION, &id, parent)
            .await?
            .ok_or_else(|| AppError::not_found(R::NAME, NotFoundLevel::Parent, id.as_str()))?;
        let record = R::to_domain(Some(&updated))
            .ok_or_else(|| AppError::Internal("update returned no document".into()))?;
        tracing::debug!(resource = R::NAME, id = %id, key = element_key, "element updated");
        Ok(success_with_message(
            record,
            format!("{} with {} {} updated successfully", R::ELEMENT, R::KEY_FIELD, element_key),
        ))
    }
}
