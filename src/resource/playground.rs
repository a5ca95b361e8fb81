use crate::config::ValidationRule;
use crate::error::AppError;
use crate::resource::{id_of, pick, put_timestamps, str_field, time_field, ResourceAdapter};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playground {
    pub id: String,
    pub user_id: String,
    pub domain_name: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const FIELDS: &[&str] = &["userId", "domainName", "name"];

#[derive(Clone, Copy, Debug, Default)]
pub struct PlaygroundResource;

impl ResourceAdapter for PlaygroundResource {
    type Domain = Playground;

    const NAME: &'static str = "playground";
    const COLLECTION: &'static str = "playgrounds";
    const OWNER_FIELD: Option<&'static str> = Some("userId");

    fn to_domain(record: Option<&Document>) -> Option<Playground> {
        let doc = record?;
        Some(Playground {
            id: id_of(doc),
            user_id: str_field(doc, "userId"),
            domain_name: str_field(doc, "domainName"),
            name: str_field(doc, "name"),
            created_at: time_field(doc, "createdAt"),
            updated_at: time_field(doc, "updatedAt"),
        })
    }

    fn to_persistence(p: &Playground) -> Document {
        let mut doc = Document::new();
        doc.insert("userId".into(), Value::String(p.user_id.clone()));
        doc.insert("domainName".into(), Value::String(p.domain_name.clone()));
        doc.insert("name".into(), Value::String(p.name.clone()));
        put_timestamps(&mut doc, p.created_at, p.updated_at);
        doc
    }

    fn create_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(pick(&body, FIELDS))
    }

    fn update_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(pick(&body, FIELDS))
    }

    fn validation_rules(&self) -> Vec<(&'static str, ValidationRule)> {
        vec![
            ("userId", ValidationRule::required()),
            ("domainName", ValidationRule::required().format("string")),
            ("name", ValidationRule::required().format("string")),
        ]
    }
}
