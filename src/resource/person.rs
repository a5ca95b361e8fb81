use crate::config::ValidationRule;
use crate::error::AppError;
use crate::resource::{id_of, pick, put_timestamps, str_field, time_field, ResourceAdapter};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named person that detected faces can be linked to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PersonResource;

impl ResourceAdapter for PersonResource {
    type Domain = Person;

    const NAME: &'static str = "person";
    const COLLECTION: &'static str = "persons";
    const OWNER_FIELD: Option<&'static str> = Some("userId");

    fn to_domain(record: Option<&Document>) -> Option<Person> {
        let doc = record?;
        Some(Person {
            id: id_of(doc),
            user_id: str_field(doc, "userId"),
            name: str_field(doc, "name"),
            created_at: time_field(doc, "createdAt"),
            updated_at: time_field(doc, "updatedAt"),
        })
    }

    fn to_persistence(person: &Person) -> Document {
        let mut doc = Document::new();
        doc.insert("userId".into(), Value::String(person.user_id.clone()));
        doc.insert("name".into(), Value::String(person.name.clone()));
        put_timestamps(&mut doc, person.created_at, person.updated_at);
        doc
    }

    fn create_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(pick(&body, &["userId", "name"]))
    }

    fn update_transform(&self, body: Document) -> Result<Document, AppError> {
        Ok(pick(&body, &["userId", "name"]))
    }

    fn validation_rules(&self) -> Vec<(&'static str, ValidationRule)> {
        vec![
            ("userId", ValidationRule::required()),
            ("name", ValidationRule::required().format("string")),
        ]
    }
}
