use crate::config::ValidationRule;
use crate::error::AppError;
use crate::resource::{id_of, pick, put_timestamps, str_field, time_field, ResourceAdapter};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An account. The stored password hash is carried for persistence but never serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const FIELDS: &[&str] = &["email", "password", "firstName", "lastName"];

#[derive(Clone, Copy, Debug, Default)]
pub struct UserResource;

impl ResourceAdapter for UserResource {
    type Domain = User;

    const NAME: &'static str = "user";
    const COLLECTION: &'static str = "users";
    const UNIQUE: &'static [&'static str] = &["email"];

    fn to_domain(record: Option<&Document>) -> Option<User> {
        let doc = record?;
        Some(User {
            id: id_of(doc),
            email: str_field(doc, "email"),
            password: str_field(doc, "password"),
            first_name: str_field(doc, "firstName"),
            last_name: str_field(doc, "lastName"),
            created_at: time_field(doc, "createdAt"),
            updated_at: time_field(doc, "updatedAt"),
        })
    }

    fn to_persistence(user: &User) -> Document {
        let mut doc = Document::new();
        doc.insert("email".into(), Value::String(user.email.clone()));
        doc.insert("password".into(), Value::String(user.password.clone()));
        doc.insert("firstName".into(), Value::String(user.first_name.clone()));
        doc.insert("lastName".into(), Value::String(user.last_name.clone()));
        put_timestamps(&mut doc, user.created_at, user.updated_at);
        doc
    }

    fn create_transform(&self, body: Document) -> Result<Document, AppError> {
        let mut doc = pick(&body, FIELDS);
        if let Some(Value::String(email)) = doc.get_mut("email") {
            *email = email.trim().to_lowercase();
        }
        Ok(doc)
    }

    fn update_transform(&self, body: Document) -> Result<Document, AppError> {
        self.create_transform(body)
    }

    fn validation_rules(&self) -> Vec<(&'static str, ValidationRule)> {
        vec![
            ("email", ValidationRule::required().format("email")),
            ("password", ValidationRule::required().min_length(6)),
            ("firstName", ValidationRule::required()),
            ("lastName", ValidationRule::required()),
        ]
    }
}
