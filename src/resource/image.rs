//! Uploaded images and the faces detected on them.

use crate::config::ValidationRule;
use crate::error::AppError;
use crate::resource::{
    id_of, opt_str_field, pick, put_timestamps, str_field, time_field, EmbeddedList, ResourceAdapter,
};
use crate::store::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Uploading,
    #[default]
    Uploaded,
    Detecting,
    Completed,
    Error,
}

impl ImageStatus {
    pub const ALL: [&'static str; 5] = ["uploading", "uploaded", "detecting", "completed", "error"];
}

/// One detected face. `milvus_id` is the tracking id assigned by the face-embedding index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    pub milvus_id: String,
    /// `[x1, y1, x2, y2]`
    pub bbox: Vec<f64>,
    pub name: String,
    pub person_id: Option<String>,
}

impl Face {
    fn from_value(v: &Value) -> Option<Face> {
        let obj = v.as_object()?;
        Some(Face {
            milvus_id: str_field(obj, "milvusId"),
            bbox: obj
                .get("bbox")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default(),
            name: str_field(obj, "name"),
            person_id: opt_str_field(obj, "personId"),
        })
    }

    fn to_value(&self) -> Value {
        json!({
            "milvusId": self.milvus_id,
            "bbox": self.bbox,
            "name": self.name,
            "personId": self.person_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub user_id: String,
    pub file_key: String,
    pub playground_id: String,
    pub status: ImageStatus,
    pub faces: Vec<Face>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const FIELDS: &[&str] = &["userId", "fileKey", "playgroundId", "status", "faces"];

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageResource;

fn check_bbox(v: &Value) -> Result<(), AppError> {
    match v.as_array() {
        Some(a) if a.len() == 4 && a.iter().all(Value::is_number) => Ok(()),
        _ => Err(AppError::Validation("bbox must be an array of four numbers".into())),
    }
}

fn check_faces(faces: &Value) -> Result<(), AppError> {
    let list = faces
        .as_array()
        .ok_or_else(|| AppError::Validation("faces must be an array".into()))?;
    for face in list {
        let obj = face
            .as_object()
            .ok_or_else(|| AppError::Validation("each face must be an object".into()))?;
        if !obj.get("milvusId").map_or(false, Value::is_string) {
            return Err(AppError::Validation("face milvusId is required".into()));
        }
        if let Some(bbox) = obj.get("bbox") {
            check_bbox(bbox)?;
        }
        ImageResource::validate_element_patch(obj)?;
    }
    Ok(())
}

impl ResourceAdapter for ImageResource {
    type Domain = Image;

    const NAME: &'static str = "image";
    const COLLECTION: &'static str = "images";
    const OWNER_FIELD: Option<&'static str> = Some("userId");

    fn to_domain(record: Option<&Document>) -> Option<Image> {
        let doc = record?;
        Some(Image {
            id: id_of(doc),
            user_id: str_field(doc, "userId"),
            file_key: str_field(doc, "fileKey"),
            playground_id: str_field(doc, "playgroundId"),
            status: doc
                .get("status")
                .and_then(|s| serde_json::from_value(s.clone()).ok())
                .unwrap_or_default(),
            faces: doc
                .get("faces")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Face::from_value).collect())
                .unwrap_or_default(),
            created_at: time_field(doc, "createdAt"),
            updated_at: time_field(doc, "updatedAt"),
        })
    }

    fn to_persistence(image: &Image) -> Document {
        let mut doc = Document::new();
        doc.insert("userId".into(), Value::String(image.user_id.clone()));
        doc.insert("fileKey".into(), Value::String(image.file_key.clone()));
        doc.insert("playgroundId".into(), Value::String(image.playground_id.clone()));
        doc.insert("status".into(), json!(image.status));
        doc.insert(
            "faces".into(),
            Value::Array(image.faces.iter().map(Face::to_value).collect()),
        );
        put_timestamps(&mut doc, image.created_at, image.updated_at);
        doc
    }

    fn create_transform(&self, body: Document) -> Result<Document, AppError> {
        let mut doc = pick(&body, FIELDS);
        doc.entry("faces").or_insert_with(|| Value::Array(Vec::new()));
        doc.entry("status").or_insert_with(|| json!(ImageStatus::default()));
        if let Some(faces) = doc.get("faces") {
            check_faces(faces)?;
        }
        Ok(doc)
    }

    fn update_transform(&self, body: Document) -> Result<Document, AppError> {
        let doc = pick(&body, FIELDS);
        if let Some(faces) = doc.get("faces") {
            check_faces(faces)?;
        }
        Ok(doc)
    }

    fn validation_rules(&self) -> Vec<(&'static str, ValidationRule)> {
        vec![
            ("userId", ValidationRule::required()),
            ("fileKey", ValidationRule::required().format("string")),
            ("playgroundId", ValidationRule::required()),
            ("status", ValidationRule::default().allowed(ImageStatus::ALL)),
        ]
    }
}

impl EmbeddedList for ImageResource {
    const ELEMENT: &'static str = "Face";
    const LIST_FIELD: &'static str = "faces";
    const KEY_FIELD: &'static str = "milvusId";
    const PATCHABLE: &'static [&'static str] = &["personId", "bbox", "name"];

    fn validate_element_patch(patch: &Document) -> Result<(), AppError> {
        if let Some(bbox) = patch.get("bbox") {
            check_bbox(bbox)?;
        }
        match patch.get("personId") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => return Err(AppError::Validation("personId must be a string or null".into())),
        }
        match patch.get("name") {
            None | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(AppError::Validation("face name must be a string".into())),
        }
    }
}
