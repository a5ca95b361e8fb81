//! Standard response envelope helpers.

use serde::{Deserialize, Serialize};

/// The only success shape handed to callers: `{ success, data[, total][, message] }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    /// Count of all records matching the filter; present only on paginated lists.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

/// Identifier-only payload returned by delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedId {
    pub id: String,
}

pub fn success_one<T: Serialize>(data: T) -> Envelope<T> {
    Envelope {
        success: true,
        data,
        total: None,
        message: None,
    }
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> Envelope<Vec<T>> {
    Envelope {
        success: true,
        data,
        total: None,
        message: None,
    }
}

pub fn success_paginated<T: Serialize>(data: Vec<T>, total: u64) -> Envelope<Vec<T>> {
    Envelope {
        success: true,
        data,
        total: Some(total),
        message: None,
    }
}

pub fn success_with_message<T: Serialize>(data: T, message: String) -> Envelope<T> {
    Envelope {
        success: true,
        data,
        total: None,
        message: Some(message),
    }
}

pub fn error_body(code: &str, message: String, details: Option<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": {
            "code": code,
            "message": message,
            "details": details
        }
    })
}
