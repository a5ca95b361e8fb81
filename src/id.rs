//! Store identifier codecs: syntax check before any I/O, and generation on insert.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, normalized store identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Native identifier syntax of a store. Supplied by the store adapter so the engine does not
/// hard-code one format.
pub trait IdentifierCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_valid(&self, raw: &str) -> bool;

    /// Validate and normalize; `BadIdentifier` when the syntax does not match.
    fn parse(&self, raw: &str) -> Result<RecordId, AppError> {
        if self.is_valid(raw) {
            Ok(RecordId(self.normalize(raw)))
        } else {
            Err(AppError::BadIdentifier(format!(
                "'{}' is not a valid {}",
                raw,
                self.name()
            )))
        }
    }

    fn normalize(&self, raw: &str) -> String {
        raw.to_string()
    }

    fn generate(&self) -> RecordId;
}

/// 24 hex characters: 4 bytes of unix seconds followed by 8 random bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectIdCodec;

impl IdentifierCodec for ObjectIdCodec {
    fn name(&self) -> &'static str {
        "object id"
    }

    fn is_valid(&self, raw: &str) -> bool {
        raw.len() == 24 && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    fn normalize(&self, raw: &str) -> String {
        raw.to_ascii_lowercase()
    }

    fn generate(&self) -> RecordId {
        let secs = chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let random = uuid::Uuid::new_v4();
        let mut out = format!("{:08x}", secs);
        for b in &random.as_bytes()[..8] {
            out.push_str(&format!("{:02x}", b));
        }
        RecordId(out)
    }
}

/// Hyphenated UUIDs, for stores keyed by UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidCodec;

impl IdentifierCodec for UuidCodec {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn is_valid(&self, raw: &str) -> bool {
        raw.len() == 36 && uuid::Uuid::parse_str(raw).is_ok()
    }

    fn normalize(&self, raw: &str) -> String {
        uuid::Uuid::parse_str(raw)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string())
    }

    fn generate(&self) -> RecordId {
        RecordId(uuid::Uuid::new_v4().to_string())
    }
}
