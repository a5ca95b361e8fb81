//! Static per-resource configuration types.

/// Write-time constraints for one document field.
#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: Option<bool>,
    /// `email` or `string`.
    pub format: Option<String>,
    /// Minimum length in characters, for string values.
    pub min_length: Option<u32>,
    pub allowed: Option<Vec<serde_json::Value>>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Whether list results carry a `total` count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationPolicy {
    Paginate,
    NoPaginate,
}
