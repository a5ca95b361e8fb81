//! Write-time document validation from per-resource rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use crate::query::filter::values_equal;
use crate::store::Document;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full document. All required fields must be present and non-null.
    pub fn validate(doc: &Document, rules: &[(&str, ValidationRule)]) -> Result<(), AppError> {
        for (field, rule) in rules {
            let val = doc.get(*field);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in `patch`. A required field may not be set to null.
    pub fn validate_partial(patch: &Document, rules: &[(&str, ValidationRule)]) -> Result<(), AppError> {
        for (field, rule) in rules {
            let Some(v) = patch.get(*field) else { continue };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            validate_field(field, v, rule)?;
        }
        Ok(())
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                field, min
            )));
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| values_equal(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                field,
                allowed.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
            )));
        }
    }
    Ok(())
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let ok = match format.to_lowercase().as_str() {
        "email" => v.as_str().map_or(false, |s| {
            let mut parts = s.splitn(2, '@');
            matches!((parts.next(), parts.next()), (Some(local), Some(domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'))
        }),
        "string" => v.is_string(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", field, format)))
    }
}
