pub mod crud;
pub mod element;
pub mod validation;

pub use crud::CrudEngine;
pub use element::ElementMutator;
pub use validation::RequestValidator;

use crate::error::{AppError, ErrorKind};

/// Single exit point for engine errors. Classified client errors pass through untouched;
/// store and driver failures are logged with context and collapsed into `Internal`.
pub fn normalize(op: &'static str, resource: &str, id: Option<&str>, err: AppError) -> AppError {
    let id = id.unwrap_or("-");
    match err.kind() {
        ErrorKind::Internal => {
            tracing::error!(op, resource, id, error = %err, "operation failed");
            if matches!(err, AppError::Internal(_)) {
                err
            } else {
                AppError::Internal(err.to_string())
            }
        }
        ErrorKind::NotFound => {
            tracing::debug!(op, resource, id, "{}", err);
            err
        }
        _ => err,
    }
}
