use crate::error::AppError;
use crate::extractors::Caller;
use crate::query::QueryDescriptor;
use crate::resource::User;
use crate::response::Envelope;
use crate::state::AppState;
use axum::{extract::State, Json};

/// GET /users/profile: the caller's own account.
pub async fn profile(State(state): State<AppState>, Caller(user_id): Caller) -> Result<Json<Envelope<User>>, AppError> {
    Ok(Json(state.users.find_one(&user_id, &QueryDescriptor::default()).await?))
}
