use crate::error::{AppError, NotFoundLevel};
use crate::extractors::Caller;
use crate::handlers::resource::{body_document, scope};
use crate::query::QueryDescriptor;
use crate::resource::{Image, ImageResource, ResourceAdapter};
use crate::response::Envelope;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

/// PUT|PATCH /images/:id/faces/:milvus_id
pub async fn update_face(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, milvus_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<Image>>, AppError> {
    let patch = body_document(body)?;
    let owned = scope::<ImageResource>(QueryDescriptor::default(), &caller);
    state.images.find_one(&id, &owned).await.map_err(|e| match e.not_found_level() {
        Some(_) => AppError::not_found(ImageResource::NAME, NotFoundLevel::Parent, id.as_str()),
        None => e,
    })?;
    Ok(Json(state.faces.update_element(&id, &milvus_id, patch).await?))
}
