//! Generic resource handlers: list, read, create, update, delete.
//! Owner-scoped resources see only the caller's records and get the caller's id stamped on writes.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::query::{self, QueryDescriptor, RawQuery};
use crate::resource::ResourceAdapter;
use crate::response::{DeletedId, Envelope};
use crate::service::CrudEngine;
use crate::store::Document;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

/// Request body as a JSON object; malformed JSON and non-objects are 400s.
pub(crate) fn body_document(body: Result<Json<Value>, JsonRejection>) -> Result<Document, AppError> {
    match body {
        Ok(Json(Value::Object(doc))) => Ok(doc),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

pub(crate) fn scope<R: ResourceAdapter>(query: QueryDescriptor, caller: &Caller) -> QueryDescriptor {
    match R::OWNER_FIELD {
        Some(field) => query.scoped_to(field, caller.0.clone()),
        None => query,
    }
}

fn stamp_owner<R: ResourceAdapter>(body: &mut Document, caller: &Caller) {
    if let Some(field) = R::OWNER_FIELD {
        body.insert(field.to_string(), Value::String(caller.0.clone()));
    }
}

/// For owner-scoped resources, NotFound unless `id` belongs to the caller.
async fn ensure_owned<R: ResourceAdapter>(engine: &CrudEngine<R>, id: &str, caller: &Caller) -> Result<(), AppError> {
    if R::OWNER_FIELD.is_some() {
        engine.find_one(id, &scope::<R>(QueryDescriptor::default(), caller)).await?;
    }
    Ok(())
}

pub async fn list<R: ResourceAdapter>(
    State(engine): State<Arc<CrudEngine<R>>>,
    caller: Caller,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Envelope<Vec<R::Domain>>>, AppError> {
    let query = scope::<R>(query::parse(&raw)?, &caller);
    Ok(Json(engine.find(&query).await?))
}

pub async fn read<R: ResourceAdapter>(
    State(engine): State<Arc<CrudEngine<R>>>,
    caller: Caller,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> Result<Json<Envelope<R::Domain>>, AppError> {
    let query = scope::<R>(query::parse(&raw)?, &caller);
    Ok(Json(engine.find_one(&id, &query).await?))
}

pub async fn create<R: ResourceAdapter>(
    State(engine): State<Arc<CrudEngine<R>>>,
    caller: Caller,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<R::Domain>>), AppError> {
    let mut body = body_document(body)?;
    stamp_owner::<R>(&mut body, &caller);
    Ok((StatusCode::CREATED, Json(engine.create(body).await?)))
}

pub async fn update<R: ResourceAdapter>(
    State(engine): State<Arc<CrudEngine<R>>>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Envelope<R::Domain>>, AppError> {
    let mut body = body_document(body)?;
    ensure_owned(&engine, &id, &caller).await?;
    stamp_owner::<R>(&mut body, &caller);
    Ok(Json(engine.update(&id, body).await?))
}

pub async fn delete<R: ResourceAdapter>(
    State(engine): State<Arc<CrudEngine<R>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DeletedId>>, AppError> {
    ensure_owned(&engine, &id, &caller).await?;
    Ok(Json(engine.delete(&id).await?))
}
