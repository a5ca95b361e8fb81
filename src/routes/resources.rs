//! `/api/v1/<resource>` routers built from the generic handlers.

use crate::handlers::{image, resource, user};
use crate::resource::{ImageResource, PersonResource, PlaygroundResource, ResourceAdapter, UserResource};
use crate::service::CrudEngine;
use crate::state::AppState;
use axum::{
    extract::FromRef,
    routing::{get, put},
    Router,
};
use std::sync::Arc;

/// GET/POST `/`, GET/PUT/PATCH/DELETE `/:id` for one resource.
pub fn resource_router<R>() -> Router<AppState>
where
    R: ResourceAdapter,
    Arc<CrudEngine<R>>: FromRef<AppState>,
{
    Router::new()
        .route("/", get(resource::list::<R>).post(resource::create::<R>))
        .route(
            "/:id",
            get(resource::read::<R>)
                .put(resource::update::<R>)
                .patch(resource::update::<R>)
                .delete(resource::delete::<R>),
        )
}

/// Every resource router, to be nested under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    let users = Router::new()
        .route("/profile", get(user::profile))
        .merge(resource_router::<UserResource>());
    let images = Router::new()
        .route("/:id/faces/:milvus_id", put(image::update_face).patch(image::update_face))
        .merge(resource_router::<ImageResource>());

    Router::new()
        .nest("/users", users)
        .nest("/images", images)
        .nest("/persons", resource_router::<PersonResource>())
        .nest("/playgrounds", resource_router::<PlaygroundResource>())
}
