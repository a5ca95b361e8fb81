//! Shared application state: one engine per resource over a single store handle.

use crate::resource::{ImageResource, PersonResource, PlaygroundResource, UserResource};
use crate::service::{CrudEngine, ElementMutator};
use crate::store::DocumentStore;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub users: Arc<CrudEngine<UserResource>>,
    pub playgrounds: Arc<CrudEngine<PlaygroundResource>>,
    pub persons: Arc<CrudEngine<PersonResource>>,
    pub images: Arc<CrudEngine<ImageResource>>,
    pub faces: Arc<ElementMutator<ImageResource>>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        AppState {
            users: Arc::new(CrudEngine::new(store.clone(), UserResource)),
            playgrounds: Arc::new(CrudEngine::new(store.clone(), PlaygroundResource)),
            persons: Arc::new(CrudEngine::new(store.clone(), PersonResource)),
            images: Arc::new(CrudEngine::new(store.clone(), ImageResource)),
            faces: Arc::new(ElementMutator::new(store.clone(), ImageResource)),
            store,
        }
    }
}

macro_rules! engine_from_state {
    ($field:ident, $resource:ty) => {
        impl FromRef<AppState> for Arc<CrudEngine<$resource>> {
            fn from_ref(state: &AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}

engine_from_state!(users, UserResource);
engine_from_state!(playgrounds, PlaygroundResource);
engine_from_state!(persons, PersonResource);
engine_from_state!(images, ImageResource);
