//! Faceplay: a generic CRUD engine over a document store, with users, playgrounds,
//! persons and images (with embedded faces) served as a JSON REST API.

pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod query;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{Settings, StoreBackend};
pub use error::{AppError, ConfigError, ErrorKind, NotFoundLevel};
pub use query::{parse as parse_query, QueryDescriptor, RawQuery};
pub use response::{error_body, success_many, success_one, success_paginated, Envelope};
pub use routes::{app, common_routes};
pub use service::{CrudEngine, ElementMutator};
pub use state::AppState;
pub use store::schema::{ensure_collections, ensure_database_exists, CollectionSpec};
pub use store::{DocumentStore, MemoryStore, PgDocumentStore};

/// Collections backing the four resources, in the order they are created.
pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec::of::<resource::UserResource>(),
    CollectionSpec::of::<resource::PlaygroundResource>(),
    CollectionSpec::of::<resource::PersonResource>(),
    CollectionSpec::of::<resource::ImageResource>(),
];
