//! HTTP handlers: generic resource CRUD plus the image face and user profile endpoints.

pub mod image;
pub mod resource;
pub mod user;
