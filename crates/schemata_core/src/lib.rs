//! Schemata core - OpenAPI document model
//!
//! Plain serde data describing the document the `schemata` compiler produces:
//! paths, operations, parameters and the component schema registry snapshot.
//! Encoding to JSON/YAML and serving the document are left to callers.

pub mod openapi;
pub mod route;
pub mod schema;

pub use openapi::OpenApi;
pub use schema::{Reference, Schema, SchemaRef, SchemaType};
