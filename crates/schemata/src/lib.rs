//! Schemata - structural schema compiler and OpenAPI route assembler
//!
//! Describe the data shapes of an API once as [`TypeDescriptor`]s, declare its
//! routes on an [`Api`], and get back an [`OpenApi`] document whose component
//! schemas are deduplicated, named deterministically and validated for
//! internal consistency. Encoding and serving the document are left to the
//! caller.

pub mod adapter;
pub mod assembler;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod metadata;
pub mod naming;
pub mod options;
pub mod registry;
pub mod route;
pub mod validate;

// Re-export the document model so users don't need to depend on schemata_core directly
pub mod schema {
    pub use schemata_core::schema::*;
}

pub mod openapi {
    pub use schemata_core::openapi::*;
}

pub use schemata_core::OpenApi;
pub use schemata_core::route::HttpMethod;

pub use adapter::{AdaptedRoute, PatternAdapter, RouteAdapter};
pub use assembler::Api;
pub use descriptor::{EnumBase, EnumValue, Field, Identity, PrimitiveKind, TypeDescriptor};
pub use error::{CompileError, Result};
pub use metadata::{
    MetadataError, MetadataProvider, NamespaceCache, NamespaceMetadata, NamespaceSource,
    NoMetadata, StaticMetadata,
};
pub use options::{AnonymousNaming, ApiOptions, EnumDuplicates};
pub use registry::SchemaRegistry;
pub use route::{PathParam, QueryParam, RouteEntry, RouteTable};
pub use validate::{AcceptAll, DocumentValidator, StructuralValidator, ValidationError, ValidationIssue};
