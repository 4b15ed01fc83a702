//! Document-level options, loadable from any serde format

use schemata_core::openapi::{OpenApiVersion, Server};
use serde::{Deserialize, Serialize};

/// How shapes without a local name are named
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnonymousNaming {
    /// `AnonymousType<N>`, N being the number of schemas registered so far.
    /// Names depend on registration order.
    #[default]
    Sequential,
    /// `AnonymousType_<hash>` derived from the shape itself; stable across orderings.
    ContentHash,
}

/// What to do when an enum lists the same literal more than once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnumDuplicates {
    /// Keep the first occurrence of each literal
    #[default]
    Deduplicate,
    /// Fail with `DuplicateEnumValue`
    Reject,
}

/// Options for one generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub openapi: OpenApiVersion,
    /// Namespaces starting with any of these are dropped from schema names
    pub strip_prefixes: Vec<String>,
    pub anonymous_naming: AnonymousNaming,
    pub enum_duplicates: EnumDuplicates,
    pub servers: Vec<Server>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.0.0".to_string(),
            description: None,
            openapi: OpenApiVersion::default(),
            strip_prefixes: Vec::new(),
            anonymous_naming: AnonymousNaming::default(),
            enum_duplicates: EnumDuplicates::default(),
            servers: Vec::new(),
        }
    }
}

impl ApiOptions {
    #[must_use]
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub const fn anonymous_naming(mut self, naming: AnonymousNaming) -> Self {
        self.anonymous_naming = naming;
        self
    }

    #[must_use]
    pub const fn enum_duplicates(mut self, policy: EnumDuplicates) -> Self {
        self.enum_duplicates = policy;
        self
    }
}
