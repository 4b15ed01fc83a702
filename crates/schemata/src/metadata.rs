//! Metadata lookup: documentation text and enum constants supplied from outside.
//!
//! The compiler never scrapes comments itself. Build tooling hands it a
//! [`MetadataProvider`]; the providers here cover the common cases of "none",
//! a sidecar file ([`StaticMetadata`]) and a per-namespace loader with a
//! first-miss-then-fill cache ([`NamespaceCache`]).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::descriptor::{EnumValue, Identity};

/// Failure reported by a metadata source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("metadata lookup for namespace {namespace:?} failed: {message}")]
pub struct MetadataError {
    pub namespace: String,
    pub message: String,
}

impl MetadataError {
    pub fn new(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            message: message.into(),
        }
    }
}

/// Source of per-type and per-field documentation and enum constants.
///
/// A missing entry is `Ok(None)` / an empty list; `Err` is reserved for a
/// lookup that could not be performed and aborts compilation.
pub trait MetadataProvider {
    /// Documentation attached to a type
    fn type_description(&self, identity: &Identity) -> Result<Option<String>, MetadataError>;

    /// Documentation attached to a field of a type, keyed by wire name
    fn field_description(
        &self,
        identity: &Identity,
        field: &str,
    ) -> Result<Option<String>, MetadataError>;

    /// Declared constants of an enumeration, in declaration order
    fn enum_values(&self, identity: &Identity) -> Result<Vec<EnumValue>, MetadataError>;
}

/// Whether documentation text flags the item as deprecated.
///
/// Only a line that starts with `Deprecated:` counts; the word in the middle
/// of a sentence does not.
#[must_use]
pub fn is_deprecated(text: &str) -> bool {
    text.lines()
        .any(|line| line.trim_start().starts_with("Deprecated:"))
}

/// Provider that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn type_description(&self, _identity: &Identity) -> Result<Option<String>, MetadataError> {
        Ok(None)
    }

    fn field_description(
        &self,
        _identity: &Identity,
        _field: &str,
    ) -> Result<Option<String>, MetadataError> {
        Ok(None)
    }

    fn enum_values(&self, _identity: &Identity) -> Result<Vec<EnumValue>, MetadataError> {
        Ok(Vec::new())
    }
}

/// Everything known about one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceMetadata {
    /// Local type name -> description
    pub types: BTreeMap<String, String>,
    /// Local type name -> field wire name -> description
    pub fields: BTreeMap<String, BTreeMap<String, String>>,
    /// Local enum type name -> constants
    pub enums: BTreeMap<String, Vec<EnumValue>>,
}

impl NamespaceMetadata {
    fn type_description(&self, local_name: &str) -> Option<String> {
        self.types.get(local_name).cloned()
    }

    fn field_description(&self, local_name: &str, field: &str) -> Option<String> {
        self.fields.get(local_name)?.get(field).cloned()
    }

    fn enum_values(&self, local_name: &str) -> Vec<EnumValue> {
        self.enums.get(local_name).cloned().unwrap_or_default()
    }
}

/// Loads all metadata of a namespace in one go (e.g. a doc-comment scraper).
pub trait NamespaceSource {
    fn load(&self, namespace: &str) -> Result<NamespaceMetadata, MetadataError>;
}

/// In-memory metadata, typically deserialized from a sidecar file:
///
/// ```json
/// { "models": { "types": { "User": "A user." }, "fields": { "User": { "id": "Identifier." } } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticMetadata {
    namespaces: BTreeMap<String, NamespaceMetadata>,
}

impl StaticMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sidecar JSON document
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document does not match the layout.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn with_type_description(mut self, identity: &Identity, text: &str) -> Self {
        self.entry(identity)
            .types
            .insert(identity.local_name.clone(), text.to_string());
        self
    }

    #[must_use]
    pub fn with_field_description(mut self, identity: &Identity, field: &str, text: &str) -> Self {
        self.entry(identity)
            .fields
            .entry(identity.local_name.clone())
            .or_default()
            .insert(field.to_string(), text.to_string());
        self
    }

    #[must_use]
    pub fn with_enum_values(mut self, identity: &Identity, values: Vec<EnumValue>) -> Self {
        self.entry(identity)
            .enums
            .insert(identity.local_name.clone(), values);
        self
    }

    fn entry(&mut self, identity: &Identity) -> &mut NamespaceMetadata {
        self.namespaces
            .entry(identity.namespace.clone())
            .or_default()
    }

    fn namespace(&self, namespace: &str) -> Option<&NamespaceMetadata> {
        self.namespaces.get(namespace)
    }
}

impl MetadataProvider for StaticMetadata {
    fn type_description(&self, identity: &Identity) -> Result<Option<String>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)
            .and_then(|ns| ns.type_description(&identity.local_name)))
    }

    fn field_description(
        &self,
        identity: &Identity,
        field: &str,
    ) -> Result<Option<String>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)
            .and_then(|ns| ns.field_description(&identity.local_name, field)))
    }

    fn enum_values(&self, identity: &Identity) -> Result<Vec<EnumValue>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)
            .map(|ns| ns.enum_values(&identity.local_name))
            .unwrap_or_default())
    }
}

impl NamespaceSource for StaticMetadata {
    fn load(&self, namespace: &str) -> Result<NamespaceMetadata, MetadataError> {
        Ok(self.namespace(namespace).cloned().unwrap_or_default())
    }
}

/// Caches a [`NamespaceSource`] per namespace.
///
/// Each namespace is loaded at most once for the life of the cache; failed
/// loads are not cached and surface to the caller. There is no invalidation.
pub struct NamespaceCache<S> {
    source: S,
    loaded: RefCell<HashMap<String, Rc<NamespaceMetadata>>>,
}

impl<S: NamespaceSource> NamespaceCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            loaded: RefCell::new(HashMap::new()),
        }
    }

    /// Number of namespaces loaded so far
    pub fn loaded_count(&self) -> usize {
        self.loaded.borrow().len()
    }

    fn namespace(&self, namespace: &str) -> Result<Rc<NamespaceMetadata>, MetadataError> {
        if let Some(hit) = self.loaded.borrow().get(namespace) {
            return Ok(Rc::clone(hit));
        }
        debug!(namespace, "loading namespace metadata");
        let loaded = Rc::new(self.source.load(namespace)?);
        self.loaded
            .borrow_mut()
            .insert(namespace.to_string(), Rc::clone(&loaded));
        Ok(loaded)
    }
}

impl<S: NamespaceSource> MetadataProvider for NamespaceCache<S> {
    fn type_description(&self, identity: &Identity) -> Result<Option<String>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)?
            .type_description(&identity.local_name))
    }

    fn field_description(
        &self,
        identity: &Identity,
        field: &str,
    ) -> Result<Option<String>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)?
            .field_description(&identity.local_name, field))
    }

    fn enum_values(&self, identity: &Identity) -> Result<Vec<EnumValue>, MetadataError> {
        Ok(self
            .namespace(&identity.namespace)?
            .enum_values(&identity.local_name))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rstest::rstest;

    use super::*;

    struct CountingSource {
        inner: StaticMetadata,
        loads: Cell<usize>,
    }

    impl NamespaceSource for CountingSource {
        fn load(&self, namespace: &str) -> Result<NamespaceMetadata, MetadataError> {
            self.loads.set(self.loads.get() + 1);
            if namespace == "broken" {
                return Err(MetadataError::new(namespace, "could not load package"));
            }
            self.inner.load(namespace)
        }
    }

    fn user() -> Identity {
        Identity::new("models", "User")
    }

    #[rstest]
    #[case("FullName of something.\nDeprecated: Use FirstName and LastName", true)]
    #[case("Deprecated: gone", true)]
    #[case("MiddleName of something. Deprecated: not at line start", false)]
    #[case("Nothing to see", false)]
    fn deprecation_marker_must_start_a_line(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_deprecated(text), expected);
    }

    #[test]
    fn static_metadata_answers_by_identity() {
        let metadata = StaticMetadata::new()
            .with_type_description(&user(), "A user.")
            .with_field_description(&user(), "id", "Identifier.")
            .with_enum_values(&Identity::new("models", "Role"), vec!["admin".into()]);

        assert_eq!(
            metadata.type_description(&user()).unwrap().as_deref(),
            Some("A user.")
        );
        assert_eq!(
            metadata.field_description(&user(), "id").unwrap().as_deref(),
            Some("Identifier.")
        );
        assert_eq!(metadata.field_description(&user(), "name").unwrap(), None);
        assert_eq!(
            metadata
                .enum_values(&Identity::new("models", "Role"))
                .unwrap(),
            vec![EnumValue::from("admin")]
        );
        assert!(
            metadata
                .type_description(&Identity::new("other", "User"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn static_metadata_loads_from_sidecar_json() {
        let metadata = StaticMetadata::from_json(
            r#"{
                "models": {
                    "types": { "User": "A user." },
                    "fields": { "User": { "id": "Identifier." } },
                    "enums": { "Level": [1, 2, 3] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            metadata.type_description(&user()).unwrap().as_deref(),
            Some("A user.")
        );
        assert_eq!(
            metadata
                .enum_values(&Identity::new("models", "Level"))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn namespace_cache_loads_each_namespace_once() {
        let cache = NamespaceCache::new(CountingSource {
            inner: StaticMetadata::new().with_type_description(&user(), "A user."),
            loads: Cell::new(0),
        });

        for _ in 0..3 {
            assert_eq!(
                cache.type_description(&user()).unwrap().as_deref(),
                Some("A user.")
            );
            cache.field_description(&user(), "id").unwrap();
        }
        cache
            .type_description(&Identity::new("other", "Thing"))
            .unwrap();

        assert_eq!(cache.source.loads.get(), 2);
        assert_eq!(cache.loaded_count(), 2);
    }

    #[test]
    fn namespace_cache_surfaces_failures_without_caching_them() {
        let cache = NamespaceCache::new(CountingSource {
            inner: StaticMetadata::new(),
            loads: Cell::new(0),
        });
        let broken = Identity::new("broken", "Thing");

        let err = cache.type_description(&broken).unwrap_err();
        assert_eq!(err.namespace, "broken");
        assert!(cache.enum_values(&broken).is_err());
        assert_eq!(cache.source.loads.get(), 2);
        assert_eq!(cache.loaded_count(), 0);
    }
}
