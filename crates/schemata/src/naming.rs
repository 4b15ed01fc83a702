//! Canonical schema names

use sha2::{Digest, Sha256};

use crate::descriptor::Identity;
use crate::options::{AnonymousNaming, ApiOptions};

/// Characters that are not valid inside a component schema key
const SEPARATORS: [char; 9] = ['/', '.', '[', ']', '<', '>', ',', ' ', ':'];

/// Replace namespace separators and generic delimiters with `_`.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| if SEPARATORS.contains(&c) { '_' } else { c })
        .collect()
}

/// Computes component names for identities and anonymous shapes
#[derive(Debug, Clone, Default)]
pub struct SchemaNamer {
    strip_prefixes: Vec<String>,
    anonymous: AnonymousNaming,
}

impl SchemaNamer {
    #[must_use]
    pub const fn new(strip_prefixes: Vec<String>, anonymous: AnonymousNaming) -> Self {
        Self {
            strip_prefixes,
            anonymous,
        }
    }

    #[must_use]
    pub fn from_options(options: &ApiOptions) -> Self {
        Self::new(options.strip_prefixes.clone(), options.anonymous_naming)
    }

    /// Canonical name of a named identity; `None` for anonymous shapes.
    #[must_use]
    pub fn name(&self, identity: &Identity) -> Option<String> {
        if identity.is_anonymous() {
            return None;
        }
        let stripped = identity.namespace.is_empty()
            || self
                .strip_prefixes
                .iter()
                .any(|prefix| identity.namespace.starts_with(prefix.as_str()));
        Some(if stripped {
            normalize(&identity.local_name)
        } else {
            normalize(&format!("{}/{}", identity.namespace, identity.local_name))
        })
    }

    /// Synthetic name for a shape with no local name.
    ///
    /// `registered` is the number of names bound at naming time, including
    /// hidden embedded-only and still-compiling schemas, and `fingerprint` a
    /// stable rendering of the shape.
    #[must_use]
    pub fn anonymous_name(&self, registered: usize, fingerprint: &str) -> String {
        match self.anonymous {
            AnonymousNaming::Sequential => format!("AnonymousType{registered}"),
            AnonymousNaming::ContentHash => {
                let mut hasher = Sha256::new();
                hasher.update(fingerprint.as_bytes());
                let digest = format!("{:x}", hasher.finalize());
                format!("AnonymousType_{}", &digest[..16])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("github.com/a-h/rest/models", "User", vec![], "github_com_a-h_rest_models_User")]
    #[case("github.com/a-h/rest/models", "User", vec!["github.com/a-h/rest"], "User")]
    #[case("", "User", vec!["unrelated"], "User")]
    #[case("models", "Page[models.User]", vec!["models"], "Page_models_User_")]
    #[case("crate::api", "Page<User, Team>", vec![], "crate__api_Page_User__Team_")]
    fn names_strip_configured_prefixes(
        #[case] namespace: &str,
        #[case] local: &str,
        #[case] prefixes: Vec<&str>,
        #[case] expected: &str,
    ) {
        let namer = SchemaNamer::new(
            prefixes.into_iter().map(String::from).collect(),
            AnonymousNaming::Sequential,
        );
        assert_eq!(
            namer.name(&Identity::new(namespace, local)).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn anonymous_identities_have_no_canonical_name() {
        assert!(SchemaNamer::default().name(&Identity::anonymous()).is_none());
    }

    #[test]
    fn sequential_anonymous_names_count_registrations() {
        let namer = SchemaNamer::default();
        assert_eq!(namer.anonymous_name(0, "a"), "AnonymousType0");
        assert_eq!(namer.anonymous_name(3, "b"), "AnonymousType3");
    }

    #[test]
    fn content_hash_names_ignore_order() {
        let namer = SchemaNamer::new(Vec::new(), AnonymousNaming::ContentHash);
        let first = namer.anonymous_name(0, "fields: [a]");
        let later = namer.anonymous_name(7, "fields: [a]");
        let other = namer.anonymous_name(0, "fields: [b]");

        assert_eq!(first, later);
        assert_ne!(first, other);
        assert!(first.starts_with("AnonymousType_"));
        assert_eq!(first.len(), "AnonymousType_".len() + 16);
    }
}
