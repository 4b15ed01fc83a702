//! Route table: pattern -> method -> route entry

use std::collections::BTreeMap;

use schemata_core::route::{HttpMethod, SecurityRequirement};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{CompileError, Result};

/// A `{placeholder}` segment of the path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParam {
    pub description: Option<String>,
    /// Constraint the segment must match
    pub regexp: Option<String>,
    pub example: Option<serde_json::Value>,
}

impl PathParam {
    #[must_use]
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = Some(regexp.into());
        self
    }

    fn fill(&mut self, other: Self) {
        self.description = self.description.take().or(other.description);
        self.regexp = self.regexp.take().or(other.regexp);
        self.example = self.example.take().or(other.example);
    }
}

/// A query string parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParam {
    pub description: Option<String>,
    pub required: bool,
    pub allow_empty: bool,
    /// Schema type of the value
    pub kind: PrimitiveKind,
    pub regexp: Option<String>,
    pub example: Option<serde_json::Value>,
}

impl QueryParam {
    #[must_use]
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    #[must_use]
    pub const fn kind(mut self, kind: PrimitiveKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = Some(regexp.into());
        self
    }

    #[must_use]
    pub fn example(mut self, example: serde_json::Value) -> Self {
        self.example = Some(example);
        self
    }

    fn fill(&mut self, other: Self) {
        self.description = self.description.take().or(other.description);
        self.regexp = self.regexp.take().or(other.regexp);
        self.example = self.example.take().or(other.example);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    pub path: BTreeMap<String, PathParam>,
    pub query: BTreeMap<String, QueryParam>,
}

/// Everything documented about one (pattern, method) pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteEntry {
    pub params: Params,
    pub request: Option<TypeDescriptor>,
    /// Status code -> response body shape
    pub responses: BTreeMap<u16, TypeDescriptor>,
    pub tags: Vec<String>,
    pub operation_id: Option<String>,
    pub description: Option<String>,
    pub security: Vec<SecurityRequirement>,
}

impl RouteEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn request(mut self, shape: TypeDescriptor) -> Self {
        self.request = Some(shape);
        self
    }

    #[must_use]
    pub fn response(mut self, status: u16, shape: TypeDescriptor) -> Self {
        self.responses.insert(status, shape);
        self
    }

    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, param: PathParam) -> Self {
        self.params.path.insert(name.into(), param);
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, param: QueryParam) -> Self {
        self.params.query.insert(name.into(), param);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require `scheme` with the given scopes
    #[must_use]
    pub fn security(mut self, scheme: impl Into<String>, scopes: &[&str]) -> Self {
        self.security.push(BTreeMap::from([(
            scheme.into(),
            scopes.iter().map(ToString::to_string).collect(),
        )]));
        self
    }

    /// Fold `other` into `self` without overwriting anything already set.
    ///
    /// Singular fields keep the first value seen; params and responses gain
    /// the keys they do not have yet, and params already present only have
    /// their unset attributes filled in.
    pub fn merge(&mut self, other: Self) {
        if self.request.is_none() {
            self.request = other.request;
        }
        if self.operation_id.is_none() {
            self.operation_id = other.operation_id;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.tags.is_empty() {
            self.tags = other.tags;
        }
        if self.security.is_empty() {
            self.security = other.security;
        }
        for (name, param) in other.params.path {
            match self.params.path.get_mut(&name) {
                Some(existing) => existing.fill(param),
                None => {
                    self.params.path.insert(name, param);
                }
            }
        }
        for (name, param) in other.params.query {
            match self.params.query.get_mut(&name) {
                Some(existing) => existing.fill(param),
                None => {
                    self.params.query.insert(name, param);
                }
            }
        }
        for (status, shape) in other.responses {
            self.responses.entry(status).or_insert(shape);
        }
    }
}

/// A route pattern split into its documented path and its placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// Path with inline constraints and the query string removed
    pub path: String,
    /// Path placeholders in order, with their inline constraint if any
    pub path_params: Vec<(String, Option<String>)>,
    /// Placeholder names used as query string values
    pub query_params: Vec<String>,
}

impl RoutePattern {
    /// Parse `/users/{id:[0-9]+}/posts?page={page}`.
    ///
    /// # Errors
    ///
    /// Returns a reason when the pattern is not absolute, a brace is
    /// unbalanced or a placeholder has no name.
    pub fn parse(pattern: &str) -> std::result::Result<Self, String> {
        if !pattern.starts_with('/') {
            return Err("pattern must start with '/'".to_string());
        }

        let mut path = String::with_capacity(pattern.len());
        let mut path_params = Vec::new();
        let mut placeholder = String::new();
        let mut depth = 0usize;
        let mut query = None;

        for (at, c) in pattern.char_indices() {
            match (c, depth) {
                ('?', 0) => {
                    query = Some(&pattern[at + 1..]);
                    break;
                }
                ('{', 0) => depth = 1,
                ('}', 0) => return Err(format!("unexpected '}}' at offset {at}")),
                (_, 0) => path.push(c),
                ('{', _) => {
                    depth += 1;
                    placeholder.push(c);
                }
                ('}', 1) => {
                    depth = 0;
                    let (name, constraint) = split_placeholder(&placeholder)?;
                    path.push('{');
                    path.push_str(&name);
                    path.push('}');
                    path_params.push((name, constraint));
                    placeholder.clear();
                }
                ('}', _) => {
                    depth -= 1;
                    placeholder.push(c);
                }
                _ => placeholder.push(c),
            }
        }
        if depth != 0 {
            return Err("unclosed '{'".to_string());
        }

        let query_params = query
            .into_iter()
            .flat_map(|query| query.split('&'))
            .filter_map(|pair| pair.split_once('=').map(|(_, value)| value))
            .filter_map(|value| value.strip_prefix('{')?.strip_suffix('}'))
            .map(|inner| split_placeholder(inner).map(|(name, _)| name))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            path,
            path_params,
            query_params,
        })
    }
}

fn split_placeholder(inner: &str) -> std::result::Result<(String, Option<String>), String> {
    let (name, constraint) = match inner.split_once(':') {
        Some((name, constraint)) => (name, Some(constraint.to_string())),
        None => (inner, None),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("placeholder {{{inner}}} has no name"));
    }
    Ok((name.to_string(), constraint))
}

/// Routes keyed by documented path, then method
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, BTreeMap<HttpMethod, RouteEntry>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, merging into any entry already present for the same
    /// path and method. Inline `{name:regex}` constraints become path
    /// parameters unless the entry already declares one.
    ///
    /// # Errors
    ///
    /// [`CompileError::InvalidRoute`] when the pattern cannot be parsed.
    pub fn route(&mut self, method: HttpMethod, pattern: &str, mut entry: RouteEntry) -> Result<&mut RouteEntry> {
        let parsed = RoutePattern::parse(pattern).map_err(|reason| CompileError::InvalidRoute {
            method: method.to_string(),
            pattern: pattern.to_string(),
            reason,
        })?;
        for (name, constraint) in parsed.path_params {
            let param = entry.params.path.entry(name).or_default();
            if param.regexp.is_none() {
                param.regexp = constraint;
            }
        }
        for name in parsed.query_params {
            entry.params.query.entry(name).or_default();
        }

        let methods = self.routes.entry(parsed.path.clone()).or_default();
        let slot = match methods.entry(method) {
            std::collections::btree_map::Entry::Occupied(occupied) => {
                debug!(%method, path = %parsed.path, "merging route");
                let existing = occupied.into_mut();
                existing.merge(entry);
                existing
            }
            std::collections::btree_map::Entry::Vacant(vacant) => vacant.insert(entry),
        };
        Ok(slot)
    }

    #[must_use]
    pub fn get(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        self.routes.get(path)?.get(&method)
    }

    /// Routes in path order, then method order
    pub fn iter(&self) -> impl Iterator<Item = (&str, HttpMethod, &RouteEntry)> {
        self.routes.iter().flat_map(|(path, methods)| {
            methods
                .iter()
                .map(move |(method, entry)| (path.as_str(), *method, entry))
        })
    }

    /// Number of (path, method) pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
