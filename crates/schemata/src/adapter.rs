//! Route adapters: routes discovered from an external router's table.
//!
//! An adapter only contributes the presence of routes and parameters. Types,
//! constraints and descriptions declared on the [`RouteTable`] are never
//! overwritten by a merge.

use schemata_core::route::HttpMethod;
use tracing::{debug, warn};

use crate::error::{CompileError, Result};
use crate::route::{PathParam, QueryParam, RouteEntry, RoutePattern, RouteTable};

/// One route as reported by a router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedRoute {
    pub method: String,
    pub pattern: String,
    pub path_params: Vec<String>,
    pub query_params: Vec<String>,
}

/// Yields the routes a router has registered
pub trait RouteAdapter {
    /// # Errors
    ///
    /// Adapter specific; returned unchanged by [`RouteTable::merge_adapter`].
    fn routes(&self) -> Result<Vec<AdaptedRoute>>;
}

/// Adapter over raw `(method, pattern)` registrations.
///
/// Parameter names are read from `{placeholder}` path segments and from
/// `key={placeholder}` query values. Unparseable patterns are skipped with
/// a warning.
#[derive(Debug, Clone, Default)]
pub struct PatternAdapter {
    registrations: Vec<(String, String)>,
}

impl PatternAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, method: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.registrations.push((method.into(), pattern.into()));
        self
    }
}

impl RouteAdapter for PatternAdapter {
    fn routes(&self) -> Result<Vec<AdaptedRoute>> {
        let mut routes = Vec::with_capacity(self.registrations.len());
        for (method, pattern) in &self.registrations {
            let parsed = match RoutePattern::parse(pattern) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    warn!(%method, %pattern, %reason, "skipping unparseable route pattern");
                    continue;
                }
            };
            routes.push(AdaptedRoute {
                method: method.clone(),
                pattern: pattern.clone(),
                path_params: parsed.path_params.into_iter().map(|(name, _)| name).collect(),
                query_params: parsed.query_params,
            });
        }
        Ok(routes)
    }
}

impl RouteTable {
    /// Merge every route an adapter reports; returns how many were merged.
    ///
    /// # Errors
    ///
    /// The adapter's own error, or [`CompileError::InvalidRoute`] for an
    /// unknown method or malformed pattern.
    pub fn merge_adapter(&mut self, adapter: &impl RouteAdapter) -> Result<usize> {
        let routes = adapter.routes()?;
        let merged = routes.len();
        for adapted in routes {
            let method = HttpMethod::try_from(adapted.method.as_str()).map_err(|reason| {
                CompileError::InvalidRoute {
                    method: adapted.method.clone(),
                    pattern: adapted.pattern.clone(),
                    reason,
                }
            })?;
            let mut entry = RouteEntry::new();
            for name in adapted.path_params {
                entry = entry.path_param(name, PathParam::default());
            }
            for name in adapted.query_params {
                entry = entry.query_param(name, QueryParam::default());
            }
            self.route(method, &adapted.pattern, entry)?;
        }
        debug!(routes = merged, "merged adapter routes");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_reports_placeholders() {
        let adapter = PatternAdapter::new().route("GET", "/search/{kind}?q={query}");
        let routes = adapter.routes().unwrap();
        assert_eq!(
            routes,
            vec![AdaptedRoute {
                method: "GET".to_string(),
                pattern: "/search/{kind}?q={query}".to_string(),
                path_params: vec!["kind".to_string()],
                query_params: vec!["query".to_string()],
            }]
        );
    }

    #[test]
    fn unparseable_patterns_are_skipped() {
        let adapter = PatternAdapter::new()
            .route("GET", "/broken/{id")
            .route("GET", "/fine");
        assert_eq!(adapter.routes().unwrap().len(), 1);
    }

    #[test]
    fn merge_keeps_declared_params() {
        let pattern = r"/organisation/{orgId:\d+}/user/{userId}/{role}";
        let mut table = RouteTable::new();
        table
            .route(
                HttpMethod::Get,
                "/organisation/{orgId}/user/{userId}/{role}",
                RouteEntry::new().path_param("role", PathParam::described("Role of the user")),
            )
            .unwrap();

        let merged = table
            .merge_adapter(&PatternAdapter::new().route("get", pattern))
            .unwrap();
        assert_eq!(merged, 1);
        assert_eq!(table.len(), 1);

        let params = &table
            .get(HttpMethod::Get, "/organisation/{orgId}/user/{userId}/{role}")
            .unwrap()
            .params
            .path;
        assert_eq!(params.len(), 3);
        assert_eq!(params["orgId"].regexp.as_deref(), Some(r"\d+"));
        assert_eq!(params["userId"], PathParam::default());
        assert_eq!(params["role"].description.as_deref(), Some("Role of the user"));
    }

    #[test]
    fn unknown_methods_are_invalid_routes() {
        let mut table = RouteTable::new();
        let err = table
            .merge_adapter(&PatternAdapter::new().route("FETCH", "/users"))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidRoute { .. }));
    }
}
