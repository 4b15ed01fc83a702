//! Document validation hookpoint and the built-in structural checks

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use schemata_core::route::{HttpMethod, Operation, ParameterLocation};
use schemata_core::{OpenApi, Schema, SchemaRef};
use thiserror::Error;

use crate::route::RoutePattern;

/// One problem found in an assembled document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnresolvedReference { location: String, reference: String },
    InvalidPattern { location: String, pattern: String, reason: String },
    InvalidPath { path: String, reason: String },
    DuplicateOperationId { operation_id: String, first: String, second: String },
    /// `{name}` in the path with no matching path parameter
    UndeclaredPathParameter { operation: String, name: String },
    /// Path parameter with no matching `{name}` in the path
    UnusedPathParameter { operation: String, name: String },
    MissingResponses { operation: String },
    UnknownSecurityScheme { location: String, scheme: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { location, reference } => {
                write!(f, "{location}: reference {reference} does not resolve")
            }
            Self::InvalidPattern {
                location,
                pattern,
                reason,
            } => write!(f, "{location}: pattern {pattern:?} does not compile: {reason}"),
            Self::InvalidPath { path, reason } => write!(f, "path {path}: {reason}"),
            Self::DuplicateOperationId {
                operation_id,
                first,
                second,
            } => write!(
                f,
                "operationId {operation_id:?} is used by both {first} and {second}"
            ),
            Self::UndeclaredPathParameter { operation, name } => {
                write!(f, "{operation}: path placeholder {{{name}}} is not declared")
            }
            Self::UnusedPathParameter { operation, name } => {
                write!(f, "{operation}: path parameter {name} does not appear in the path")
            }
            Self::MissingResponses { operation } => write!(f, "{operation}: no responses"),
            Self::UnknownSecurityScheme { location, scheme } => {
                write!(f, "{location}: security scheme {scheme} is not declared")
            }
        }
    }
}

/// A document that failed validation, with every issue found
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document failed validation: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks an assembled document before it is handed back
pub trait DocumentValidator {
    /// # Errors
    ///
    /// A [`ValidationError`] listing what is wrong with the document.
    fn validate(&self, document: &OpenApi) -> Result<(), ValidationError>;
}

/// Validator that accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl DocumentValidator for AcceptAll {
    fn validate(&self, _document: &OpenApi) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Internal consistency checks: references resolve, patterns compile,
/// operation ids are unique, path placeholders match path parameters,
/// every operation documents a response and security requirements name
/// declared schemes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl DocumentValidator for StructuralValidator {
    fn validate(&self, document: &OpenApi) -> Result<(), ValidationError> {
        let mut checker = Checker::new(document);
        checker.check_document();
        if checker.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                issues: checker.issues,
            })
        }
    }
}

struct Checker<'a> {
    document: &'a OpenApi,
    schemes: BTreeSet<&'a str>,
    operation_ids: BTreeMap<&'a str, String>,
    issues: Vec<ValidationIssue>,
}

impl<'a> Checker<'a> {
    fn new(document: &'a OpenApi) -> Self {
        let schemes = document
            .components
            .as_ref()
            .and_then(|components| components.security_schemes.as_ref())
            .map(|schemes| schemes.keys().map(String::as_str).collect())
            .unwrap_or_default();
        Self {
            document,
            schemes,
            operation_ids: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    fn check_document(&mut self) {
        let document = self.document;
        if let Some(schemas) = document
            .components
            .as_ref()
            .and_then(|components| components.schemas.as_ref())
        {
            for (name, schema) in schemas {
                self.check_schema(schema, &format!("#/components/schemas/{name}"));
            }
        }
        for requirement in document.security.iter().flatten() {
            self.check_security(requirement, "document");
        }
        for (path, item) in &document.paths {
            let placeholders = match RoutePattern::parse(path) {
                Ok(parsed) => parsed
                    .path_params
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect::<BTreeSet<_>>(),
                Err(reason) => {
                    self.issues.push(ValidationIssue::InvalidPath {
                        path: path.clone(),
                        reason,
                    });
                    continue;
                }
            };
            for (method, operation) in item.operations() {
                self.check_operation(path, method, operation, &placeholders);
            }
        }
    }

    fn check_operation(
        &mut self,
        path: &str,
        method: HttpMethod,
        operation: &'a Operation,
        placeholders: &BTreeSet<String>,
    ) {
        let location = format!("{method} {path}");

        if let Some(id) = operation.operation_id.as_deref() {
            match self.operation_ids.get(id) {
                Some(first) => self.issues.push(ValidationIssue::DuplicateOperationId {
                    operation_id: id.to_string(),
                    first: first.clone(),
                    second: location.clone(),
                }),
                None => {
                    self.operation_ids.insert(id, location.clone());
                }
            }
        }

        let parameters = operation.parameters.as_deref().unwrap_or_default();
        let declared: BTreeSet<&str> = parameters
            .iter()
            .filter(|parameter| parameter.r#in == ParameterLocation::Path)
            .map(|parameter| parameter.name.as_str())
            .collect();
        for name in placeholders {
            if !declared.contains(name.as_str()) {
                self.issues.push(ValidationIssue::UndeclaredPathParameter {
                    operation: location.clone(),
                    name: name.clone(),
                });
            }
        }
        for name in &declared {
            if !placeholders.contains(*name) {
                self.issues.push(ValidationIssue::UnusedPathParameter {
                    operation: location.clone(),
                    name: (*name).to_string(),
                });
            }
        }
        for parameter in parameters {
            if let Some(schema) = &parameter.schema {
                self.check_schema_ref(schema, &format!("{location} parameter {}", parameter.name));
            }
        }

        if let Some(body) = &operation.request_body {
            for (content_type, media) in &body.content {
                if let Some(schema) = &media.schema {
                    self.check_schema_ref(schema, &format!("{location} request {content_type}"));
                }
            }
        }
        if operation.responses.is_empty() {
            self.issues.push(ValidationIssue::MissingResponses {
                operation: location.clone(),
            });
        }
        for (status, response) in &operation.responses {
            for media in response.content.iter().flat_map(BTreeMap::values) {
                if let Some(schema) = &media.schema {
                    self.check_schema_ref(schema, &format!("{location} response {status}"));
                }
            }
        }
        for requirement in operation.security.iter().flatten() {
            self.check_security(requirement, &location);
        }
    }

    fn check_security(&mut self, requirement: &BTreeMap<String, Vec<String>>, location: &str) {
        for scheme in requirement.keys() {
            if !self.schemes.contains(scheme.as_str()) {
                self.issues.push(ValidationIssue::UnknownSecurityScheme {
                    location: location.to_string(),
                    scheme: scheme.clone(),
                });
            }
        }
    }

    fn check_schema_ref(&mut self, schema: &SchemaRef, location: &str) {
        match schema {
            SchemaRef::Ref(reference) => {
                let resolves = reference
                    .component_name()
                    .is_some_and(|name| self.document.schema(name).is_some());
                if !resolves {
                    self.issues.push(ValidationIssue::UnresolvedReference {
                        location: location.to_string(),
                        reference: reference.ref_path.clone(),
                    });
                }
            }
            SchemaRef::Inline(schema) => self.check_schema(schema, location),
        }
    }

    fn check_schema(&mut self, schema: &Schema, location: &str) {
        if let Some(pattern) = &schema.pattern
            && let Err(err) = Regex::new(pattern)
        {
            self.issues.push(ValidationIssue::InvalidPattern {
                location: location.to_string(),
                pattern: pattern.clone(),
                reason: err.to_string(),
            });
        }
        if let Some(items) = &schema.items {
            self.check_schema_ref(items, &format!("{location}.items"));
        }
        if let Some(values) = &schema.additional_properties {
            self.check_schema_ref(values, &format!("{location}.additionalProperties"));
        }
        for (name, property) in schema.properties.iter().flatten() {
            self.check_schema_ref(property, &format!("{location}.{name}"));
        }
        for (index, part) in schema.all_of.iter().flatten().enumerate() {
            self.check_schema_ref(part, &format!("{location}.allOf[{index}]"));
        }
    }
}
