//! Operation assembly: route table + schema registry -> OpenAPI document

use std::collections::BTreeMap;

use schemata_core::route::{
    HttpMethod, MediaType, Operation, Parameter, ParameterLocation, RequestBody, Response,
};
use schemata_core::schema::{Components, SecurityScheme};
use schemata_core::{OpenApi, Schema, SchemaRef};
use tracing::debug;

use crate::adapter::RouteAdapter;
use crate::descriptor::Identity;
use crate::error::Result;
use crate::metadata::MetadataProvider;
use crate::options::ApiOptions;
use crate::registry::SchemaRegistry;
use crate::route::{PathParam, QueryParam, RouteEntry, RouteTable};
use crate::validate::{DocumentValidator, StructuralValidator};

/// An API under construction: routes, security schemes and the registry
/// that compiles their shapes.
pub struct Api {
    options: ApiOptions,
    routes: RouteTable,
    registry: SchemaRegistry,
    security_schemes: BTreeMap<String, SecurityScheme>,
    validator: Box<dyn DocumentValidator>,
}

impl Api {
    /// New API validated with [`StructuralValidator`]
    #[must_use]
    pub fn new(options: ApiOptions) -> Self {
        Self {
            registry: SchemaRegistry::new(&options),
            options,
            routes: RouteTable::new(),
            security_schemes: BTreeMap::new(),
            validator: Box::new(StructuralValidator),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.registry = self.registry.with_metadata(provider);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl DocumentValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Add or merge a route; see [`RouteTable::route`].
    ///
    /// # Errors
    ///
    /// `InvalidRoute` when the pattern cannot be parsed.
    pub fn route(&mut self, method: HttpMethod, pattern: &str, entry: RouteEntry) -> Result<&mut RouteEntry> {
        self.routes.route(method, pattern, entry)
    }

    /// # Errors
    ///
    /// See [`RouteTable::merge_adapter`].
    pub fn merge_adapter(&mut self, adapter: &impl RouteAdapter) -> Result<usize> {
        self.routes.merge_adapter(adapter)
    }

    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn security_scheme(&mut self, name: impl Into<String>, scheme: SecurityScheme) {
        self.security_schemes.insert(name.into(), scheme);
    }

    pub fn register_hook(&mut self, identity: Identity, hook: impl Fn(&mut Schema) + 'static) {
        self.registry.register_hook(identity, hook);
    }

    pub fn register_global_hook(&mut self, hook: impl Fn(&Identity, &mut Schema) + 'static) {
        self.registry.register_global_hook(hook);
    }

    /// Compile every route and assemble the validated document.
    ///
    /// The pass is atomic: on any error no schema from this call stays
    /// registered and no document is returned.
    ///
    /// # Errors
    ///
    /// Any compilation error, or `ValidationFailed` from the validator.
    pub fn spec(&mut self) -> Result<OpenApi> {
        let Self {
            options,
            routes,
            registry,
            security_schemes,
            validator,
        } = self;

        registry.atomically(|registry| {
            let mut document = OpenApi::new(options.title.clone(), options.version.clone());
            document.openapi = options.openapi;
            document.info.description.clone_from(&options.description);
            if !options.servers.is_empty() {
                document.servers = Some(options.servers.clone());
            }

            for (path, method, entry) in routes.iter() {
                let operation = assemble_operation(registry, entry)?;
                document
                    .paths
                    .entry(path.to_string())
                    .or_default()
                    .set_operation(method, operation);
            }

            registry.resolve_forward_references()?;
            let schemas = registry.schemas();
            if !schemas.is_empty() || !security_schemes.is_empty() {
                document.components = Some(Components {
                    schemas: (!schemas.is_empty()).then_some(schemas),
                    security_schemes: (!security_schemes.is_empty())
                        .then(|| security_schemes.clone()),
                });
            }

            validator.validate(&document)?;
            debug!(
                paths = document.paths.len(),
                schemas = document.schema_count(),
                "assembled document"
            );
            Ok(document)
        })
    }
}

fn assemble_operation(registry: &mut SchemaRegistry, entry: &RouteEntry) -> Result<Operation> {
    let mut parameters: Vec<Parameter> = entry
        .params
        .path
        .iter()
        .map(|(name, param)| path_parameter(name, param))
        .collect();
    parameters.extend(
        entry
            .params
            .query
            .iter()
            .map(|(name, param)| query_parameter(name, param)),
    );

    let request_body = match &entry.request {
        Some(shape) => Some(RequestBody {
            description: None,
            required: None,
            content: MediaType::json_content(registry.compile(shape)?),
        }),
        None => None,
    };

    let mut responses = BTreeMap::new();
    for (status, shape) in &entry.responses {
        responses.insert(
            status.to_string(),
            Response {
                description: String::new(),
                content: Some(MediaType::json_content(registry.compile(shape)?)),
            },
        );
    }

    Ok(Operation {
        operation_id: entry.operation_id.clone(),
        tags: (!entry.tags.is_empty()).then(|| entry.tags.clone()),
        summary: None,
        description: entry.description.clone(),
        parameters: (!parameters.is_empty()).then_some(parameters),
        request_body,
        responses,
        security: (!entry.security.is_empty()).then(|| entry.security.clone()),
    })
}

fn path_parameter(name: &str, param: &PathParam) -> Parameter {
    Parameter {
        name: name.to_string(),
        r#in: ParameterLocation::Path,
        description: param.description.clone(),
        required: Some(true),
        allow_empty_value: None,
        schema: Some(SchemaRef::inline(Schema {
            pattern: param.regexp.clone(),
            ..Schema::string()
        })),
        example: param.example.clone(),
    }
}

fn query_parameter(name: &str, param: &QueryParam) -> Parameter {
    Parameter {
        name: name.to_string(),
        r#in: ParameterLocation::Query,
        description: param.description.clone(),
        required: Some(param.required),
        allow_empty_value: param.allow_empty.then_some(true),
        schema: Some(SchemaRef::inline(Schema {
            pattern: param.regexp.clone(),
            ..param.kind.schema()
        })),
        example: param.example.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Field, PrimitiveKind, TypeDescriptor};
    use crate::error::CompileError;
    use crate::validate::AcceptAll;
    use schemata_core::SchemaType;

    fn user() -> TypeDescriptor {
        TypeDescriptor::record(
            Identity::new("", "User"),
            vec![
                Field::new("id", TypeDescriptor::integer()),
                Field::new("name", TypeDescriptor::string()),
            ],
        )
    }

    #[test]
    fn parameters_are_sorted_path_first() {
        let mut api = Api::new(ApiOptions::default());
        api.route(
            HttpMethod::Get,
            "/orgs/{org}/users/{id}",
            RouteEntry::new()
                .query_param("sort", QueryParam::default())
                .query_param("limit", QueryParam::default().kind(PrimitiveKind::Integer).required())
                .response(200, user()),
        )
        .unwrap();

        let doc = api.spec().unwrap();
        let op = doc.paths["/orgs/{org}/users/{id}"].get.as_ref().unwrap();
        let names: Vec<_> = op
            .parameters
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| (p.name.as_str(), p.r#in))
            .collect();
        assert_eq!(
            names,
            vec![
                ("id", ParameterLocation::Path),
                ("org", ParameterLocation::Path),
                ("limit", ParameterLocation::Query),
                ("sort", ParameterLocation::Query),
            ]
        );
        let limit = &op.parameters.as_ref().unwrap()[2];
        assert_eq!(limit.required, Some(true));
        assert_eq!(
            limit.schema.as_ref().and_then(SchemaRef::as_inline).and_then(|s| s.schema_type),
            Some(SchemaType::Integer)
        );
    }

    #[test]
    fn query_parameter_flags_and_pattern() {
        let param = query_parameter(
            "q",
            &QueryParam::described("Search")
                .allow_empty()
                .regexp("^[a-z]+$")
                .example(serde_json::json!("abc")),
        );
        assert_eq!(param.required, Some(false));
        assert_eq!(param.allow_empty_value, Some(true));
        assert_eq!(
            param.schema.as_ref().and_then(SchemaRef::as_inline).and_then(|s| s.pattern.as_deref()),
            Some("^[a-z]+$")
        );
        assert_eq!(param.example, Some(serde_json::json!("abc")));
    }

    #[test]
    fn bodies_are_json_with_empty_response_descriptions() {
        let mut api = Api::new(ApiOptions::default());
        api.route(
            HttpMethod::Post,
            "/users",
            RouteEntry::new().request(user()).response(201, user()),
        )
        .unwrap();

        let doc = api.spec().unwrap();
        let op = doc.paths["/users"].post.as_ref().unwrap();
        let request = &op.request_body.as_ref().unwrap().content["application/json"];
        assert_eq!(
            request.schema.as_ref().and_then(SchemaRef::component_name),
            Some("User")
        );
        assert_eq!(op.responses["201"].description, "");
        assert_eq!(doc.schema_count(), 1);
    }

    #[test]
    fn validation_failures_roll_back_the_pass() {
        let mut api = Api::new(ApiOptions::default());
        api.route(
            HttpMethod::Get,
            "/users",
            RouteEntry::new().response(200, user()).security("oauth", &["read"]),
        )
        .unwrap();

        let err = api.spec().unwrap_err();
        assert!(matches!(err, CompileError::ValidationFailed(_)));
        assert!(api.registry().is_empty());
    }

    #[test]
    fn custom_validator_replaces_structural_checks() {
        let mut api = Api::new(ApiOptions::default()).with_validator(AcceptAll);
        api.route(HttpMethod::Get, "/nothing", RouteEntry::new()).unwrap();
        let doc = api.spec().unwrap();
        assert!(doc.paths["/nothing"].get.as_ref().unwrap().responses.is_empty());
        assert!(doc.components.is_none());
    }
}
