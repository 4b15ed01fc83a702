//! The memoizing schema compiler.
//!
//! [`SchemaRegistry::compile`] turns a [`TypeDescriptor`] into a [`SchemaRef`],
//! registering every named record, enum and referenceable alias it meets
//! under its canonical name. A name, once bound, is reused and never
//! recompiled. Records are bound before their fields are compiled, and
//! [`TypeDescriptor::Named`] references may point at a record defined later
//! in the same pass, so cyclic graphs compile the same in any route order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use schemata_core::{Schema, SchemaRef};
use tracing::{debug, trace};

use crate::descriptor::{EnumBase, EnumValue, Field, Identity, TypeDescriptor};
use crate::error::{CompileError, Result};
use crate::hooks::CustomizationHooks;
use crate::metadata::{MetadataProvider, NoMetadata, is_deprecated};
use crate::naming::SchemaNamer;
use crate::options::{ApiOptions, EnumDuplicates};

/// Memoization key of a named shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
    Named(Identity),
    /// Structural fingerprint of a shape without a local name
    Anonymous(String),
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(identity) => write!(f, "{identity}"),
            Self::Anonymous(_) => write!(f, "<anonymous shape>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Name bound, fields still compiling
    InProgress,
    Complete,
}

#[derive(Debug)]
struct Entry {
    key: ShapeKey,
    schema: Schema,
    state: EntryState,
    /// Only ever reached through embedding; hidden from the snapshot
    embedded_only: bool,
    /// Rendering of the defining descriptor; a rebind must match it
    definition: String,
}

/// How a named shape is being reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Referenced,
    Embedded,
}

/// Registry mutation recorded so a failed pass can be undone
#[derive(Debug)]
enum Change {
    Inserted(String),
    Promoted(String),
    Forward(String),
}

/// Name -> schema map plus the recursive compiler that fills it.
///
/// One registry serves one document. It is not `Sync`; callers building
/// several documents concurrently use one registry each.
pub struct SchemaRegistry {
    namer: SchemaNamer,
    enum_duplicates: EnumDuplicates,
    metadata: Box<dyn MetadataProvider>,
    hooks: CustomizationHooks,
    bindings: HashMap<ShapeKey, String>,
    entries: BTreeMap<String, Entry>,
    /// Names referenced through `Named` before any definition was seen
    forward: BTreeMap<String, Identity>,
    journal: Vec<Change>,
    /// Nesting of `atomically` passes
    depth: usize,
    /// Field names from the top-level shape down to the one compiling
    trail: Vec<String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(&ApiOptions::default())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("namer", &self.namer)
            .field("enum_duplicates", &self.enum_duplicates)
            .field("hooks", &self.hooks)
            .field("schemas", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SchemaRegistry {
    #[must_use]
    pub fn new(options: &ApiOptions) -> Self {
        Self {
            namer: SchemaNamer::from_options(options),
            enum_duplicates: options.enum_duplicates,
            metadata: Box::new(NoMetadata),
            hooks: CustomizationHooks::new(),
            bindings: HashMap::new(),
            entries: BTreeMap::new(),
            forward: BTreeMap::new(),
            journal: Vec::new(),
            depth: 0,
            trail: Vec::new(),
        }
    }

    /// Replace the metadata provider consulted for descriptions and enum values
    #[must_use]
    pub fn with_metadata(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.metadata = Box::new(provider);
        self
    }

    /// Run `hook` on the schema of `identity` right after it is compiled
    pub fn register_hook(&mut self, identity: Identity, hook: impl Fn(&mut Schema) + 'static) {
        self.hooks.register(identity, hook);
    }

    /// Run `hook` on every named record, enum and alias after its own hooks
    pub fn register_global_hook(&mut self, hook: impl Fn(&Identity, &mut Schema) + 'static) {
        self.hooks.register_global(hook);
    }

    /// Compile a shape, registering every named schema reachable from it.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`]; on failure the registry is left exactly as it
    /// was before the call.
    pub fn compile(&mut self, shape: &TypeDescriptor) -> Result<SchemaRef> {
        self.atomically(|registry| {
            registry.trail.clear();
            registry.compile_shape(shape, Usage::Referenced)
        })
    }

    /// Run `pass` as one unit: if it fails, every schema it registered is
    /// removed again. Passes nest; an inner failure only undoes its own work.
    ///
    /// When the outermost pass ends, every `Named` reference it made must
    /// have found its definition.
    ///
    /// # Errors
    ///
    /// Whatever `pass` returns, or `UndefinedShape` for a dangling reference.
    pub fn atomically<T>(&mut self, pass: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.journal.len();
        self.depth += 1;
        let mut result = pass(self);
        self.depth -= 1;
        if self.depth == 0
            && result.is_ok()
            && let Err(err) = self.resolve_forward_references()
        {
            result = Err(err);
        }
        if result.is_err() {
            self.rollback_to(checkpoint);
        }
        if self.depth == 0 {
            self.journal.clear();
            self.forward.clear();
        }
        result
    }

    /// Every visible schema, keyed by canonical name
    #[must_use]
    pub fn schemas(&self) -> BTreeMap<String, Schema> {
        self.visible()
            .map(|(name, entry)| (name.clone(), entry.schema.clone()))
            .collect()
    }

    /// Number of visible schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.entries
            .get(name)
            .filter(|entry| Self::is_visible(entry))
            .map(|entry| &entry.schema)
    }

    fn is_visible(entry: &Entry) -> bool {
        entry.state == EntryState::Complete && !entry.embedded_only
    }

    fn visible(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| Self::is_visible(entry))
    }

    /// Check every forward reference made so far against the names bound by
    /// now, making embedded-only targets visible.
    ///
    /// # Errors
    ///
    /// `UndefinedShape` for a reference with no definition, `NameCollision`
    /// when its name was bound by a different identity.
    pub(crate) fn resolve_forward_references(&mut self) -> Result<()> {
        let forward = std::mem::take(&mut self.forward);
        for (name, identity) in forward {
            let Some(entry) = self.entries.get_mut(&name) else {
                return Err(CompileError::UndefinedShape { identity });
            };
            if entry.key != ShapeKey::Named(identity.clone()) {
                return Err(CompileError::NameCollision {
                    name,
                    existing: entry.key.to_string(),
                    incoming: identity.to_string(),
                });
            }
            if entry.embedded_only {
                entry.embedded_only = false;
                self.journal.push(Change::Promoted(name.clone()));
            }
            trace!(schema = %name, "forward reference resolved");
        }
        Ok(())
    }

    fn rollback_to(&mut self, checkpoint: usize) {
        for change in self.journal.drain(checkpoint..).rev() {
            match change {
                Change::Inserted(name) => {
                    if let Some(entry) = self.entries.remove(&name) {
                        self.bindings.remove(&entry.key);
                    }
                }
                Change::Promoted(name) => {
                    if let Some(entry) = self.entries.get_mut(&name) {
                        entry.embedded_only = true;
                    }
                }
                Change::Forward(name) => {
                    self.forward.remove(&name);
                }
            }
        }
        debug!(schemas = self.entries.len(), "rolled back failed compilation");
    }

    fn context(&self) -> String {
        if self.trail.is_empty() {
            "top-level shape".to_string()
        } else {
            self.trail.join(".")
        }
    }

    fn compile_shape(&mut self, shape: &TypeDescriptor, usage: Usage) -> Result<SchemaRef> {
        match shape {
            TypeDescriptor::Primitive(kind) => Ok(SchemaRef::inline(kind.schema())),
            TypeDescriptor::Optional(inner) => {
                let compiled = self.compile_shape(inner, Usage::Referenced)?;
                Ok(nullable(compiled))
            }
            TypeDescriptor::Sequence(element) => {
                let items = self.compile_shape(element, Usage::Referenced)?;
                Ok(SchemaRef::inline(Schema {
                    nullable: Some(true),
                    ..Schema::array(items)
                }))
            }
            TypeDescriptor::Dictionary { key, value } => {
                if !key.is_text() {
                    return Err(CompileError::UnsupportedKeyType {
                        key: key.describe(),
                        context: self.context(),
                    });
                }
                let values = self.compile_shape(value, Usage::Referenced)?;
                Ok(SchemaRef::inline(Schema {
                    nullable: Some(true),
                    ..Schema::map(values)
                }))
            }
            TypeDescriptor::Enum {
                identity,
                base,
                values,
            } => self.compile_enum(shape, identity, *base, values),
            TypeDescriptor::Record { identity, fields } => {
                self.compile_record(shape, identity, fields, usage)
            }
            TypeDescriptor::KnownAlias { identity, schema } => {
                self.compile_alias(shape, identity, schema)
            }
            TypeDescriptor::Named(identity) => self.compile_named(identity, usage),
            TypeDescriptor::Unsupported(what) => Err(CompileError::unsupported(format!(
                "{what} at {}",
                self.context()
            ))),
        }
    }

    fn key_and_name(&self, identity: &Identity, shape: &TypeDescriptor) -> (ShapeKey, String) {
        if let Some(name) = self.namer.name(identity) {
            return (ShapeKey::Named(identity.clone()), name);
        }
        let fingerprint = format!("{shape:?}");
        let name = self
            .bindings
            .get(&ShapeKey::Anonymous(fingerprint.clone()))
            .cloned()
            .unwrap_or_else(|| self.namer.anonymous_name(self.entries.len(), &fingerprint));
        (ShapeKey::Anonymous(fingerprint), name)
    }

    fn bind(
        &mut self,
        name: &str,
        key: ShapeKey,
        shape: &TypeDescriptor,
        entry_state: EntryState,
        embedded_only: bool,
    ) -> Result<()> {
        if let Some(existing) = self.entries.get(name) {
            return Err(CompileError::NameCollision {
                name: name.to_string(),
                existing: existing.key.to_string(),
                incoming: key.to_string(),
            });
        }
        self.bindings.insert(key.clone(), name.to_string());
        self.entries.insert(
            name.to_string(),
            Entry {
                key,
                schema: Schema::default(),
                state: entry_state,
                embedded_only,
                definition: format!("{shape:?}"),
            },
        );
        self.journal.push(Change::Inserted(name.to_string()));
        Ok(())
    }

    fn finish(&mut self, name: &str, schema: Schema) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.schema = schema;
            entry.state = EntryState::Complete;
        }
        debug!(schema = %name, "registered schema");
    }

    /// Reject a second definition of a bound identity that differs from the first.
    fn check_definition(&self, name: &str, identity: &Identity, shape: &TypeDescriptor) -> Result<()> {
        match self.entries.get(name) {
            Some(entry) if entry.definition != format!("{shape:?}") => {
                Err(CompileError::ConflictingDefinition {
                    name: name.to_string(),
                    identity: identity.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Reuse an already bound name, promoting embedded-only records on first reference.
    fn reuse(&mut self, name: &str, usage: Usage) -> Result<SchemaRef> {
        let Some(entry) = self.entries.get_mut(name) else {
            return Err(CompileError::unsupported(format!(
                "schema {name} is bound but missing"
            )));
        };
        match usage {
            Usage::Embedded if entry.state == EntryState::InProgress => {
                return Err(CompileError::unsupported(format!(
                    "{} embeds itself",
                    entry.key
                )));
            }
            Usage::Referenced if entry.embedded_only => {
                entry.embedded_only = false;
                self.journal.push(Change::Promoted(name.to_string()));
                debug!(schema = %name, "embedded record referenced directly");
            }
            _ => debug!(schema = %name, "reusing registered schema"),
        }
        Ok(SchemaRef::component(name))
    }

    fn describe_type(&self, identity: &Identity, schema: &mut Schema) -> Result<()> {
        if identity.is_anonymous() {
            return Ok(());
        }
        if let Some(text) = self.metadata.type_description(identity)? {
            if is_deprecated(&text) {
                schema.deprecated = Some(true);
            }
            schema.description = Some(text);
        }
        Ok(())
    }

    fn compile_record(
        &mut self,
        shape: &TypeDescriptor,
        identity: &Identity,
        fields: &[Field],
        usage: Usage,
    ) -> Result<SchemaRef> {
        let (key, name) = self.key_and_name(identity, shape);
        if self.bindings.contains_key(&key) {
            self.check_definition(&name, identity, shape)?;
            return self.reuse(&name, usage);
        }
        self.bind(&name, key, shape, EntryState::InProgress, usage == Usage::Embedded)?;

        let mut schema = Schema::object();
        self.describe_type(identity, &mut schema)?;
        for field in fields {
            self.trail.push(field.name.clone());
            let compiled = self.compile_field(identity, field, &mut schema);
            self.trail.pop();
            compiled?;
        }
        if schema.required.as_ref().is_some_and(Vec::is_empty) {
            schema.required = None;
        }
        self.hooks.apply(identity, &mut schema);
        self.finish(&name, schema);
        Ok(SchemaRef::component(&name))
    }

    fn compile_field(&mut self, owner: &Identity, field: &Field, schema: &mut Schema) -> Result<()> {
        trace!(owner = %owner, field = %field.name, shape = %field.shape.describe(), "compiling field");
        if field.embedded {
            return self.splice_embedded(owner, field, schema);
        }

        let compiled = self.compile_shape(&field.shape, Usage::Referenced)?;
        let description = if owner.is_anonymous() {
            None
        } else {
            self.metadata.field_description(owner, &field.name)?
        };
        let property = match description {
            Some(text) => describe_property(compiled, text),
            None => compiled,
        };
        insert_property(schema, &field.name, property, field.is_required());
        Ok(())
    }

    fn splice_embedded(&mut self, owner: &Identity, field: &Field, schema: &mut Schema) -> Result<()> {
        let target = match &field.shape {
            TypeDescriptor::Optional(inner) => inner.as_ref(),
            shape => shape,
        };
        let (identity, compiled) = match target {
            TypeDescriptor::Record { identity, fields } => (
                identity,
                self.compile_record(target, identity, fields, Usage::Embedded)?,
            ),
            TypeDescriptor::Named(identity) => (identity, self.compile_named(identity, Usage::Embedded)?),
            _ => {
                return Err(CompileError::unsupported(format!(
                    "cannot embed {} into {owner}",
                    target.describe()
                )));
            }
        };
        let Some(embedded) = compiled
            .component_name()
            .and_then(|name| self.entries.get(name))
            .map(|entry| entry.schema.clone())
        else {
            return Err(CompileError::unsupported(format!(
                "embedded record {identity} did not register"
            )));
        };

        let properties = schema.properties.get_or_insert_with(BTreeMap::new);
        let required = schema.required.get_or_insert_with(Vec::new);
        for (name, property) in embedded.properties.unwrap_or_default() {
            required.retain(|existing| existing != &name);
            properties.insert(name, property);
        }
        required.extend(embedded.required.unwrap_or_default());
        debug!(owner = %owner, embedded = %identity, "spliced embedded record");
        Ok(())
    }

    fn compile_enum(
        &mut self,
        shape: &TypeDescriptor,
        identity: &Identity,
        base: EnumBase,
        declared: &[EnumValue],
    ) -> Result<SchemaRef> {
        let (key, name) = self.key_and_name(identity, shape);
        if self.bindings.contains_key(&key) {
            self.check_definition(&name, identity, shape)?;
            return self.reuse(&name, Usage::Referenced);
        }

        let values = if declared.is_empty() && !identity.is_anonymous() {
            self.metadata.enum_values(identity)?
        } else {
            declared.to_vec()
        };
        if values.is_empty() {
            return Err(CompileError::unsupported(format!(
                "enum {identity} has no values"
            )));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(values.len());
        for value in values {
            if value.base() != base {
                return Err(CompileError::unsupported(format!(
                    "enum {identity} mixes value {value} into a {base:?} enum"
                )));
            }
            if seen.insert(value.clone()) {
                unique.push(value);
                continue;
            }
            match self.enum_duplicates {
                EnumDuplicates::Reject => {
                    return Err(CompileError::DuplicateEnumValue {
                        identity: identity.clone(),
                        value: value.to_string(),
                    });
                }
                EnumDuplicates::Deduplicate => {
                    debug!(identity = %identity, value = %value, "dropped duplicate enum value");
                }
            }
        }

        let mut schema = match base {
            EnumBase::String => Schema::string(),
            EnumBase::Integer => Schema::integer(),
        };
        schema.r#enum = Some(unique.iter().map(EnumValue::to_json).collect());
        self.describe_type(identity, &mut schema)?;
        self.hooks.apply(identity, &mut schema);

        self.bind(&name, key, shape, EntryState::InProgress, false)?;
        self.finish(&name, schema);
        Ok(SchemaRef::component(&name))
    }

    fn compile_alias(
        &mut self,
        shape: &TypeDescriptor,
        identity: &Identity,
        resolved: &Schema,
    ) -> Result<SchemaRef> {
        let (key, name) = self.key_and_name(identity, shape);
        if self.bindings.contains_key(&key) {
            self.check_definition(&name, identity, shape)?;
            return self.reuse(&name, Usage::Referenced);
        }

        let mut schema = resolved.clone();
        let referenceable = schema.is_referenceable();
        self.hooks.apply(identity, &mut schema);
        if !referenceable {
            return Ok(SchemaRef::inline(schema));
        }
        self.bind(&name, key, shape, EntryState::InProgress, false)?;
        self.finish(&name, schema);
        Ok(SchemaRef::component(&name))
    }

    /// Resolve a `Named` reference. An unbound name is recorded and checked
    /// when the outermost pass ends.
    fn compile_named(&mut self, identity: &Identity, usage: Usage) -> Result<SchemaRef> {
        let Some(name) = self.namer.name(identity) else {
            return Err(CompileError::unsupported(format!(
                "named reference without a name at {}",
                self.context()
            )));
        };
        if self.bindings.contains_key(&ShapeKey::Named(identity.clone())) {
            return self.reuse(&name, usage);
        }
        if usage == Usage::Embedded {
            return Err(CompileError::unsupported(format!(
                "{identity} is embedded before it is defined"
            )));
        }
        if !self.forward.contains_key(&name) {
            self.forward.insert(name.clone(), identity.clone());
            self.journal.push(Change::Forward(name.clone()));
        }
        trace!(schema = %name, "forward reference");
        Ok(SchemaRef::component(&name))
    }
}

/// Mark a compiled shape as possibly absent.
///
/// References cannot carry `nullable`, so they are wrapped in an inline
/// `allOf` that does; the referenced schema is left untouched.
fn nullable(compiled: SchemaRef) -> SchemaRef {
    match compiled {
        SchemaRef::Inline(mut schema) => {
            schema.nullable = Some(true);
            SchemaRef::Inline(schema)
        }
        reference @ SchemaRef::Ref(_) => SchemaRef::inline(Schema {
            nullable: Some(true),
            all_of: Some(vec![reference]),
            ..Schema::default()
        }),
    }
}

/// Attach field documentation, wrapping plain references in `allOf`.
fn describe_property(compiled: SchemaRef, text: String) -> SchemaRef {
    let deprecated = is_deprecated(&text).then_some(true);
    match compiled {
        SchemaRef::Inline(mut schema) => {
            schema.description = Some(text);
            if deprecated.is_some() {
                schema.deprecated = deprecated;
            }
            SchemaRef::Inline(schema)
        }
        reference @ SchemaRef::Ref(_) => SchemaRef::inline(Schema {
            description: Some(text),
            deprecated,
            all_of: Some(vec![reference]),
            ..Schema::default()
        }),
    }
}

/// Insert or overwrite a property, keeping `required` in declaration order.
fn insert_property(schema: &mut Schema, name: &str, property: SchemaRef, required: bool) {
    schema
        .properties
        .get_or_insert_with(BTreeMap::new)
        .insert(name.to_string(), property);
    let names = schema.required.get_or_insert_with(Vec::new);
    names.retain(|existing| existing != name);
    if required {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataError, StaticMetadata};
    use rstest::rstest;
    use schemata_core::SchemaType;

    fn user() -> TypeDescriptor {
        TypeDescriptor::record(
            Identity::new("models", "User"),
            vec![
                Field::new("id", TypeDescriptor::integer()),
                Field::new("name", TypeDescriptor::string()),
            ],
        )
    }

    fn property<'a>(schema: &'a Schema, name: &str) -> &'a SchemaRef {
        &schema.properties.as_ref().unwrap()[name]
    }

    struct FailingMetadata;

    impl MetadataProvider for FailingMetadata {
        fn type_description(&self, identity: &Identity) -> std::result::Result<Option<String>, MetadataError> {
            Err(MetadataError::new(identity.namespace.clone(), "package not found"))
        }

        fn field_description(
            &self,
            identity: &Identity,
            _field: &str,
        ) -> std::result::Result<Option<String>, MetadataError> {
            Err(MetadataError::new(identity.namespace.clone(), "package not found"))
        }

        fn enum_values(&self, identity: &Identity) -> std::result::Result<Vec<EnumValue>, MetadataError> {
            Err(MetadataError::new(identity.namespace.clone(), "package not found"))
        }
    }

    #[rstest]
    #[case(TypeDescriptor::string(), SchemaType::String)]
    #[case(TypeDescriptor::integer(), SchemaType::Integer)]
    #[case(TypeDescriptor::float(), SchemaType::Number)]
    #[case(TypeDescriptor::boolean(), SchemaType::Boolean)]
    fn primitives_inline_without_registering(#[case] shape: TypeDescriptor, #[case] expected: SchemaType) {
        let mut registry = SchemaRegistry::default();
        let compiled = registry.compile(&shape).unwrap();
        assert_eq!(compiled.as_inline().unwrap().schema_type, Some(expected));
        assert!(registry.is_empty());
    }

    #[test]
    fn records_are_memoized_by_identity() {
        let mut registry = SchemaRegistry::default();
        let first = registry.compile(&user()).unwrap();
        let second = registry.compile(&user()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.component_name(), Some("models_User"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn required_follows_declaration_order() {
        let shape = TypeDescriptor::record(
            Identity::new("", "Order"),
            vec![
                Field::new("zeta", TypeDescriptor::string()),
                Field::new("alpha", TypeDescriptor::optional(TypeDescriptor::string())),
                Field::new("mid", TypeDescriptor::integer()).omit_empty(),
                Field::new("beta", TypeDescriptor::boolean()),
            ],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&shape).unwrap();

        let schema = registry.get("Order").unwrap();
        assert_eq!(
            schema.required.as_deref(),
            Some(&["zeta".to_string(), "beta".to_string()][..])
        );
        assert_eq!(schema.properties.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn record_without_required_fields_omits_the_list() {
        let shape = TypeDescriptor::record(
            Identity::new("", "Filter"),
            vec![Field::new("q", TypeDescriptor::string()).omit_empty()],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&shape).unwrap();
        assert_eq!(registry.get("Filter").unwrap().required, None);
    }

    #[test]
    fn optional_reference_is_wrapped_not_marked() {
        let owner = TypeDescriptor::record(
            Identity::new("", "Team"),
            vec![Field::new("lead", TypeDescriptor::optional(user()))],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&owner).unwrap();

        let team = registry.get("Team").unwrap();
        let lead = property(team, "lead").as_inline().unwrap();
        assert_eq!(lead.nullable, Some(true));
        assert_eq!(
            lead.all_of.as_ref().unwrap()[0].component_name(),
            Some("models_User")
        );
        assert_eq!(registry.get("models_User").unwrap().nullable, None);
        assert_eq!(team.required, None);
    }

    #[test]
    fn sequences_and_maps_are_inline_and_nullable() {
        let owner = TypeDescriptor::record(
            Identity::new("", "Bag"),
            vec![
                Field::new("users", TypeDescriptor::sequence(user())),
                Field::new("counts", TypeDescriptor::string_map(TypeDescriptor::integer())),
            ],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&owner).unwrap();

        let bag = registry.get("Bag").unwrap();
        let users = property(bag, "users").as_inline().unwrap();
        assert_eq!(users.schema_type, Some(SchemaType::Array));
        assert_eq!(users.nullable, Some(true));
        assert_eq!(
            users.items.as_ref().unwrap().component_name(),
            Some("models_User")
        );
        let counts = property(bag, "counts").as_inline().unwrap();
        assert_eq!(counts.nullable, Some(true));
        assert!(counts.additional_properties.is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn enums_are_always_referenced() {
        let colour = TypeDescriptor::enumeration(
            Identity::new("", "Colour"),
            EnumBase::String,
            vec!["red".into(), "green".into()],
        );
        let mut registry = SchemaRegistry::default();
        let compiled = registry.compile(&colour).unwrap();

        assert_eq!(compiled.component_name(), Some("Colour"));
        let schema = registry.get("Colour").unwrap();
        assert_eq!(schema.schema_type, Some(SchemaType::String));
        assert_eq!(
            schema.r#enum,
            Some(vec![serde_json::json!("red"), serde_json::json!("green")])
        );
    }

    #[test]
    fn enum_values_come_from_metadata_when_not_declared() {
        let level = Identity::new("models", "Level");
        let mut registry = SchemaRegistry::default().with_metadata(
            StaticMetadata::new().with_enum_values(&level, vec![EnumValue::Integer(1), EnumValue::Integer(2)]),
        );
        registry
            .compile(&TypeDescriptor::enumeration(level, EnumBase::Integer, vec![]))
            .unwrap();

        assert_eq!(
            registry.get("models_Level").unwrap().r#enum,
            Some(vec![serde_json::json!(1), serde_json::json!(2)])
        );
    }

    #[test]
    fn enum_with_no_values_anywhere_is_unsupported() {
        let mut registry = SchemaRegistry::default();
        let err = registry
            .compile(&TypeDescriptor::enumeration(
                Identity::new("", "Empty"),
                EnumBase::String,
                vec![],
            ))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedShape(_)));
    }

    #[test]
    fn enum_values_must_match_base() {
        let mut registry = SchemaRegistry::default();
        let err = registry
            .compile(&TypeDescriptor::enumeration(
                Identity::new("", "Mixed"),
                EnumBase::Integer,
                vec![EnumValue::Integer(1), "two".into()],
            ))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedShape(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn primitive_aliases_inline_and_object_aliases_register() {
        let mut registry = SchemaRegistry::default();
        let timestamp = registry.compile(&TypeDescriptor::timestamp()).unwrap();
        assert_eq!(
            timestamp.as_inline().unwrap().format.as_deref(),
            Some("date-time")
        );
        assert!(registry.is_empty());

        let money = TypeDescriptor::alias(Identity::new("", "Money"), Schema::object());
        let compiled = registry.compile(&money).unwrap();
        assert_eq!(compiled.component_name(), Some("Money"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn anonymous_records_share_one_name_per_shape() {
        let anonymous = TypeDescriptor::record(
            Identity::anonymous(),
            vec![Field::new("ok", TypeDescriptor::boolean())],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&user()).unwrap();
        let first = registry.compile(&anonymous).unwrap();
        let second = registry.compile(&anonymous).unwrap();

        assert_eq!(first.component_name(), Some("AnonymousType1"));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn anonymous_numbering_counts_hidden_schemas() {
        let owner = TypeDescriptor::record(
            Identity::new("", "Owner"),
            vec![Field::embed(TypeDescriptor::record(
                Identity::new("", "Base"),
                vec![Field::new("id", TypeDescriptor::integer())],
            ))],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&owner).unwrap();
        assert_eq!(registry.len(), 1);

        let anonymous = registry
            .compile(&TypeDescriptor::record(
                Identity::anonymous(),
                vec![Field::new("ok", TypeDescriptor::boolean())],
            ))
            .unwrap();
        assert_eq!(anonymous.component_name(), Some("AnonymousType2"));
    }

    #[test]
    fn colliding_names_fail_fast() {
        let mut registry = SchemaRegistry::default();
        registry
            .compile(&TypeDescriptor::record(Identity::new("a/b", "User"), vec![]))
            .unwrap();
        let err = registry
            .compile(&TypeDescriptor::record(Identity::new("a.b", "User"), vec![]))
            .unwrap_err();

        match err {
            CompileError::NameCollision { name, existing, incoming } => {
                assert_eq!(name, "a_b_User");
                assert_eq!(existing, "a/b.User");
                assert_eq!(incoming, "a.b.User");
            }
            other => panic!("expected a name collision, got {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn metadata_failures_propagate_and_roll_back() {
        let mut registry = SchemaRegistry::default().with_metadata(FailingMetadata);
        let err = registry.compile(&user()).unwrap_err();
        assert!(matches!(err, CompileError::MetadataLookupFailed(_)));
        assert!(registry.is_empty());
        assert!(registry.entries.is_empty());
        assert!(registry.bindings.is_empty());
    }

    #[test]
    fn descriptions_and_deprecation_come_from_metadata() {
        let identity = Identity::new("models", "User");
        let mut registry = SchemaRegistry::default().with_metadata(
            StaticMetadata::new()
                .with_type_description(&identity, "A user of the system.")
                .with_field_description(&identity, "name", "Display name.\nDeprecated: use id")
                .with_field_description(&identity, "id", "Identifier."),
        );
        registry.compile(&user()).unwrap();

        let schema = registry.get("models_User").unwrap();
        assert_eq!(schema.description.as_deref(), Some("A user of the system."));
        assert_eq!(schema.deprecated, None);
        let name = property(schema, "name").as_inline().unwrap();
        assert_eq!(name.deprecated, Some(true));
        let id = property(schema, "id").as_inline().unwrap();
        assert_eq!(id.description.as_deref(), Some("Identifier."));
        assert_eq!(id.deprecated, None);
    }

    #[test]
    fn field_description_on_reference_is_wrapped() {
        let team = Identity::new("", "Team");
        let mut registry = SchemaRegistry::default().with_metadata(
            StaticMetadata::new().with_field_description(&team, "owner", "Who owns the team."),
        );
        registry
            .compile(&TypeDescriptor::record(team, vec![Field::new("owner", user())]))
            .unwrap();

        let owner = property(registry.get("Team").unwrap(), "owner").as_inline().unwrap();
        assert_eq!(owner.description.as_deref(), Some("Who owns the team."));
        assert_eq!(
            owner.all_of.as_ref().unwrap()[0].component_name(),
            Some("models_User")
        );
    }

    #[test]
    fn forward_references_resolve_within_one_pass() {
        let parent = Identity::new("", "Parent");
        let child = TypeDescriptor::record(
            Identity::new("", "Child"),
            vec![Field::new("parent", TypeDescriptor::named(parent.clone()))],
        );
        let mut registry = SchemaRegistry::default();
        registry
            .atomically(|registry| {
                registry.compile(&child)?;
                assert!(registry.forward.contains_key("Parent"));
                registry.compile(&TypeDescriptor::record(
                    parent,
                    vec![Field::new("children", TypeDescriptor::sequence(child.clone()))],
                ))
            })
            .unwrap();

        assert!(registry.forward.is_empty());
        assert_eq!(registry.len(), 2);
        assert_eq!(
            property(registry.get("Child").unwrap(), "parent").component_name(),
            Some("Parent")
        );
    }

    #[test]
    fn dangling_forward_reference_rolls_back() {
        let orphan = TypeDescriptor::record(
            Identity::new("", "Orphan"),
            vec![Field::new("parent", TypeDescriptor::named(Identity::new("", "Missing")))],
        );
        let mut registry = SchemaRegistry::default();
        let err = registry.compile(&orphan).unwrap_err();

        assert_eq!(err.to_string(), "Missing is referenced but never defined");
        assert!(registry.entries.is_empty());
        assert!(registry.forward.is_empty());
    }

    #[test]
    fn forward_reference_to_embedded_record_makes_it_visible() {
        let base = TypeDescriptor::record(
            Identity::new("", "Base"),
            vec![Field::new("id", TypeDescriptor::integer())],
        );
        let audit = TypeDescriptor::record(
            Identity::new("", "Audit"),
            vec![Field::new("subject", TypeDescriptor::named(Identity::new("", "Base")))],
        );
        let owner = TypeDescriptor::record(
            Identity::new("", "Owner"),
            vec![Field::new("audit", audit), Field::embed(base)],
        );
        let mut registry = SchemaRegistry::default();
        registry.compile(&owner).unwrap();

        assert!(registry.contains("Base"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn conflicting_enum_definitions_are_rejected() {
        let identity = Identity::new("", "Colour");
        let mut registry = SchemaRegistry::default();
        registry
            .compile(&TypeDescriptor::enumeration(
                identity.clone(),
                EnumBase::String,
                vec!["red".into()],
            ))
            .unwrap();
        let err = registry
            .compile(&TypeDescriptor::enumeration(
                identity,
                EnumBase::String,
                vec!["blue".into()],
            ))
            .unwrap_err();

        assert!(matches!(err, CompileError::ConflictingDefinition { .. }));
        assert_eq!(
            registry.get("Colour").unwrap().r#enum,
            Some(vec![serde_json::json!("red")])
        );
    }

    #[test]
    fn unsupported_shapes_name_their_position() {
        let shape = TypeDescriptor::record(
            Identity::new("", "Handler"),
            vec![Field::new("callback", TypeDescriptor::Unsupported("function".to_string()))],
        );
        let mut registry = SchemaRegistry::default();
        let err = registry.compile(&shape).unwrap_err();
        assert_eq!(err.to_string(), "unsupported shape: function at callback");
        assert!(registry.is_empty());
    }
}
