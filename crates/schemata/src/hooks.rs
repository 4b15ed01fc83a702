//! Post-creation customization of named schemas

use std::collections::HashMap;
use std::fmt;

use schemata_core::Schema;

use crate::descriptor::Identity;

type SchemaHook = Box<dyn Fn(&mut Schema)>;
type GlobalHook = Box<dyn Fn(&Identity, &mut Schema)>;

/// Mutators applied once to a freshly compiled schema.
///
/// Hooks see only the schema, never the registry, so they cannot trigger
/// compilation. Per-identity hooks run first, then global hooks, each group
/// in registration order.
#[derive(Default)]
pub struct CustomizationHooks {
    by_identity: HashMap<Identity, Vec<SchemaHook>>,
    global: Vec<GlobalHook>,
}

impl CustomizationHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: Identity, hook: impl Fn(&mut Schema) + 'static) {
        self.by_identity
            .entry(identity)
            .or_default()
            .push(Box::new(hook));
    }

    pub fn register_global(&mut self, hook: impl Fn(&Identity, &mut Schema) + 'static) {
        self.global.push(Box::new(hook));
    }

    pub fn apply(&self, identity: &Identity, schema: &mut Schema) {
        if let Some(hooks) = self.by_identity.get(identity) {
            for hook in hooks {
                hook(schema);
            }
        }
        for hook in &self.global {
            hook(identity, schema);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty() && self.global.is_empty()
    }
}

impl fmt::Debug for CustomizationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizationHooks")
            .field("identities", &self.by_identity.len())
            .field("global", &self.global.len())
            .finish()
    }
}
