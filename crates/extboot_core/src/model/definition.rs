//! Component definition model.
//!
//! # Responsibility
//! - Describe one registrable component: type metadata, role, factory.
//! - Provide the merged (parent-folded) view the registry caches.
//!
//! # Invariants
//! - Declared capabilities are type-level metadata and are readable without
//!   instantiating the component.
//! - A merged view is derived data; it may go stale after a definition is
//!   edited in place until the registry cache is cleared.

use crate::error::BootstrapResult;
use crate::extension::component::Component;
use crate::model::capability::{Capability, CapabilitySet};
use crate::registry::ComponentRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Role hint carried by every definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Application-level component.
    #[default]
    Ordinary,
    /// Container plumbing; excluded from early-construction diagnostics.
    Infrastructure,
}

/// Builds one component instance. May re-enter the registry.
#[derive(Clone)]
pub struct ComponentFactory(
    Rc<dyn Fn(&mut dyn ComponentRegistry) -> BootstrapResult<Rc<dyn Component>>>,
);

impl ComponentFactory {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&mut dyn ComponentRegistry) -> BootstrapResult<Rc<dyn Component>> + 'static,
    {
        Self(Rc::new(factory))
    }

    pub fn create(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<Rc<dyn Component>> {
        (self.0)(registry)
    }
}

impl Debug for ComponentFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ComponentFactory(..)")
    }
}

/// Registered description of one component.
#[derive(Debug, Clone)]
pub struct Definition {
    /// Implementing type name, used in diagnostics.
    pub type_name: String,
    /// Capabilities the implementing type exposes.
    pub capabilities: CapabilitySet,
    pub role: Role,
    /// Skipped by eager singleton pre-instantiation when set.
    pub lazy_init: bool,
    /// Optional parent definition whose values this one inherits.
    pub parent: Option<String>,
    /// Free-form property values; factory mutators may rewrite them.
    pub attributes: BTreeMap<String, String>,
    /// `None` for abstract templates that only act as parents.
    pub factory: Option<ComponentFactory>,
}

impl Definition {
    pub fn new<F>(type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut dyn ComponentRegistry) -> BootstrapResult<Rc<dyn Component>> + 'static,
    {
        Self {
            type_name: type_name.into(),
            capabilities: CapabilitySet::empty(),
            role: Role::Ordinary,
            lazy_init: false,
            parent: None,
            attributes: BTreeMap::new(),
            factory: Some(ComponentFactory::new(factory)),
        }
    }

    /// Factory-less template used only as a parent.
    pub fn template(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            capabilities: CapabilitySet::empty(),
            role: Role::Ordinary,
            lazy_init: false,
            parent: None,
            attributes: BTreeMap::new(),
            factory: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl Into<CapabilitySet>) -> Self {
        self.capabilities = capabilities.into();
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    pub fn is_infrastructure(&self) -> bool {
        self.role == Role::Infrastructure
    }
}

/// Definition with its parent chain folded in (child values win).
#[derive(Debug, Clone)]
pub struct MergedDefinition {
    pub name: String,
    pub type_name: String,
    pub capabilities: CapabilitySet,
    pub role: Role,
    pub lazy_init: bool,
    pub attributes: BTreeMap<String, String>,
    pub factory: Option<ComponentFactory>,
}

impl MergedDefinition {
    /// Folds `chain` (child first, root parent last) into one view.
    pub(crate) fn fold(name: &str, chain: &[&Definition]) -> Self {
        let mut merged = Self {
            name: name.to_string(),
            type_name: String::new(),
            capabilities: CapabilitySet::empty(),
            role: Role::Ordinary,
            lazy_init: false,
            attributes: BTreeMap::new(),
            factory: None,
        };
        for definition in chain.iter().rev() {
            merged.type_name = definition.type_name.clone();
            if !definition.capabilities.is_empty() {
                merged.capabilities = definition.capabilities.clone();
            }
            merged.role = definition.role;
            merged.lazy_init = definition.lazy_init;
            merged
                .attributes
                .extend(definition.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
            if definition.factory.is_some() {
                merged.factory = definition.factory.clone();
            }
        }
        merged
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
