//! Component and extension role contracts.
//!
//! A component exposes extension roles through the `as_*` accessors; the
//! engine never downcasts. [`matched_roles`] turns those accessors into one
//! capability set after construction.

use crate::error::BootstrapResult;
use crate::model::capability::{Capability, CapabilitySet, Priority};
use crate::model::definition::MergedDefinition;
use crate::registry::ComponentRegistry;
use std::rc::Rc;

/// Any object managed by the component registry.
pub trait Component {
    /// Implementing type name, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Tier and order value. Defaults to unordered.
    fn priority(&self) -> Priority {
        Priority::unordered()
    }

    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        None
    }

    fn as_factory_mutator(&self) -> Option<&dyn FactoryMutator> {
        None
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        None
    }

    fn as_merged_definition_observer(&self) -> Option<&dyn MergedDefinitionObserver> {
        None
    }

    fn as_listener(&self) -> Option<&dyn ContainerListener> {
        None
    }
}

/// Adds or alters definitions before the definition set is finalized.
///
/// Every registry mutator is also a factory mutator; its factory step runs
/// after all registry steps have finished.
pub trait RegistryMutator: FactoryMutator {
    fn mutate_registry(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()>;
}

/// Alters the finalized definition set, e.g. resolving attribute values.
pub trait FactoryMutator {
    fn mutate_factory(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()>;
}

/// Runs around every component construction.
///
/// Both steps may return a replacement (e.g. a wrapping proxy).
pub trait InstanceObserver {
    fn before_init(
        &self,
        instance: Rc<dyn Component>,
        _name: &str,
        _registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        Ok(instance)
    }

    fn after_init(
        &self,
        instance: Rc<dyn Component>,
        _name: &str,
        _registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        Ok(instance)
    }
}

/// Instance observer that also pre-processes merged definition metadata
/// before the factory runs.
pub trait MergedDefinitionObserver: InstanceObserver {
    fn process_merged_definition(
        &self,
        definition: &mut MergedDefinition,
        name: &str,
    ) -> BootstrapResult<()>;
}

/// Lifecycle events published by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEvent {
    Refreshed,
}

/// Receives container lifecycle events.
pub trait ContainerListener {
    fn on_event(&self, event: ContainerEvent);
}

/// Post-construction capability check over a live instance.
pub fn matched_roles(instance: &dyn Component) -> CapabilitySet {
    let mut roles = CapabilitySet::empty();
    if instance.as_registry_mutator().is_some() {
        roles.insert(Capability::RegistryMutator);
    }
    if instance.as_factory_mutator().is_some() {
        roles.insert(Capability::FactoryMutator);
    }
    if instance.as_merged_definition_observer().is_some() {
        roles.insert(Capability::MergedDefinitionObserver);
    }
    if instance.as_instance_observer().is_some() {
        roles.insert(Capability::InstanceObserver);
    }
    if instance.as_listener().is_some() {
        roles.insert(Capability::Listener);
    }
    if let Some(marker) = instance.priority().tier.marker() {
        roles.insert(marker);
    }
    roles
}
