//! Component registry contract.
//!
//! # Responsibility
//! - Define the registry operations the bootstrap engine consumes.
//! - Keep capability queries separate from instance construction.
//!
//! # Invariants
//! - `names_with_capability` and `type_matches` never build a component.
//! - Name listings are snapshots; callers may mutate the registry while
//!   iterating them.
//! - `get_or_create` may re-enter the registry and reports cycles as errors.

use crate::error::BootstrapResult;
use crate::extension::component::Component;
use crate::extension::ordering::ComponentComparator;
use crate::model::capability::Capability;
use crate::model::definition::{Definition, MergedDefinition};
use std::rc::Rc;

mod component_registry;

pub use component_registry::DefaultComponentRegistry;

/// Mutable store of definitions, singletons, and installed observers.
pub trait ComponentRegistry {
    /// Registers or overrides one definition.
    fn register_definition(&mut self, name: &str, definition: Definition) -> BootstrapResult<()>;
    /// Removes one definition together with its singleton.
    fn remove_definition(&mut self, name: &str) -> BootstrapResult<Definition>;
    fn definition(&self, name: &str) -> Option<&Definition>;
    /// Edits a definition in place. Derived views stay cached until
    /// [`ComponentRegistry::clear_derived_metadata_cache`].
    fn definition_mut(&mut self, name: &str) -> Option<&mut Definition>;
    fn contains_definition(&self, name: &str) -> bool;
    /// Definition names in discovery order.
    fn definition_names(&self) -> Vec<String>;
    /// Returns the (cached) parent-folded view of one definition.
    fn merged_definition(&self, name: &str) -> BootstrapResult<MergedDefinition>;

    /// Registers an already-built component without a definition.
    fn register_singleton(&mut self, name: &str, instance: Rc<dyn Component>)
        -> BootstrapResult<()>;
    /// Returns a built singleton without triggering construction.
    fn singleton(&self, name: &str) -> Option<Rc<dyn Component>>;

    /// Names whose type exposes `capability`, in discovery order.
    /// Definitions whose parent chain does not resolve are left out.
    fn names_with_capability(&self, capability: Capability) -> BootstrapResult<Vec<String>>;
    /// Non-instantiating capability check. Unknown names and unresolvable
    /// parent chains never match.
    fn type_matches(&self, name: &str, capability: Capability) -> BootstrapResult<bool>;
    /// Returns the singleton for `name`, building it on first request.
    fn get_or_create(&mut self, name: &str) -> BootstrapResult<Rc<dyn Component>>;
    fn clear_derived_metadata_cache(&mut self);

    fn installed_observer_count(&self) -> usize;
    /// Appends an observer; an identical installed instance moves to the end.
    fn append_observer(&mut self, observer: Rc<dyn Component>);
    fn installed_observers(&self) -> Vec<Rc<dyn Component>>;

    /// Comparator overriding the default priority order, if any.
    fn dependency_comparator(&self) -> Option<ComponentComparator>;

    /// Builds every non-lazy, non-abstract definition over a name snapshot.
    ///
    /// Returns the names that were built (or already existed) in order.
    fn pre_instantiate_singletons(&mut self) -> BootstrapResult<Vec<String>> {
        let mut built = Vec::new();
        for name in self.definition_names() {
            if !self.contains_definition(&name) {
                continue;
            }
            let merged = self.merged_definition(&name)?;
            if merged.lazy_init || merged.factory.is_none() {
                continue;
            }
            self.get_or_create(&name)?;
            built.push(name);
        }
        Ok(built)
    }
}
