//! In-memory component registry.
//!
//! # Responsibility
//! - Store definitions in discovery order and cache built singletons.
//! - Run installed observers around every construction.
//!
//! # Invariants
//! - Structural changes (register/remove) evict the whole derived cache;
//!   in-place edits through `definition_mut` do not.
//! - The creation stack only ever holds names currently being built.

use crate::error::{BootstrapError, BootstrapResult, FailedStep};
use crate::extension::component::{matched_roles, Component};
use crate::extension::ordering::ComponentComparator;
use crate::model::capability::Capability;
use crate::model::definition::{Definition, MergedDefinition};
use crate::registry::ComponentRegistry;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

static COMPONENT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.#$-]*$").expect("valid component name regex")
});

/// Default single-threaded registry implementation.
#[derive(Default)]
pub struct DefaultComponentRegistry {
    definitions: HashMap<String, Definition>,
    definition_order: Vec<String>,
    singletons: HashMap<String, Rc<dyn Component>>,
    manual_singletons: Vec<String>,
    merged_cache: RefCell<HashMap<String, MergedDefinition>>,
    creation_stack: Vec<String>,
    observers: Vec<Rc<dyn Component>>,
    comparator: Option<ComponentComparator>,
}

impl DefaultComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the comparator used when sorting extensions.
    pub fn set_dependency_comparator(&mut self, comparator: ComponentComparator) {
        self.comparator = Some(comparator);
    }

    /// Number of cached derived views; mainly for diagnostics.
    pub fn cached_metadata_count(&self) -> usize {
        self.merged_cache.borrow().len()
    }

    fn create_component(&mut self, name: &str) -> BootstrapResult<Rc<dyn Component>> {
        let mut merged = self.merged_definition(name)?;
        let observers = self.observers.clone();

        for observer in &observers {
            if let Some(processor) = observer.as_merged_definition_observer() {
                processor
                    .process_merged_definition(&mut merged, name)
                    .map_err(|err| {
                        err.in_step(observer.type_name(), FailedStep::ProcessMergedDefinition)
                    })?;
            }
        }

        let factory = merged
            .factory
            .clone()
            .ok_or_else(|| BootstrapError::AbstractDefinition(name.to_string()))?;
        let mut instance = factory
            .create(self)
            .map_err(|err| err.in_step(name, FailedStep::Instantiate))?;

        for observer in &observers {
            if let Some(hook) = observer.as_instance_observer() {
                instance = hook
                    .before_init(instance, name, &*self)
                    .map_err(|err| err.in_step(observer.type_name(), FailedStep::BeforeInit))?;
            }
        }
        for observer in &observers {
            if let Some(hook) = observer.as_instance_observer() {
                instance = hook
                    .after_init(instance, name, &*self)
                    .map_err(|err| err.in_step(observer.type_name(), FailedStep::AfterInit))?;
            }
        }

        Ok(instance)
    }

    /// Merged view used for classification. A definition whose parent chain
    /// cannot be resolved yet yields `None`; building it still fails.
    fn resolvable_definition(&self, name: &str) -> Option<MergedDefinition> {
        match self.merged_definition(name) {
            Ok(merged) => Some(merged),
            Err(err) => {
                debug!(
                    "event=definition_unresolved module=registry status=skip name={} detail={:?}",
                    name,
                    err.to_string()
                );
                None
            }
        }
    }

    fn validate_name(name: &str) -> BootstrapResult<()> {
        if COMPONENT_NAME_RE.is_match(name) {
            Ok(())
        } else {
            Err(BootstrapError::InvalidComponentName(name.to_string()))
        }
    }
}

impl ComponentRegistry for DefaultComponentRegistry {
    fn register_definition(&mut self, name: &str, definition: Definition) -> BootstrapResult<()> {
        Self::validate_name(name)?;
        if self.definitions.contains_key(name) {
            debug!("event=definition_override module=registry name={name}");
            self.singletons.remove(name);
        } else {
            self.definition_order.push(name.to_string());
        }
        if self.manual_singletons.iter().any(|existing| existing == name) {
            debug!("event=singleton_replaced module=registry name={name}");
            self.manual_singletons.retain(|existing| existing != name);
            self.singletons.remove(name);
        }
        self.definitions.insert(name.to_string(), definition);
        self.merged_cache.get_mut().clear();
        Ok(())
    }

    fn remove_definition(&mut self, name: &str) -> BootstrapResult<Definition> {
        let removed = self
            .definitions
            .remove(name)
            .ok_or_else(|| BootstrapError::NoSuchDefinition(name.to_string()))?;
        self.definition_order.retain(|existing| existing != name);
        self.singletons.remove(name);
        self.merged_cache.get_mut().clear();
        debug!("event=definition_remove module=registry name={name}");
        Ok(removed)
    }

    fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    fn definition_mut(&mut self, name: &str) -> Option<&mut Definition> {
        self.definitions.get_mut(name)
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn definition_names(&self) -> Vec<String> {
        self.definition_order.clone()
    }

    fn merged_definition(&self, name: &str) -> BootstrapResult<MergedDefinition> {
        let cached = self.merged_cache.borrow().get(name).cloned();
        if let Some(merged) = cached {
            return Ok(merged);
        }

        let mut chain: Vec<&Definition> = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = name;
        loop {
            if visited.iter().any(|seen| seen == current) {
                visited.push(current.to_string());
                return Err(BootstrapError::ParentCycle {
                    name: name.to_string(),
                    chain: visited,
                });
            }
            let definition = self
                .definitions
                .get(current)
                .ok_or_else(|| BootstrapError::NoSuchDefinition(current.to_string()))?;
            visited.push(current.to_string());
            chain.push(definition);
            match definition.parent.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let merged = MergedDefinition::fold(name, &chain);
        self.merged_cache
            .borrow_mut()
            .insert(name.to_string(), merged.clone());
        Ok(merged)
    }

    fn register_singleton(
        &mut self,
        name: &str,
        instance: Rc<dyn Component>,
    ) -> BootstrapResult<()> {
        Self::validate_name(name)?;
        if !self.definitions.contains_key(name)
            && !self.manual_singletons.iter().any(|existing| existing == name)
        {
            self.manual_singletons.push(name.to_string());
        }
        self.singletons.insert(name.to_string(), instance);
        Ok(())
    }

    fn singleton(&self, name: &str) -> Option<Rc<dyn Component>> {
        self.singletons.get(name).cloned()
    }

    fn names_with_capability(&self, capability: Capability) -> BootstrapResult<Vec<String>> {
        let mut names = Vec::new();
        for name in &self.definition_order {
            if !self.singletons.contains_key(name) {
                match self.resolvable_definition(name) {
                    Some(merged) if merged.factory.is_some() => {}
                    _ => continue,
                }
            }
            if self.type_matches(name, capability)? {
                names.push(name.clone());
            }
        }
        for name in &self.manual_singletons {
            if self.type_matches(name, capability)? {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    fn type_matches(&self, name: &str, capability: Capability) -> BootstrapResult<bool> {
        if let Some(instance) = self.singletons.get(name) {
            return Ok(matched_roles(instance.as_ref()).contains(capability));
        }
        if !self.definitions.contains_key(name) {
            return Ok(false);
        }
        Ok(self
            .resolvable_definition(name)
            .is_some_and(|merged| merged.capabilities.contains(capability)))
    }

    fn get_or_create(&mut self, name: &str) -> BootstrapResult<Rc<dyn Component>> {
        if let Some(instance) = self.singletons.get(name) {
            return Ok(instance.clone());
        }
        if self.creation_stack.iter().any(|building| building == name) {
            return Err(BootstrapError::CircularReference {
                name: name.to_string(),
                chain: self.creation_stack.clone(),
            });
        }

        self.creation_stack.push(name.to_string());
        let created = self.create_component(name);
        self.creation_stack.pop();

        let instance = created?;
        debug!(
            "event=component_create module=registry status=ok name={} type={}",
            name,
            instance.type_name()
        );
        self.singletons.insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    fn clear_derived_metadata_cache(&mut self) {
        self.merged_cache.get_mut().clear();
    }

    fn installed_observer_count(&self) -> usize {
        self.observers.len()
    }

    fn append_observer(&mut self, observer: Rc<dyn Component>) {
        self.observers
            .retain(|installed| !Rc::ptr_eq(installed, &observer));
        self.observers.push(observer);
    }

    fn installed_observers(&self) -> Vec<Rc<dyn Component>> {
        self.observers.clone()
    }

    fn dependency_comparator(&self) -> Option<ComponentComparator> {
        self.comparator.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultComponentRegistry;
    use crate::error::BootstrapError;
    use crate::extension::component::{Component, InstanceObserver};
    use crate::model::capability::Capability;
    use crate::model::definition::Definition;
    use crate::registry::ComponentRegistry;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Named(&'static str);

    impl Component for Named {
        fn type_name(&self) -> &str {
            self.0
        }
    }

    struct Observer;

    impl Component for Observer {
        fn type_name(&self) -> &str {
            "Observer"
        }

        fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
            Some(self)
        }
    }

    impl InstanceObserver for Observer {}

    fn plain(type_name: &'static str) -> Definition {
        Definition::new(type_name, move |_| Ok(Rc::new(Named(type_name)) as Rc<dyn Component>))
    }

    #[test]
    fn rejects_invalid_component_names() {
        let mut registry = DefaultComponentRegistry::new();
        let err = registry
            .register_definition("not a name", plain("Plain"))
            .expect_err("spaces must be rejected");
        assert!(matches!(err, BootstrapError::InvalidComponentName(_)));
    }

    #[test]
    fn capability_queries_do_not_instantiate() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition(
                "observer",
                Definition::new("Observer", move |_| {
                    counter.set(counter.get() + 1);
                    Ok(Rc::new(Observer) as Rc<dyn Component>)
                })
                .with_capability(Capability::InstanceObserver),
            )
            .expect("register observer");

        let names = registry
            .names_with_capability(Capability::InstanceObserver)
            .expect("capability query");
        assert_eq!(names, vec!["observer".to_string()]);
        assert!(registry
            .type_matches("observer", Capability::InstanceObserver)
            .expect("type match"));
        assert!(!registry
            .type_matches("missing", Capability::InstanceObserver)
            .expect("unknown names do not match"));
        assert_eq!(built.get(), 0);

        registry.get_or_create("observer").expect("build observer");
        registry.get_or_create("observer").expect("cached observer");
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn detects_creation_cycles() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition(
                "a",
                Definition::new("A", |registry| registry.get_or_create("b")),
            )
            .expect("register a");
        registry
            .register_definition(
                "b",
                Definition::new("B", |registry| registry.get_or_create("a")),
            )
            .expect("register b");

        let err = match registry.get_or_create("a") {
            Ok(_) => panic!("cycle must fail"),
            Err(err) => err,
        };
        match err.root_cause() {
            BootstrapError::CircularReference { name, chain } => {
                assert_eq!(name, "a");
                assert_eq!(chain, &vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.singleton("a").is_none());
        assert!(registry.singleton("b").is_none());
    }

    #[test]
    fn merged_view_stays_stale_until_cache_cleared() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition("svc", plain("Svc").with_attribute("url", "${host}"))
            .expect("register svc");
        assert_eq!(
            registry
                .merged_definition("svc")
                .expect("merged")
                .attribute("url"),
            Some("${host}")
        );

        registry
            .definition_mut("svc")
            .expect("definition present")
            .attributes
            .insert("url".to_string(), "localhost".to_string());
        assert_eq!(
            registry
                .merged_definition("svc")
                .expect("merged")
                .attribute("url"),
            Some("${host}")
        );

        registry.clear_derived_metadata_cache();
        assert_eq!(
            registry
                .merged_definition("svc")
                .expect("merged")
                .attribute("url"),
            Some("localhost")
        );
    }

    #[test]
    fn parent_cycles_are_reported() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition("a", plain("A").with_parent("b"))
            .expect("register a");
        registry
            .register_definition("b", plain("B").with_parent("a"))
            .expect("register b");

        let err = registry
            .merged_definition("a")
            .expect_err("parent cycle must fail");
        assert!(matches!(err, BootstrapError::ParentCycle { .. }));
    }

    #[test]
    fn unresolved_parents_do_not_match_until_registered() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition(
                "child",
                plain("Child")
                    .with_parent("base")
                    .with_capability(Capability::InstanceObserver),
            )
            .expect("register child");

        assert!(registry
            .names_with_capability(Capability::InstanceObserver)
            .expect("query tolerates missing parent")
            .is_empty());
        assert!(!registry
            .type_matches("child", Capability::InstanceObserver)
            .expect("type match tolerates missing parent"));
        let err = match registry.get_or_create("child") {
            Ok(_) => panic!("missing parent must fail construction"),
            Err(err) => err,
        };
        assert!(matches!(err, BootstrapError::NoSuchDefinition(ref missing) if missing == "base"));

        registry
            .register_definition("base", Definition::template("Base"))
            .expect("register base");
        assert_eq!(
            registry
                .names_with_capability(Capability::InstanceObserver)
                .expect("capability query"),
            vec!["child".to_string()]
        );
    }

    #[test]
    fn parent_cycles_skip_queries_but_fail_construction() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition("a", plain("A").with_parent("b"))
            .expect("register a");
        registry
            .register_definition("b", plain("B").with_parent("a"))
            .expect("register b");

        assert!(!registry
            .type_matches("a", Capability::InstanceObserver)
            .expect("type match"));
        let err = match registry.get_or_create("a") {
            Ok(_) => panic!("parent cycle must fail construction"),
            Err(err) => err,
        };
        assert!(matches!(err.root_cause(), BootstrapError::ParentCycle { .. }));
    }

    #[test]
    fn definition_replaces_a_manual_singleton() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_singleton("svc", Rc::new(Named("Old")))
            .expect("register singleton");
        assert!(!registry
            .type_matches("svc", Capability::InstanceObserver)
            .expect("type match"));

        registry
            .register_definition("svc", plain("New").with_capability(Capability::InstanceObserver))
            .expect("register definition");

        assert!(registry.singleton("svc").is_none());
        assert!(registry
            .type_matches("svc", Capability::InstanceObserver)
            .expect("answers from the new definition"));
        assert_eq!(
            registry
                .names_with_capability(Capability::InstanceObserver)
                .expect("capability query"),
            vec!["svc".to_string()]
        );
        let built = registry.get_or_create("svc").expect("build svc");
        assert_eq!(built.type_name(), "New");
    }

    #[test]
    fn reappending_an_observer_moves_it_to_the_end() {
        let mut registry = DefaultComponentRegistry::new();
        let first: Rc<dyn Component> = Rc::new(Observer);
        let second: Rc<dyn Component> = Rc::new(Observer);
        registry.append_observer(first.clone());
        registry.append_observer(second.clone());
        registry.append_observer(first.clone());

        let installed = registry.installed_observers();
        assert_eq!(registry.installed_observer_count(), 2);
        assert!(Rc::ptr_eq(&installed[0], &second));
        assert!(Rc::ptr_eq(&installed[1], &first));
    }

    #[test]
    fn removal_drops_definition_and_singleton() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition("svc", plain("Svc"))
            .expect("register svc");
        registry.get_or_create("svc").expect("build svc");

        registry.remove_definition("svc").expect("remove svc");
        assert!(!registry.contains_definition("svc"));
        assert!(registry.singleton("svc").is_none());
        assert!(registry.definition_names().is_empty());

        let err = registry
            .remove_definition("svc")
            .expect_err("second removal must fail");
        assert!(matches!(err, BootstrapError::NoSuchDefinition(_)));
    }

    #[test]
    fn abstract_templates_are_not_discovered_or_built() {
        let mut registry = DefaultComponentRegistry::new();
        registry
            .register_definition(
                "base",
                Definition::template("BaseObserver").with_capability(Capability::InstanceObserver),
            )
            .expect("register template");

        assert!(registry
            .names_with_capability(Capability::InstanceObserver)
            .expect("capability query")
            .is_empty());
        let err = match registry.get_or_create("base") {
            Ok(_) => panic!("template must not build"),
            Err(err) => err,
        };
        assert!(matches!(err, BootstrapError::AbstractDefinition(_)));
    }
}
