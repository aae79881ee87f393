#![allow(dead_code)]

use extboot_core::{
    BootstrapResult, Capability, CapabilitySet, Component, ComponentRegistry, ContainerEvent,
    ContainerListener, Definition, FactoryMutator, InstanceObserver, MergedDefinition,
    MergedDefinitionObserver, Priority, RegistryMutator,
};
use extboot_core::model::definition::ComponentFactory;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, ordered record of everything recorders did.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub type Action = Rc<dyn Fn(&mut dyn ComponentRegistry) -> BootstrapResult<()>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// Journal entries starting with `prefix`, prefix stripped.
pub fn entries(journal: &Journal, prefix: &str) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter_map(|entry| entry.strip_prefix(prefix).map(str::to_string))
        .collect()
}

/// Configurable component exposing whichever roles a test asks for.
pub struct Recorder {
    label: String,
    priority: Priority,
    roles: CapabilitySet,
    journal: Journal,
    action: Option<Action>,
}

impl Component for Recorder {
    fn type_name(&self) -> &str {
        &self.label
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        self.roles
            .contains(Capability::RegistryMutator)
            .then_some(self as &dyn RegistryMutator)
    }

    fn as_factory_mutator(&self) -> Option<&dyn FactoryMutator> {
        self.roles
            .contains(Capability::FactoryMutator)
            .then_some(self as &dyn FactoryMutator)
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        self.roles
            .contains(Capability::InstanceObserver)
            .then_some(self as &dyn InstanceObserver)
    }

    fn as_merged_definition_observer(&self) -> Option<&dyn MergedDefinitionObserver> {
        self.roles
            .contains(Capability::MergedDefinitionObserver)
            .then_some(self as &dyn MergedDefinitionObserver)
    }

    fn as_listener(&self) -> Option<&dyn ContainerListener> {
        self.roles
            .contains(Capability::Listener)
            .then_some(self as &dyn ContainerListener)
    }
}

impl RegistryMutator for Recorder {
    fn mutate_registry(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()> {
        self.journal
            .borrow_mut()
            .push(format!("registry:{}", self.label));
        match &self.action {
            Some(action) => action(registry),
            None => Ok(()),
        }
    }
}

impl FactoryMutator for Recorder {
    fn mutate_factory(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()> {
        self.journal
            .borrow_mut()
            .push(format!("factory:{}", self.label));
        if self.roles.contains(Capability::RegistryMutator) {
            return Ok(());
        }
        match &self.action {
            Some(action) => action(registry),
            None => Ok(()),
        }
    }
}

impl InstanceObserver for Recorder {
    fn after_init(
        &self,
        instance: Rc<dyn Component>,
        name: &str,
        _registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        self.journal
            .borrow_mut()
            .push(format!("after:{}:{}", self.label, name));
        Ok(instance)
    }
}

impl MergedDefinitionObserver for Recorder {
    fn process_merged_definition(
        &self,
        _definition: &mut MergedDefinition,
        name: &str,
    ) -> BootstrapResult<()> {
        self.journal
            .borrow_mut()
            .push(format!("merged:{}:{}", self.label, name));
        Ok(())
    }
}

impl ContainerListener for Recorder {
    fn on_event(&self, event: ContainerEvent) {
        self.journal
            .borrow_mut()
            .push(format!("event:{}:{:?}", self.label, event));
    }
}

/// Definition whose factory builds a [`Recorder`] labelled `name`.
///
/// The declared capabilities match the recorder's live roles plus its tier
/// marker. Construction is journaled as `new:<name>`.
pub fn recorder_definition(
    name: &str,
    priority: Priority,
    roles: &[Capability],
    journal: &Journal,
    action: Option<Action>,
) -> Definition {
    let mut capabilities: CapabilitySet = roles.iter().copied().collect();
    if let Some(marker) = priority.tier.marker() {
        capabilities.insert(marker);
    }
    let label = name.to_string();
    let roles = capabilities.clone();
    let journal = journal.clone();
    Definition::new(name, move |_| {
        journal.borrow_mut().push(format!("new:{label}"));
        Ok(Rc::new(Recorder {
            label: label.clone(),
            priority,
            roles: roles.clone(),
            journal: journal.clone(),
            action: action.clone(),
        }) as Rc<dyn Component>)
    })
    .with_capabilities(capabilities)
}

pub fn register_recorder(
    registry: &mut dyn ComponentRegistry,
    name: &str,
    priority: Priority,
    roles: &[Capability],
    journal: &Journal,
) {
    registry
        .register_definition(name, recorder_definition(name, priority, roles, journal, None))
        .expect("register recorder");
}

pub fn register_recorder_with<F>(
    registry: &mut dyn ComponentRegistry,
    name: &str,
    priority: Priority,
    roles: &[Capability],
    journal: &Journal,
    action: F,
) where
    F: Fn(&mut dyn ComponentRegistry) -> BootstrapResult<()> + 'static,
{
    registry
        .register_definition(
            name,
            recorder_definition(name, priority, roles, journal, Some(Rc::new(action))),
        )
        .expect("register recorder");
}

/// Builds a recorder instance directly, outside any registry.
pub fn recorder_instance(
    name: &str,
    priority: Priority,
    roles: &[Capability],
    journal: &Journal,
) -> Rc<dyn Component> {
    Rc::new(Recorder {
        label: name.to_string(),
        priority,
        roles: roles.iter().copied().collect(),
        journal: journal.clone(),
        action: None,
    })
}

/// Plain component with no extension roles.
pub struct Plain(pub &'static str);

impl Component for Plain {
    fn type_name(&self) -> &str {
        self.0
    }
}

pub fn plain_definition(type_name: &'static str, journal: &Journal) -> Definition {
    let journal = journal.clone();
    Definition::new(type_name, move |_| {
        journal.borrow_mut().push(format!("new:{type_name}"));
        Ok(Rc::new(Plain(type_name)) as Rc<dyn Component>)
    })
}

/// Wraps `definition` so its factory first builds `dependency`.
pub fn depending_on(mut definition: Definition, dependency: &'static str) -> Definition {
    let inner = definition.factory.take().expect("definition has a factory");
    definition.factory = Some(ComponentFactory::new(move |registry| {
        registry.get_or_create(dependency)?;
        inner.create(registry)
    }));
    definition
}
