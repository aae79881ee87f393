//! Demo container wiring.
//!
//! # Responsibility
//! - Provide one sample extension per bootstrap role.
//! - Assemble them with a few ordinary components into a [`Container`].
//!
//! # Invariants
//! - Every `${key}` in a definition attribute is resolved before any
//!   ordinary component is built, or the refresh fails.

use extboot_core::{
    BootstrapError, BootstrapLog, BootstrapResult, Capability, Component, ComponentRegistry,
    Container, ContainerEvent, ContainerListener, Definition, FactoryMutator, InstanceObserver,
    MergedDefinition, MergedDefinitionObserver, Priority, RegistryMutator, Role,
};
use log::info;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

/// Built-in placeholder values; `--property` overrides them.
pub fn default_properties() -> BTreeMap<String, String> {
    [
        ("greeting.name", "world"),
        ("store.url", "mem://demo"),
        ("cache.capacity", "64"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// Resolves `${key}` placeholders in every definition attribute.
pub struct PlaceholderResolver {
    properties: BTreeMap<String, String>,
}

impl PlaceholderResolver {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    fn resolve(&self, value: &str) -> Result<String, String> {
        for caps in PLACEHOLDER_RE.captures_iter(value) {
            if !self.properties.contains_key(&caps[1]) {
                return Err(caps[1].to_string());
            }
        }
        Ok(PLACEHOLDER_RE
            .replace_all(value, |caps: &Captures| {
                self.properties.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned())
    }
}

impl Component for PlaceholderResolver {
    fn type_name(&self) -> &str {
        "PlaceholderResolver"
    }

    fn priority(&self) -> Priority {
        Priority::priority_ordered(0)
    }

    fn as_factory_mutator(&self) -> Option<&dyn FactoryMutator> {
        Some(self)
    }
}

impl FactoryMutator for PlaceholderResolver {
    fn mutate_factory(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()> {
        let mut resolved = 0usize;
        for name in registry.definition_names() {
            let Some(definition) = registry.definition_mut(&name) else {
                continue;
            };
            for (key, value) in definition.attributes.iter_mut() {
                if !value.contains("${") {
                    continue;
                }
                *value = self.resolve(value).map_err(|missing| {
                    BootstrapError::Extension(format!(
                        "unresolved placeholder `${{{missing}}}` in `{name}.{key}`"
                    ))
                })?;
                resolved += 1;
            }
        }
        info!("event=placeholders_resolved module=demo status=ok count={resolved}");
        Ok(())
    }
}

/// Registers the cache definition the base configuration leaves out.
pub struct ImportRegistrar;

impl Component for ImportRegistrar {
    fn type_name(&self) -> &str {
        "ImportRegistrar"
    }

    fn as_registry_mutator(&self) -> Option<&dyn RegistryMutator> {
        Some(self)
    }

    fn as_factory_mutator(&self) -> Option<&dyn FactoryMutator> {
        Some(self)
    }
}

impl RegistryMutator for ImportRegistrar {
    fn mutate_registry(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()> {
        if registry.contains_definition("cache") {
            return Ok(());
        }
        registry.register_definition(
            "cache",
            Definition::new("Cache", |registry| {
                let capacity = registry
                    .merged_definition("cache")?
                    .attribute("capacity")
                    .unwrap_or("0")
                    .parse::<usize>()
                    .map_err(|err| {
                        BootstrapError::Extension(format!("invalid cache capacity: {err}"))
                    })?;
                let cache = Cache { capacity };
                info!(
                    "event=component_configured module=demo name=cache capacity={}",
                    cache.capacity
                );
                Ok(Rc::new(cache) as Rc<dyn Component>)
            })
            .with_attribute("capacity", "${cache.capacity}"),
        )
    }
}

impl FactoryMutator for ImportRegistrar {
    /// Tags the imported definition once every registration has settled.
    fn mutate_factory(&self, registry: &mut dyn ComponentRegistry) -> BootstrapResult<()> {
        if let Some(cache) = registry.definition_mut("cache") {
            cache
                .attributes
                .insert("source".to_string(), "import".to_string());
        }
        info!(
            "event=definitions_finalized module=demo count={}",
            registry.definition_names().len()
        );
        Ok(())
    }
}

/// Counts and logs every component that finishes construction.
#[derive(Default)]
pub struct AuditObserver {
    seen: Cell<usize>,
}

impl Component for AuditObserver {
    fn type_name(&self) -> &str {
        "AuditObserver"
    }

    fn priority(&self) -> Priority {
        Priority::ordered(10)
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        Some(self)
    }
}

impl InstanceObserver for AuditObserver {
    fn after_init(
        &self,
        instance: Rc<dyn Component>,
        name: &str,
        _registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        self.seen.set(self.seen.get() + 1);
        info!(
            "event=component_ready module=demo name={} type={} seen={}",
            name,
            instance.type_name(),
            self.seen.get()
        );
        Ok(instance)
    }
}

/// Logs the final attribute set of every definition before construction.
pub struct DefinitionInspector;

impl Component for DefinitionInspector {
    fn type_name(&self) -> &str {
        "DefinitionInspector"
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        Some(self)
    }

    fn as_merged_definition_observer(&self) -> Option<&dyn MergedDefinitionObserver> {
        Some(self)
    }
}

impl InstanceObserver for DefinitionInspector {}

impl MergedDefinitionObserver for DefinitionInspector {
    fn process_merged_definition(
        &self,
        definition: &mut MergedDefinition,
        name: &str,
    ) -> BootstrapResult<()> {
        let attributes = definition
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        info!(
            "event=definition_inspected module=demo name={} type={} attributes=[{}]",
            name, definition.type_name, attributes
        );
        Ok(())
    }
}

/// Logs container lifecycle events.
pub struct RefreshAnnouncer;

impl Component for RefreshAnnouncer {
    fn type_name(&self) -> &str {
        "RefreshAnnouncer"
    }

    fn as_listener(&self) -> Option<&dyn ContainerListener> {
        Some(self)
    }
}

impl ContainerListener for RefreshAnnouncer {
    fn on_event(&self, event: ContainerEvent) {
        info!("event=container_event module=demo kind={event:?}");
    }
}

pub struct Greeter {
    message: String,
}

impl Component for Greeter {
    fn type_name(&self) -> &str {
        "Greeter"
    }
}

pub struct Store {
    url: String,
}

impl Component for Store {
    fn type_name(&self) -> &str {
        "Store"
    }
}

pub struct Cache {
    capacity: usize,
}

impl Component for Cache {
    fn type_name(&self) -> &str {
        "Cache"
    }
}

fn attribute(registry: &dyn ComponentRegistry, name: &str, key: &str) -> BootstrapResult<String> {
    Ok(registry
        .merged_definition(name)?
        .attribute(key)
        .unwrap_or_default()
        .to_string())
}

/// Builds the demo container; nothing is constructed until refresh.
pub fn build_container(
    properties: BTreeMap<String, String>,
    log: BootstrapLog,
) -> BootstrapResult<Container> {
    let mut container = Container::new("extboot-demo", log);
    let registry = container.registry_mut();

    registry.register_definition(
        "placeholderResolver",
        Definition::new("PlaceholderResolver", move |_| {
            Ok(Rc::new(PlaceholderResolver::new(properties.clone())) as Rc<dyn Component>)
        })
        .with_capabilities([Capability::FactoryMutator, Capability::PriorityOrdered])
        .with_role(Role::Infrastructure),
    )?;
    registry.register_definition(
        "importRegistrar",
        Definition::new("ImportRegistrar", |_| {
            Ok(Rc::new(ImportRegistrar) as Rc<dyn Component>)
        })
        .with_capability(Capability::RegistryMutator)
        .with_role(Role::Infrastructure),
    )?;
    registry.register_definition(
        "auditObserver",
        Definition::new("AuditObserver", |_| {
            Ok(Rc::new(AuditObserver::default()) as Rc<dyn Component>)
        })
        .with_capabilities([Capability::InstanceObserver, Capability::Ordered])
        .with_role(Role::Infrastructure),
    )?;
    registry.register_definition(
        "definitionInspector",
        Definition::new("DefinitionInspector", |_| {
            Ok(Rc::new(DefinitionInspector) as Rc<dyn Component>)
        })
        .with_capability(Capability::MergedDefinitionObserver)
        .with_role(Role::Infrastructure),
    )?;
    registry.register_definition(
        "refreshAnnouncer",
        Definition::new("RefreshAnnouncer", |_| {
            Ok(Rc::new(RefreshAnnouncer) as Rc<dyn Component>)
        })
        .with_capability(Capability::Listener),
    )?;

    registry.register_definition(
        "serviceBase",
        Definition::template("Service").with_attribute("owner", "demo"),
    )?;
    registry.register_definition(
        "store",
        Definition::new("Store", |registry| {
            let store = Store {
                url: attribute(&*registry, "store", "url")?,
            };
            info!("event=component_configured module=demo name=store url={}", store.url);
            Ok(Rc::new(store) as Rc<dyn Component>)
        })
        .with_parent("serviceBase")
        .with_attribute("url", "${store.url}"),
    )?;
    registry.register_definition(
        "greeter",
        Definition::new("Greeter", |registry| {
            registry.get_or_create("store")?;
            let greeter = Greeter {
                message: attribute(&*registry, "greeter", "message")?,
            };
            info!(
                "event=component_configured module=demo name=greeter message={:?}",
                greeter.message
            );
            Ok(Rc::new(greeter) as Rc<dyn Component>)
        })
        .with_parent("serviceBase")
        .with_attribute("message", "hello, ${greeting.name}"),
    )?;

    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::{build_container, default_properties, PlaceholderResolver};
    use extboot_core::{BootstrapError, BootstrapLog, ComponentRegistry};

    #[test]
    fn resolver_replaces_known_keys_and_reports_missing_ones() {
        let resolver = PlaceholderResolver::new(default_properties());

        assert_eq!(
            resolver.resolve("hello, ${greeting.name}").expect("resolved"),
            "hello, world"
        );
        assert_eq!(
            resolver.resolve("${nope} and ${greeting.name}"),
            Err("nope".to_string())
        );
    }

    #[test]
    fn refresh_resolves_placeholders_and_imports_the_cache() {
        let mut properties = default_properties();
        properties.insert("greeting.name".to_string(), "ada".to_string());
        let mut container =
            build_container(properties, BootstrapLog::default()).expect("build container");

        let report = container.refresh().expect("refresh");

        assert!(report.instantiated.contains(&"cache".to_string()));
        assert_eq!(report.listeners, vec!["refreshAnnouncer".to_string()]);
        let merged = container
            .registry()
            .merged_definition("greeter")
            .expect("greeter definition");
        assert_eq!(merged.attribute("message"), Some("hello, ada"));
        assert_eq!(merged.attribute("owner"), Some("demo"));
        let cache = container
            .registry()
            .merged_definition("cache")
            .expect("cache definition");
        assert_eq!(cache.attribute("source"), Some("import"));
        assert_eq!(cache.attribute("capacity"), Some("64"));
    }

    #[test]
    fn missing_property_fails_the_refresh() {
        let mut properties = default_properties();
        properties.remove("store.url");
        let mut container =
            build_container(properties, BootstrapLog::default()).expect("build container");

        let err = container.refresh().expect_err("unresolved placeholder");

        match err.root_cause() {
            BootstrapError::Extension(message) => assert!(message.contains("store.url")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
