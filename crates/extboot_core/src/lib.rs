//! Core bootstrap engine for extension orchestration.
//! Discovers, orders, and invokes initialization-time extensions over a
//! shared component registry.

pub mod bootstrap;
pub mod error;
pub mod extension;
pub mod logging;
pub mod model;
pub mod registry;

pub use bootstrap::container::Container;
pub use bootstrap::context::{ContainerContext, ListenerSet};
pub use bootstrap::eligibility::EligibilityChecker;
pub use bootstrap::listener_detector::ListenerDetector;
pub use bootstrap::mutator_phase::run_mutator_phase;
pub use bootstrap::observer_phase::install_observer_phase;
pub use bootstrap::report::{BootstrapReport, ExtensionStep, InvocationRecord, PhaseReport};
pub use error::{BootstrapError, BootstrapResult, FailedStep};
pub use extension::component::{
    matched_roles, Component, ContainerEvent, ContainerListener, FactoryMutator, InstanceObserver,
    MergedDefinitionObserver, RegistryMutator,
};
pub use extension::ordering::{compare_priority, ComponentComparator};
pub use logging::{
    default_log_level, init_logging, BootstrapLog, FacadeSink, LogSink, LoggingStatus, MemorySink,
};
pub use model::capability::{
    Capability, CapabilitySet, Priority, PriorityTier, HIGHEST_PRECEDENCE, LOWEST_PRECEDENCE,
};
pub use model::definition::{Definition, MergedDefinition, Role};
pub use registry::{ComponentRegistry, DefaultComponentRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
