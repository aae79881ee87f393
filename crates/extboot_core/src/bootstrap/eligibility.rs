//! Early-construction diagnostic observer.
//!
//! # Invariants
//! - Never fails and never replaces the instance it sees.
//! - Emits at most one diagnostic per constructed instance.

use crate::error::BootstrapResult;
use crate::extension::component::{matched_roles, Component, InstanceObserver};
use crate::logging::BootstrapLog;
use crate::model::capability::Capability;
use crate::registry::ComponentRegistry;
use std::rc::Rc;

/// Flags components built while the observer chain was still incomplete.
///
/// Such components may have missed observers installed after them (for
/// example a proxying observer).
pub struct EligibilityChecker {
    target_count: usize,
    log: BootstrapLog,
}

impl EligibilityChecker {
    pub fn new(target_count: usize, log: BootstrapLog) -> Self {
        Self { target_count, log }
    }

    /// Observer count the registry reaches once installation completes.
    pub fn target_count(&self) -> usize {
        self.target_count
    }
}

impl Component for EligibilityChecker {
    fn type_name(&self) -> &str {
        "EligibilityChecker"
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        Some(self)
    }
}

impl InstanceObserver for EligibilityChecker {
    fn after_init(
        &self,
        instance: Rc<dyn Component>,
        name: &str,
        registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        let is_observer = matched_roles(instance.as_ref()).contains(Capability::InstanceObserver);
        let is_infrastructure = registry
            .definition(name)
            .map(|definition| definition.is_infrastructure())
            .unwrap_or(false);
        let installed = registry.installed_observer_count();

        if !is_observer && !is_infrastructure && installed < self.target_count {
            self.log.info(format_args!(
                "event=early_instance module=bootstrap name={} type={} installed_observers={} target_observers={} note=not_eligible_for_all_instance_observers",
                name,
                instance.type_name(),
                installed,
                self.target_count
            ));
        }
        Ok(instance)
    }
}
