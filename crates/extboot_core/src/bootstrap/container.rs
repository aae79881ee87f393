//! Container refresh driver.
//!
//! # Responsibility
//! - Run the two bootstrap checkpoints in order over one registry.
//! - Eagerly build the remaining singletons and announce the refresh.
//!
//! # Invariants
//! - A container refreshes at most once, successful or not.
//! - The listener detector is installed before the mutator phase and moved
//!   to the tail by the observer phase.

use crate::bootstrap::context::ContainerContext;
use crate::bootstrap::mutator_phase::run_mutator_phase;
use crate::bootstrap::observer_phase::install_observer_phase;
use crate::bootstrap::report::BootstrapReport;
use crate::error::{BootstrapError, BootstrapResult};
use crate::extension::component::{Component, ContainerEvent};
use crate::logging::BootstrapLog;
use crate::registry::{ComponentRegistry, DefaultComponentRegistry};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

pub struct Container {
    registry: DefaultComponentRegistry,
    context: ContainerContext,
    external_mutators: Vec<Rc<dyn Component>>,
    log: BootstrapLog,
    refreshed: bool,
}

impl Container {
    pub fn new(id: impl Into<String>, log: BootstrapLog) -> Self {
        Self {
            registry: DefaultComponentRegistry::new(),
            context: ContainerContext::new(id, log.clone()),
            external_mutators: Vec::new(),
            log,
            refreshed: false,
        }
    }

    pub fn registry(&self) -> &DefaultComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DefaultComponentRegistry {
        &mut self.registry
    }

    pub fn context(&self) -> &ContainerContext {
        &self.context
    }

    /// Adds a caller-supplied mutator that does not live in the registry.
    pub fn add_external_mutator(&mut self, mutator: Rc<dyn Component>) {
        self.external_mutators.push(mutator);
    }

    /// Returns one component, building it on first request.
    pub fn component(&mut self, name: &str) -> BootstrapResult<Rc<dyn Component>> {
        self.registry.get_or_create(name)
    }

    /// Runs the full bootstrap sequence.
    ///
    /// # Errors
    /// - `AlreadyRefreshed` on a second call.
    /// - Any fatal extension or construction failure.
    pub fn refresh(&mut self) -> BootstrapResult<BootstrapReport> {
        if self.refreshed {
            return Err(BootstrapError::AlreadyRefreshed);
        }
        self.refreshed = true;

        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        self.log.info(format_args!(
            "event=container_refresh module=bootstrap status=start context={} run_id={}",
            self.context.id(),
            run_id
        ));

        match self.run_refresh(run_id) {
            Ok(report) => {
                self.log.info(format_args!(
                    "event=container_refresh module=bootstrap status=ok context={} run_id={} singletons={} duration_ms={}",
                    self.context.id(),
                    run_id,
                    report.instantiated.len(),
                    started_at.elapsed().as_millis()
                ));
                Ok(report)
            }
            Err(err) => {
                self.log.error(format_args!(
                    "event=container_refresh module=bootstrap status=error context={} run_id={} duration_ms={} error={}",
                    self.context.id(),
                    run_id,
                    started_at.elapsed().as_millis(),
                    err
                ));
                Err(err)
            }
        }
    }

    fn run_refresh(&mut self, run_id: Uuid) -> BootstrapResult<BootstrapReport> {
        self.registry
            .append_observer(self.context.listener_detector());

        let mutator_phase =
            run_mutator_phase(&mut self.registry, &self.external_mutators, &self.log)?;
        let observer_phase = install_observer_phase(&mut self.registry, &self.context, &self.log)?;
        let instantiated = self.registry.pre_instantiate_singletons()?;

        self.context.publish(ContainerEvent::Refreshed);

        Ok(BootstrapReport {
            run_id,
            mutator_phase,
            observer_phase,
            instantiated,
            listeners: self.context.listeners().names(),
        })
    }
}
