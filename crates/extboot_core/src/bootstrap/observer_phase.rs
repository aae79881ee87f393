//! Observer installer.
//!
//! # Responsibility
//! - Install catalog instance observers onto the registry in tier order.
//! - Bracket them with the eligibility checker (first) and the container's
//!   listener detector (last).
//!
//! # Invariants
//! - Final order: PriorityOrdered, Ordered, Unordered, merged-definition
//!   observers (whatever their tier), listener detector.
//! - Tiers are classified without instantiating; a tier is built only after
//!   every higher tier has been installed.
//! - Merged-definition membership is a post-construction role check.

use crate::bootstrap::context::ContainerContext;
use crate::bootstrap::eligibility::EligibilityChecker;
use crate::bootstrap::report::{ExtensionStep, PhaseReport};
use crate::error::BootstrapResult;
use crate::extension::catalog::{classify, instantiate, NamedComponent};
use crate::extension::component::{matched_roles, Component};
use crate::extension::ordering::sort_extensions;
use crate::logging::BootstrapLog;
use crate::model::capability::Capability;
use crate::registry::ComponentRegistry;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

/// Installs every instance observer known to `registry`.
///
/// # Errors
/// - Any observer that fails to build aborts the phase immediately.
pub fn install_observer_phase(
    registry: &mut dyn ComponentRegistry,
    context: &ContainerContext,
    log: &BootstrapLog,
) -> BootstrapResult<PhaseReport> {
    let started_at = Instant::now();
    let mut report = PhaseReport::default();

    let names = registry.names_with_capability(Capability::InstanceObserver)?;
    let target_count = registry.installed_observer_count() + 1 + names.len();
    log.info(format_args!(
        "event=observer_phase module=bootstrap status=start context={} candidates={} target_observers={}",
        context.id(),
        names.len(),
        target_count
    ));

    let checker: Rc<dyn Component> = Rc::new(EligibilityChecker::new(target_count, log.clone()));
    install(registry, &(checker.type_name().to_string(), checker.clone()), &mut report);

    let result = install_catalog_observers(registry, &names, &mut report, log);
    if let Err(err) = result {
        log.error(format_args!(
            "event=observer_phase module=bootstrap status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ));
        return Err(err);
    }

    let sentinel = context.listener_detector();
    install(registry, &(sentinel.type_name().to_string(), sentinel.clone()), &mut report);

    log.info(format_args!(
        "event=observer_phase module=bootstrap status=ok installed={} duration_ms={}",
        registry.installed_observer_count(),
        started_at.elapsed().as_millis()
    ));
    Ok(report)
}

fn install_catalog_observers(
    registry: &mut dyn ComponentRegistry,
    names: &[String],
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    let buckets = classify(registry, names, &HashSet::new())?;
    let mut merged_observers: Vec<NamedComponent> = Vec::new();

    let mut batch = instantiate(
        registry,
        &buckets.priority_ordered,
        Capability::InstanceObserver,
        log,
    )?;
    collect_merged_observers(&batch, &mut merged_observers);
    sort_extensions(&mut batch, registry);
    install_all(registry, &batch, report);

    let mut batch = instantiate(registry, &buckets.ordered, Capability::InstanceObserver, log)?;
    collect_merged_observers(&batch, &mut merged_observers);
    sort_extensions(&mut batch, registry);
    install_all(registry, &batch, report);

    let batch = instantiate(registry, &buckets.unordered, Capability::InstanceObserver, log)?;
    collect_merged_observers(&batch, &mut merged_observers);
    install_all(registry, &batch, report);

    sort_extensions(&mut merged_observers, registry);
    install_all(registry, &merged_observers, report);
    Ok(())
}

fn collect_merged_observers(batch: &[NamedComponent], merged: &mut Vec<NamedComponent>) {
    merged.extend(
        batch
            .iter()
            .filter(|(_, instance)| {
                matched_roles(instance.as_ref()).contains(Capability::MergedDefinitionObserver)
            })
            .cloned(),
    );
}

fn install_all(
    registry: &mut dyn ComponentRegistry,
    batch: &[NamedComponent],
    report: &mut PhaseReport,
) {
    for entry in batch {
        install(registry, entry, report);
    }
}

fn install(registry: &mut dyn ComponentRegistry, entry: &NamedComponent, report: &mut PhaseReport) {
    let (name, instance) = entry;
    let started_at = Instant::now();
    registry.append_observer(instance.clone());
    report.push(
        ExtensionStep::InstallObserver,
        name,
        instance.priority().tier,
        started_at.elapsed().as_micros(),
    );
}
