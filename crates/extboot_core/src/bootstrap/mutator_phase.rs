//! Registry-mutator and factory-mutator runners.
//!
//! # Responsibility
//! - Invoke every registry mutator's registry step exactly once, by tier,
//!   until no new registry mutator appears.
//! - Invoke the factory step on every registry mutator, then on the
//!   remaining factory mutators, by tier.
//!
//! # Invariants
//! - Tier order is PriorityOrdered, Ordered, then unordered passes.
//! - A name invoked as a registry mutator is never invoked again, neither
//!   as a registry mutator nor as a plain factory mutator.
//! - Each pass re-queries the registry and iterates a snapshot.
//! - The derived metadata cache is cleared once all factory steps ran.

use crate::bootstrap::report::{ExtensionStep, PhaseReport};
use crate::error::{BootstrapError, BootstrapResult, FailedStep};
use crate::extension::catalog::{classify, discover, instantiate, NamedComponent};
use crate::extension::component::Component;
use crate::extension::ordering::sort_extensions;
use crate::logging::BootstrapLog;
use crate::model::capability::Capability;
use crate::registry::ComponentRegistry;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

/// Runs the full mutator phase against `registry`.
///
/// `external_mutators` are caller-supplied instances that live outside the
/// registry. External registry mutators run before every catalog tier;
/// external plain factory mutators run right after the registry mutators'
/// factory steps.
///
/// # Errors
/// - Any instantiation or invocation failure aborts the phase immediately.
pub fn run_mutator_phase(
    registry: &mut dyn ComponentRegistry,
    external_mutators: &[Rc<dyn Component>],
    log: &BootstrapLog,
) -> BootstrapResult<PhaseReport> {
    let started_at = Instant::now();
    log.info(format_args!(
        "event=mutator_phase module=bootstrap status=start external={}",
        external_mutators.len()
    ));

    let mut report = PhaseReport::default();
    let result = run_all_mutators(registry, external_mutators, &mut report, log);

    match result {
        Ok(()) => {
            log.info(format_args!(
                "event=mutator_phase module=bootstrap status=ok invocations={} duration_ms={}",
                report.records.len(),
                started_at.elapsed().as_millis()
            ));
            Ok(report)
        }
        Err(err) => {
            log.error(format_args!(
                "event=mutator_phase module=bootstrap status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ));
            Err(err)
        }
    }
}

fn run_all_mutators(
    registry: &mut dyn ComponentRegistry,
    external_mutators: &[Rc<dyn Component>],
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    let mut processed: HashSet<String> = HashSet::new();
    let mut registry_mutators: Vec<NamedComponent> = Vec::new();
    let mut regular: Vec<NamedComponent> = Vec::new();

    for instance in external_mutators {
        let entry = (format!("external:{}", instance.type_name()), instance.clone());
        if instance.as_registry_mutator().is_some() {
            invoke_registry_steps(std::slice::from_ref(&entry), registry, report, log)?;
            registry_mutators.push(entry);
        } else {
            regular.push(entry);
        }
    }

    let names = discover(
        registry,
        Capability::RegistryMutator,
        &processed,
        Some(Capability::PriorityOrdered),
    )?;
    run_registry_batch(names, registry, &mut processed, &mut registry_mutators, report, log)?;

    let names = discover(
        registry,
        Capability::RegistryMutator,
        &processed,
        Some(Capability::Ordered),
    )?;
    run_registry_batch(names, registry, &mut processed, &mut registry_mutators, report, log)?;

    let mut pass = 0usize;
    loop {
        let names = discover(registry, Capability::RegistryMutator, &processed, None)?;
        if names.is_empty() {
            break;
        }
        pass += 1;
        log.debug(format_args!(
            "event=registry_mutator_pass module=bootstrap pass={} discovered={}",
            pass,
            names.len()
        ));
        run_registry_batch(names, registry, &mut processed, &mut registry_mutators, report, log)?;
    }

    invoke_factory_steps(&registry_mutators, registry, report, log)?;
    invoke_factory_steps(&regular, registry, report, log)?;

    run_factory_mutators(registry, &processed, report, log)?;
    registry.clear_derived_metadata_cache();
    Ok(())
}

fn run_registry_batch(
    names: Vec<String>,
    registry: &mut dyn ComponentRegistry,
    processed: &mut HashSet<String>,
    registry_mutators: &mut Vec<NamedComponent>,
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    if names.is_empty() {
        return Ok(());
    }
    processed.extend(names.iter().cloned());
    let mut batch = instantiate(registry, &names, Capability::RegistryMutator, log)?;
    sort_extensions(&mut batch, registry);
    invoke_registry_steps(&batch, registry, report, log)?;
    registry_mutators.extend(batch);
    Ok(())
}

/// Plain factory mutators not already handled as registry mutators.
fn run_factory_mutators(
    registry: &mut dyn ComponentRegistry,
    processed: &HashSet<String>,
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    let names = registry.names_with_capability(Capability::FactoryMutator)?;
    let buckets = classify(registry, &names, processed)?;
    log.debug(format_args!(
        "event=factory_mutator_classify module=bootstrap priority_ordered={} ordered={} unordered={}",
        buckets.priority_ordered.len(),
        buckets.ordered.len(),
        buckets.unordered.len()
    ));

    let mut batch = instantiate(
        registry,
        &buckets.priority_ordered,
        Capability::FactoryMutator,
        log,
    )?;
    sort_extensions(&mut batch, registry);
    invoke_factory_steps(&batch, registry, report, log)?;

    let mut batch = instantiate(registry, &buckets.ordered, Capability::FactoryMutator, log)?;
    sort_extensions(&mut batch, registry);
    invoke_factory_steps(&batch, registry, report, log)?;

    let batch = instantiate(registry, &buckets.unordered, Capability::FactoryMutator, log)?;
    invoke_factory_steps(&batch, registry, report, log)
}

fn invoke_registry_steps(
    batch: &[NamedComponent],
    registry: &mut dyn ComponentRegistry,
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    for (name, instance) in batch {
        let mutator =
            instance
                .as_registry_mutator()
                .ok_or_else(|| BootstrapError::CapabilityMismatch {
                    name: name.clone(),
                    capability: Capability::RegistryMutator,
                })?;
        let started_at = Instant::now();
        let outcome = mutator.mutate_registry(registry);
        record(
            outcome,
            ExtensionStep::MutateRegistry,
            name,
            instance.as_ref(),
            started_at,
            report,
            log,
        )?;
    }
    Ok(())
}

fn invoke_factory_steps(
    batch: &[NamedComponent],
    registry: &mut dyn ComponentRegistry,
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    for (name, instance) in batch {
        let started_at = Instant::now();
        let outcome = if let Some(mutator) = instance.as_factory_mutator() {
            mutator.mutate_factory(registry)
        } else if let Some(mutator) = instance.as_registry_mutator() {
            mutator.mutate_factory(registry)
        } else {
            return Err(BootstrapError::CapabilityMismatch {
                name: name.clone(),
                capability: Capability::FactoryMutator,
            });
        };
        record(
            outcome,
            ExtensionStep::MutateFactory,
            name,
            instance.as_ref(),
            started_at,
            report,
            log,
        )?;
    }
    Ok(())
}

fn record(
    outcome: BootstrapResult<()>,
    step: ExtensionStep,
    name: &str,
    instance: &dyn Component,
    started_at: Instant,
    report: &mut PhaseReport,
    log: &BootstrapLog,
) -> BootstrapResult<()> {
    let tier = instance.priority().tier;
    let elapsed = started_at.elapsed();
    match outcome {
        Ok(()) => {
            log.debug(format_args!(
                "event=extension_invoke module=bootstrap status=ok step={} name={} tier={} duration_us={}",
                step.as_str(),
                name,
                tier.as_str(),
                elapsed.as_micros()
            ));
            report.push(step, name, tier, elapsed.as_micros());
            Ok(())
        }
        Err(err) => {
            log.error(format_args!(
                "event=extension_invoke module=bootstrap status=error step={} name={} tier={} error={}",
                step.as_str(),
                name,
                tier.as_str(),
                err
            ));
            let failed = match step {
                ExtensionStep::MutateRegistry => FailedStep::MutateRegistry,
                _ => FailedStep::MutateFactory,
            };
            Err(err.in_step(name, failed))
        }
    }
}
