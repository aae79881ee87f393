//! Extension catalog: discovery and tier classification.
//!
//! # Responsibility
//! - Enumerate registry names exposing an extension capability.
//! - Split names into priority tiers using non-instantiating checks.
//! - Instantiate a chosen set of names, explicitly and in order.
//!
//! # Invariants
//! - [`discover`] and [`classify`] never construct a component.
//! - [`instantiate`] is the only function here that builds components.
//! - Every listing works on a name snapshot taken when the call starts.

use crate::error::{BootstrapError, BootstrapResult};
use crate::extension::component::{matched_roles, Component};
use crate::logging::BootstrapLog;
use crate::model::capability::{Capability, PriorityTier};
use crate::registry::ComponentRegistry;
use std::collections::HashSet;
use std::rc::Rc;

/// A registry name paired with its built instance.
pub type NamedComponent = (String, Rc<dyn Component>);

/// Names exposing `capability`, minus `exclude`, optionally restricted to
/// types that also carry `marker`.
pub fn discover(
    registry: &dyn ComponentRegistry,
    capability: Capability,
    exclude: &HashSet<String>,
    marker: Option<Capability>,
) -> BootstrapResult<Vec<String>> {
    let mut selected = Vec::new();
    for name in registry.names_with_capability(capability)? {
        if exclude.contains(&name) {
            continue;
        }
        if let Some(marker) = marker {
            if !registry.type_matches(&name, marker)? {
                continue;
            }
        }
        selected.push(name);
    }
    Ok(selected)
}

/// Names split by priority tier, each in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierBuckets {
    pub priority_ordered: Vec<String>,
    pub ordered: Vec<String>,
    pub unordered: Vec<String>,
}

impl TierBuckets {
    pub fn tier(&self, tier: PriorityTier) -> &[String] {
        match tier {
            PriorityTier::PriorityOrdered => &self.priority_ordered,
            PriorityTier::Ordered => &self.ordered,
            PriorityTier::Unordered => &self.unordered,
        }
    }

    pub fn len(&self) -> usize {
        self.priority_ordered.len() + self.ordered.len() + self.unordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies `names` into tiers without instantiating; names in `skip` are
/// dropped.
pub fn classify(
    registry: &dyn ComponentRegistry,
    names: &[String],
    skip: &HashSet<String>,
) -> BootstrapResult<TierBuckets> {
    let mut buckets = TierBuckets::default();
    for name in names {
        if skip.contains(name) {
            continue;
        }
        if registry.type_matches(name, Capability::PriorityOrdered)? {
            buckets.priority_ordered.push(name.clone());
        } else if registry.type_matches(name, Capability::Ordered)? {
            buckets.ordered.push(name.clone());
        } else {
            buckets.unordered.push(name.clone());
        }
    }
    Ok(buckets)
}

/// Builds each name through `get_or_create` and checks it exposes `role`.
///
/// Names whose definition disappeared since the snapshot was taken are
/// skipped.
pub fn instantiate(
    registry: &mut dyn ComponentRegistry,
    names: &[String],
    role: Capability,
    log: &BootstrapLog,
) -> BootstrapResult<Vec<NamedComponent>> {
    let mut built = Vec::with_capacity(names.len());
    for name in names {
        if !registry.contains_definition(name) && registry.singleton(name).is_none() {
            log.debug(format_args!(
                "event=extension_instantiate module=catalog status=skipped reason=definition_removed name={name}"
            ));
            continue;
        }
        let instance = registry.get_or_create(name)?;
        if !matched_roles(instance.as_ref()).contains(role) {
            return Err(BootstrapError::CapabilityMismatch {
                name: name.clone(),
                capability: role,
            });
        }
        built.push((name.clone(), instance));
    }
    Ok(built)
}
