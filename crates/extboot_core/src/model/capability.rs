//! Capability markers and priority tiers for bootstrap extensions.
//!
//! # Invariants
//! - Capability sets are closed under implication: `RegistryMutator` implies
//!   `FactoryMutator`, `MergedDefinitionObserver` implies `InstanceObserver`,
//!   `PriorityOrdered` implies `Ordered`.
//! - Every priority compares against every other one; a missing order value
//!   falls back to [`LOWEST_PRECEDENCE`].

use serde::Serialize;
use std::collections::BTreeSet;

/// Order value used when a component carries no explicit order.
///
/// Components without an order sort after every explicitly ordered peer in
/// the same tier.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;
/// Smallest order value; sorts first within a tier.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Role or ordering marker a component type can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RegistryMutator,
    FactoryMutator,
    InstanceObserver,
    MergedDefinitionObserver,
    PriorityOrdered,
    Ordered,
    Listener,
}

impl Capability {
    /// Stable string id used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistryMutator => "registry_mutator",
            Self::FactoryMutator => "factory_mutator",
            Self::InstanceObserver => "instance_observer",
            Self::MergedDefinitionObserver => "merged_definition_observer",
            Self::PriorityOrdered => "priority_ordered",
            Self::Ordered => "ordered",
            Self::Listener => "listener",
        }
    }

    fn implied(self) -> Option<Capability> {
        match self {
            Self::RegistryMutator => Some(Self::FactoryMutator),
            Self::MergedDefinitionObserver => Some(Self::InstanceObserver),
            Self::PriorityOrdered => Some(Self::Ordered),
            _ => None,
        }
    }
}

/// Small closed set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    members: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds one capability together with everything it implies.
    pub fn insert(&mut self, capability: Capability) {
        let mut next = Some(capability);
        while let Some(current) = next {
            self.members.insert(current);
            next = current.implied();
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.members.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Tier implied by the ordering markers in this set.
    pub fn tier(&self) -> PriorityTier {
        if self.contains(Capability::PriorityOrdered) {
            PriorityTier::PriorityOrdered
        } else if self.contains(Capability::Ordered) {
            PriorityTier::Ordered
        } else {
            PriorityTier::Unordered
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.members.iter().copied()
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(value: [Capability; N]) -> Self {
        value.into_iter().collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// Invocation tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    PriorityOrdered,
    Ordered,
    Unordered,
}

impl PriorityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriorityOrdered => "priority_ordered",
            Self::Ordered => "ordered",
            Self::Unordered => "unordered",
        }
    }

    /// Marker capability a type must expose to land in this tier.
    pub fn marker(self) -> Option<Capability> {
        match self {
            Self::PriorityOrdered => Some(Capability::PriorityOrdered),
            Self::Ordered => Some(Capability::Ordered),
            Self::Unordered => None,
        }
    }
}

/// Tier plus optional order value reported by a live component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub tier: PriorityTier,
    pub order: Option<i32>,
}

impl Priority {
    pub fn new(tier: PriorityTier, order: Option<i32>) -> Self {
        Self { tier, order }
    }

    pub fn priority_ordered(order: i32) -> Self {
        Self::new(PriorityTier::PriorityOrdered, Some(order))
    }

    pub fn ordered(order: i32) -> Self {
        Self::new(PriorityTier::Ordered, Some(order))
    }

    pub fn unordered() -> Self {
        Self::new(PriorityTier::Unordered, None)
    }

    /// Order value used for comparison.
    ///
    /// Unordered components always report [`LOWEST_PRECEDENCE`].
    pub fn effective_order(&self) -> i32 {
        match self.tier {
            PriorityTier::Unordered => LOWEST_PRECEDENCE,
            _ => self.order.unwrap_or(LOWEST_PRECEDENCE),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::unordered()
    }
}
