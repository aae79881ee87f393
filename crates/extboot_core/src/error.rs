//! Bootstrap error taxonomy.
//!
//! # Responsibility
//! - Carry fatal construction/invocation failures out of the engine.
//! - Keep the failing component name and step attached to every cause.
//!
//! # Invariants
//! - Every variant is fatal for the current bootstrap; nothing here is retried.
//! - Diagnostic-only conditions (early-built instances) are logged, never
//!   represented as an error.

use crate::model::capability::Capability;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Extension step that was running when a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    Instantiate,
    MutateRegistry,
    MutateFactory,
    ProcessMergedDefinition,
    BeforeInit,
    AfterInit,
}

impl FailedStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instantiate => "instantiate",
            Self::MutateRegistry => "mutate_registry",
            Self::MutateFactory => "mutate_factory",
            Self::ProcessMergedDefinition => "process_merged_definition",
            Self::BeforeInit => "before_init",
            Self::AfterInit => "after_init",
        }
    }
}

/// Fatal bootstrap failures.
#[derive(Debug)]
pub enum BootstrapError {
    /// Component name rejected by registry validation.
    InvalidComponentName(String),
    /// No definition (and no singleton) is registered under this name.
    NoSuchDefinition(String),
    /// Definition has no factory and only serves as a parent template.
    AbstractDefinition(String),
    /// `name` was requested again while it was still being constructed.
    CircularReference { name: String, chain: Vec<String> },
    /// Parent chain of a definition loops back onto itself.
    ParentCycle { name: String, chain: Vec<String> },
    /// Instance does not expose a role its definition declared.
    CapabilityMismatch {
        name: String,
        capability: Capability,
    },
    /// An extension failed while running one of its steps.
    ExtensionFailed {
        name: String,
        step: FailedStep,
        source: Box<BootstrapError>,
    },
    /// Error raised by extension or factory code itself.
    Extension(String),
    /// The container has already completed a refresh.
    AlreadyRefreshed,
}

impl BootstrapError {
    /// Wraps `self` with the name and step of the extension that surfaced it.
    pub fn in_step(self, name: impl Into<String>, step: FailedStep) -> Self {
        Self::ExtensionFailed {
            name: name.into(),
            step,
            source: Box::new(self),
        }
    }

    /// Returns the innermost cause of a wrapped failure chain.
    pub fn root_cause(&self) -> &BootstrapError {
        match self {
            Self::ExtensionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidComponentName(value) => write!(f, "component name is invalid: `{value}`"),
            Self::NoSuchDefinition(value) => write!(f, "no component definition named `{value}`"),
            Self::AbstractDefinition(value) => {
                write!(f, "definition `{value}` is abstract and cannot be instantiated")
            }
            Self::CircularReference { name, chain } => write!(
                f,
                "component `{name}` is currently in creation (cycle: {} -> {name})",
                chain.join(" -> ")
            ),
            Self::ParentCycle { name, chain } => write!(
                f,
                "definition `{name}` has a cyclic parent chain: {}",
                chain.join(" -> ")
            ),
            Self::CapabilityMismatch { name, capability } => write!(
                f,
                "component `{name}` does not expose declared capability `{}`",
                capability.as_str()
            ),
            Self::ExtensionFailed { name, step, source } => {
                write!(f, "extension `{name}` failed during {}: {source}", step.as_str())
            }
            Self::Extension(message) => write!(f, "{message}"),
            Self::AlreadyRefreshed => write!(f, "container has already been refreshed"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExtensionFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
