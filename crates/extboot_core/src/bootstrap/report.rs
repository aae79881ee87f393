//! Serializable record of what each bootstrap phase invoked.

use crate::model::capability::PriorityTier;
use serde::Serialize;
use uuid::Uuid;

/// Extension step recorded in a phase report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStep {
    MutateRegistry,
    MutateFactory,
    InstallObserver,
}

impl ExtensionStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MutateRegistry => "mutate_registry",
            Self::MutateFactory => "mutate_factory",
            Self::InstallObserver => "install_observer",
        }
    }
}

/// One invocation or installation, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationRecord {
    pub step: ExtensionStep,
    pub name: String,
    pub tier: PriorityTier,
    pub duration_us: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub records: Vec<InvocationRecord>,
}

impl PhaseReport {
    pub(crate) fn push(
        &mut self,
        step: ExtensionStep,
        name: &str,
        tier: PriorityTier,
        duration_us: u128,
    ) {
        self.records.push(InvocationRecord {
            step,
            name: name.to_string(),
            tier,
            duration_us,
        });
    }

    /// Names recorded for `step`, in execution order.
    pub fn names(&self, step: ExtensionStep) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.step == step)
            .map(|record| record.name.clone())
            .collect()
    }
}

/// Result of one full container refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub run_id: Uuid,
    pub mutator_phase: PhaseReport,
    pub observer_phase: PhaseReport,
    /// Singletons built eagerly after the observer phase.
    pub instantiated: Vec<String>,
    /// Listener components detected by the tail observer.
    pub listeners: Vec<String>,
}
