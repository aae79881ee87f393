//! Bootstrap-time extension orchestration.
//!
//! # Responsibility
//! - Run registry and factory mutators (`run_mutator_phase`).
//! - Install instance observers in contract order (`install_observer_phase`).
//! - Drive both checkpoints for a whole container (`Container::refresh`).
//!
//! # Invariants
//! - Single-threaded and synchronous; the engine runs once per container.
//! - Every failure is fatal and propagates; diagnostics are log-only.

pub mod container;
pub mod context;
pub mod eligibility;
pub mod listener_detector;
pub mod mutator_phase;
pub mod observer_phase;
pub mod report;
