//! Definition and capability model.
//!
//! # Responsibility
//! - Define the metadata the registry stores and the engine classifies on.
//!
//! # Invariants
//! - Capability queries over this model never require a live instance.

pub mod capability;
pub mod definition;
