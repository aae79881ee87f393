//! Extension contracts, ordering, and catalog.
//!
//! This module defines what an extension is (a component exposing one or
//! more roles), how extensions compare, and how the catalog finds and
//! classifies them without building them early.

pub mod catalog;
pub mod component;
pub mod ordering;
