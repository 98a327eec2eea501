//! Core recipe model for the recipe tools.
//!
//! This crate defines what a package recipe declares and how its rules are
//! evaluated: versions and ranges, variants and pin profiles, `when`
//! predicates, dependency, patch, flag and environment rules, predicate
//! resolution against a build context, and the resolved build handed over
//! by an external dependency resolver.
//!
//! Nothing here solves the dependency graph or touches the network.

pub mod conflict;
pub mod context;
pub mod expr;
pub mod lockfile;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod recipes;
pub mod resolution;
pub mod resolved;
pub mod rule;
pub mod variant;
pub mod version;
