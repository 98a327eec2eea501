//! Shared utilities for the recipe tools.
//!
//! This crate provides cross-cutting concerns used by all other recipe crates:
//! the unified error type, recipe file discovery, and terminal status lines.

pub mod errors;
pub mod fs;
pub mod progress;
