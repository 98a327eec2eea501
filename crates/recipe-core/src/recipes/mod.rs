//! Recipes that ship with the tools.

mod fairroot;

pub use fairroot::fairroot;
