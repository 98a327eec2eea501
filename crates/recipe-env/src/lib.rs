//! Build configuration derived from a resolved build.
//!
//! [`composer::EnvironmentComposer`] turns a recipe and one concrete build
//! into CMake arguments and environment changes for each phase of the
//! package's life. [`mutation`] models those changes and can apply them to
//! a variable map or render them as a shell script.

pub mod composer;
pub mod mutation;
