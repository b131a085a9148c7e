//! Check registry wiring.
//!
//! A [`CheckDefinition`] names one capability plus its aliases, category and
//! optional probe. [`CheckRegistry`] holds the definitions a harness runs, in
//! registration order, with last-write-wins replacement by name.

pub mod definition;
pub mod repository;

pub use definition::{CheckDefinition, DEFAULT_CATEGORY};
pub use repository::CheckRegistry;
