//! Capability namespace wiring.
//!
//! Checks never look at process globals. Callers inject a [`Namespace`] and
//! every existence test goes through [`resolve_identifier`], which walks a
//! dotted [`IdentifierPath`] and reports a miss as `None` rather than an
//! error. `JsonNamespace` is the stock implementation backed by a JSON
//! document.

pub mod json;
pub mod path;
pub mod scope;

pub use json::{FUNCTION_MARKER, JsonNamespace};
pub use path::IdentifierPath;
pub use scope::{Namespace, resolve_identifier};
