//! Shared library for the capprobe harness.
//!
//! The crate exposes the pieces a caller needs to probe an environment for
//! capabilities: an injected [`Namespace`] to resolve identifiers against, a
//! [`CheckRegistry`] of named checks, the [`Harness`] that runs them one at a
//! time with fault isolation, and the [`Report`]/[`ReportSummary`] plain data
//! the `capprobe` binary renders. Rendering and file loading live here too so
//! the binary stays a thin argument parser.

pub mod harness;
pub mod manifest;
pub mod namespace;
pub mod probe;
pub mod registry;
pub mod render;
pub mod report;
pub mod scratch;
pub mod summary;

pub use harness::{CancelToken, DEFAULT_TIMEOUT_GRACE, Harness, RunOptions};
pub use manifest::{CheckManifest, Expectation, MANIFEST_SCHEMA_VERSION, ManifestCheck, ValueKind};
pub use namespace::{FUNCTION_MARKER, IdentifierPath, JsonNamespace, Namespace, resolve_identifier};
pub use probe::{Probe, ProbeContext, ProbeFailure, ProbeVerdict, TimeLimit};
pub use registry::{CheckDefinition, CheckRegistry, DEFAULT_CATEGORY};
pub use render::render_report;
pub use report::{CheckOutcome, CheckResult, Report};
pub use scratch::ScratchSpace;
pub use summary::{CategorySummary, RankPolicy, RankTier, ReportSummary, Tally, success_rate, summarize};
