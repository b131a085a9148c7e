//! The capability test harness.
//!
//! A [`Harness`] owns a [`CheckRegistry`] and an injected [`Namespace`]. Runs
//! are strictly sequential: each check is resolved, probed and recorded before
//! the next begins, because probes may touch shared state (a scratch file, a
//! temporary global) and interleaving them would make reports unreproducible.
//! Nothing a probe or the namespace does escapes [`Harness::run_one`].

use crate::namespace::{Namespace, resolve_identifier};
use crate::probe::{self, TimeLimit};
use crate::registry::{CheckDefinition, CheckRegistry};
use crate::report::{CheckOutcome, CheckResult, NOT_FOUND_REASON, Report};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a timed-out probe gets to return after being cancelled.
pub const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Per-run knobs supplied by the caller.
pub struct RunOptions {
    /// Upper bound for a single probe. `None` lets probes run to completion.
    pub timeout: Option<Duration>,
    /// Extra wait for a timed-out probe before the next check starts.
    pub grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            grace: DEFAULT_TIMEOUT_GRACE,
        }
    }
}

impl RunOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn time_limit(&self) -> Option<TimeLimit> {
        self.timeout.map(|timeout| TimeLimit {
            timeout,
            grace: self.grace,
        })
    }
}

#[derive(Debug, Clone, Default)]
/// Cooperative stop signal checked between checks.
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Registry of checks bound to the namespace they probe.
pub struct Harness {
    registry: CheckRegistry,
    namespace: Arc<dyn Namespace>,
    options: RunOptions,
}

impl Harness {
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self {
            registry: CheckRegistry::new(),
            namespace,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// The injected namespace, for probes that need to look values up again.
    pub fn namespace(&self) -> &Arc<dyn Namespace> {
        &self.namespace
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Add or replace a check. The probe is not executed here.
    pub fn register(&mut self, definition: CheckDefinition) {
        self.registry.register(definition);
    }

    /// Resolve a dotted identifier against the injected namespace.
    pub fn resolve_identifier(&self, path: &str) -> Option<Value> {
        resolve_identifier(self.namespace.as_ref(), path)
    }

    /// Run a single check with full fault isolation.
    ///
    /// A namespace that panics while resolving the name or an alias is
    /// treated as not providing it, so the check is skipped or the alias is
    /// reported missing.
    pub fn run_one(&self, definition: &CheckDefinition) -> CheckResult {
        let outcome = self.primary_outcome(definition);
        let missing_aliases = self.missing_aliases(definition);

        tracing::debug!(
            check = %definition.name,
            outcome = outcome.label(),
            missing_aliases = missing_aliases.len(),
            "check finished"
        );

        CheckResult {
            name: definition.name.clone(),
            category: definition.category.clone(),
            outcome,
            missing_aliases,
        }
    }

    /// Run every registered check in registration order.
    pub fn run(&self) -> Report {
        self.run_until(&CancelToken::new())
    }

    /// Run checks until `cancel` fires; results gathered so far are kept.
    pub fn run_until(&self, cancel: &CancelToken) -> Report {
        let registered = self.registry.len();
        let mut results = Vec::with_capacity(registered);
        let mut cancelled = false;

        for definition in self.registry.iter() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    completed = results.len(),
                    registered,
                    "run cancelled; returning partial report"
                );
                cancelled = true;
                break;
            }
            results.push(self.run_one(definition));
        }

        Report {
            registered,
            cancelled,
            results,
        }
    }

    fn primary_outcome(&self, definition: &CheckDefinition) -> CheckOutcome {
        if self.resolve_identifier(&definition.name).is_none() {
            return CheckOutcome::skipped(NOT_FOUND_REASON);
        }
        let Some(thunk) = definition.probe.as_ref() else {
            return CheckOutcome::passed(None);
        };

        match probe::execute(thunk, &definition.name, self.options.time_limit()) {
            Ok(detail) => CheckOutcome::passed(detail),
            Err(failure) => {
                if failure.is_timeout() {
                    tracing::warn!(check = %definition.name, timeout = ?self.options.timeout, "probe timed out");
                } else {
                    tracing::debug!(check = %definition.name, reason = %failure, "probe failed");
                }
                CheckOutcome::from(failure)
            }
        }
    }

    fn missing_aliases(&self, definition: &CheckDefinition) -> BTreeSet<String> {
        definition
            .aliases
            .iter()
            .filter(|alias| self.resolve_identifier(alias).is_none())
            .cloned()
            .collect()
    }
}
