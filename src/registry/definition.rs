//! Definition of a single named check.

use crate::probe::{Probe, ProbeVerdict};
use std::fmt;

/// Category applied when a definition does not name one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Clone)]
/// One capability to look for, plus how to exercise it once found.
///
/// `name` and every alias are dotted identifiers resolved against the
/// harness namespace. Without a probe, a resolvable `name` is enough to pass.
pub struct CheckDefinition {
    pub name: String,
    pub category: String,
    pub aliases: Vec<String>,
    pub probe: Option<Probe>,
}

impl CheckDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            aliases: Vec::new(),
            probe: None,
        }
    }

    /// Set the grouping label; a blank label keeps the default bucket.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() {
            self.category = category;
        }
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Attach a probe closure; see [`Probe::new`] for the accepted returns.
    pub fn probe<F, V>(self, probe: F) -> Self
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
        V: Into<ProbeVerdict>,
    {
        self.with_probe(Probe::new(probe))
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = Some(probe);
        self
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("aliases", &self.aliases)
            .field("has_probe", &self.probe.is_some())
            .finish()
    }
}
