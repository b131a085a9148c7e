//! Serializable results of a harness run.
//!
//! A [`Report`] is plain data: one [`CheckResult`] per executed check, in
//! registration order. Counts are derived on demand so a report can never
//! disagree with itself. The JSON form produced here is what `capprobe run
//! --format json` prints and `capprobe listen` reads back.

use crate::probe::ProbeFailure;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Skip reason recorded when a check's primary identifier does not resolve.
pub const NOT_FOUND_REASON: &str = "identifier not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Classification of one check.
pub enum CheckOutcome {
    Passed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "is_false")]
        timed_out: bool,
    },
    Skipped {
        reason: String,
    },
}

impl CheckOutcome {
    pub fn passed(detail: Option<String>) -> Self {
        CheckOutcome::Passed { detail }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CheckOutcome::Failed {
            reason: reason.into(),
            timed_out: false,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        CheckOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CheckOutcome::Skipped { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, CheckOutcome::Failed { timed_out: true, .. })
    }

    /// Short status word used in renders and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Passed { .. } => "passed",
            CheckOutcome::Failed { .. } => "failed",
            CheckOutcome::Skipped { .. } => "skipped",
        }
    }
}

impl From<ProbeFailure> for CheckOutcome {
    fn from(failure: ProbeFailure) -> Self {
        CheckOutcome::Failed {
            timed_out: failure.is_timeout(),
            reason: failure.to_string(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Result of running one check; never mutated after the harness builds it.
pub struct CheckResult {
    pub name: String,
    pub category: String,
    pub outcome: CheckOutcome,
    /// Aliases that did not resolve, independent of `outcome`.
    #[serde(default)]
    pub missing_aliases: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ordered results of one run.
///
/// `registered` is the number of checks registered when the run started; a
/// cancelled run carries fewer results than that, never more.
pub struct Report {
    pub registered: usize,
    #[serde(default)]
    pub cancelled: bool,
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.count(CheckOutcome::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckOutcome::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CheckOutcome::is_skipped)
    }

    pub fn timed_out(&self) -> usize {
        self.count(CheckOutcome::is_timed_out)
    }

    /// Sum of unresolved aliases across every result.
    pub fn missing_alias_count(&self) -> usize {
        self.results
            .iter()
            .map(|result| result.missing_aliases.len())
            .sum()
    }

    /// Look up a result by check name.
    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|result| result.name == name)
    }

    /// Reject reports no run could have produced, e.g. ones read back from
    /// hand-edited JSON.
    ///
    /// A finished run has one result per registered check; a cancelled run
    /// has at most that many.
    pub fn ensure_consistent(&self) -> Result<()> {
        let total = self.total();
        if total > self.registered {
            bail!(
                "report has {total} results but only {} checks were registered",
                self.registered
            );
        }
        if !self.cancelled && total != self.registered {
            bail!(
                "report is not cancelled but has {total} results for {} registered checks",
                self.registered
            );
        }
        Ok(())
    }

    fn count(&self, predicate: impl Fn(&CheckOutcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| predicate(&result.outcome))
            .count()
    }
}
