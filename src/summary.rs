//! Scoring a report: counts, success rates, categories and rank.
//!
//! [`summarize`] is a pure function of a [`Report`] and a [`RankPolicy`].
//! Success rate is `passed / (passed + failed)` in percent; skipped checks are
//! left out of the denominator, and an empty denominator yields `0.0` rather
//! than NaN. The rank table is data so alternate policies can be loaded from
//! JSON without touching the harness.

use crate::report::{CheckOutcome, Report};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DEFAULT_TIERS: &[(f64, &str)] = &[
    (95.0, "Top Tier"),
    (85.0, "Excellent"),
    (75.0, "Very Good"),
    (65.0, "Good"),
    (50.0, "Average"),
    (35.0, "Below Average"),
];
const DEFAULT_FALLBACK: &str = "Lacking";

/// Percentage of decided checks that passed; `0.0` when nothing was decided.
pub fn success_rate(passed: usize, failed: usize) -> f64 {
    let decided = passed + failed;
    if decided == 0 {
        return 0.0;
    }
    passed as f64 * 100.0 / decided as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Minimum success rate (percent) a run needs to earn `label`.
pub struct RankTier {
    pub min_rate: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RankPolicyFile")]
/// Threshold table mapping a success rate to a rank label.
///
/// Tiers are kept sorted by descending threshold; the first tier the rate
/// reaches wins, and rates below every tier get `fallback`.
pub struct RankPolicy {
    tiers: Vec<RankTier>,
    fallback: String,
}

#[derive(Deserialize)]
struct RankPolicyFile {
    tiers: Vec<RankTier>,
    fallback: String,
}

impl TryFrom<RankPolicyFile> for RankPolicy {
    type Error = anyhow::Error;

    fn try_from(file: RankPolicyFile) -> Result<Self> {
        RankPolicy::new(file.tiers, file.fallback)
    }
}

impl RankPolicy {
    /// Validate and sort a tier table.
    pub fn new(mut tiers: Vec<RankTier>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        if fallback.trim().is_empty() {
            bail!("rank policy fallback label must not be empty");
        }
        for tier in &tiers {
            if tier.label.trim().is_empty() {
                bail!("rank tier at {} has an empty label", tier.min_rate);
            }
            if !tier.min_rate.is_finite() || !(0.0..=100.0).contains(&tier.min_rate) {
                bail!(
                    "rank tier '{}' threshold {} must be between 0 and 100",
                    tier.label,
                    tier.min_rate
                );
            }
        }
        tiers.sort_by(|a, b| b.min_rate.total_cmp(&a.min_rate));
        Ok(Self { tiers, fallback })
    }

    /// Read a policy from a JSON file shaped like `{"tiers": [...], "fallback": "..."}`.
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening rank policy {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing rank policy {}", path.display()))
    }

    /// Pick the label for `rate`.
    pub fn classify(&self, rate: f64) -> &str {
        self.tiers
            .iter()
            .find(|tier| rate >= tier.min_rate)
            .map(|tier| tier.label.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for RankPolicy {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|(min_rate, label)| RankTier {
                    min_rate: *min_rate,
                    label: (*label).to_string(),
                })
                .collect(),
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Outcome counts plus the success rate derived from them.
pub struct Tally {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
    pub success_rate: f64,
}

impl Tally {
    fn record(&mut self, outcome: &CheckOutcome) {
        self.total += 1;
        match outcome {
            CheckOutcome::Passed { .. } => self.passed += 1,
            CheckOutcome::Failed { timed_out, .. } => {
                self.failed += 1;
                if *timed_out {
                    self.timed_out += 1;
                }
            }
            CheckOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.success_rate = success_rate(self.passed, self.failed);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    #[serde(flatten)]
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Everything a report sink needs to print a verdict.
pub struct ReportSummary {
    #[serde(flatten)]
    pub overall: Tally,
    pub missing_aliases: usize,
    pub rank: String,
    pub registered: usize,
    pub cancelled: bool,
    /// Per-category tallies in first-seen order.
    pub categories: Vec<CategorySummary>,
}

/// Compute the summary of `report` under `policy`.
pub fn summarize(report: &Report, policy: &RankPolicy) -> ReportSummary {
    let mut overall = Tally::default();
    let mut categories: Vec<CategorySummary> = Vec::new();

    for result in &report.results {
        overall.record(&result.outcome);
        let slot = match categories
            .iter()
            .position(|entry| entry.category == result.category)
        {
            Some(slot) => slot,
            None => {
                categories.push(CategorySummary {
                    category: result.category.clone(),
                    tally: Tally::default(),
                });
                categories.len() - 1
            }
        };
        categories[slot].tally.record(&result.outcome);
    }

    ReportSummary {
        rank: policy.classify(overall.success_rate).to_string(),
        overall,
        missing_aliases: report.missing_alias_count(),
        registered: report.registered,
        cancelled: report.cancelled,
        categories,
    }
}
