//! Plain-text rendering of a report and its summary.
//!
//! Output stays text-only so it can sit at the end of a pipeline like
//! `capprobe run --format json ... | capprobe listen`.

use crate::report::{CheckOutcome, CheckResult, Report};
use crate::summary::{ReportSummary, Tally};
use std::fmt;

const MAX_DETAIL_CHARS: usize = 160;

/// Render `summary` followed by one block per result.
pub fn render_report(
    report: &Report,
    summary: &ReportSummary,
    writer: &mut impl fmt::Write,
) -> fmt::Result {
    render_summary(summary, writer)?;
    writeln!(writer)?;
    for (idx, result) in report.results.iter().enumerate() {
        render_result(idx + 1, result, writer)?;
    }
    if !summary.categories.is_empty() {
        render_categories(summary, writer)?;
    }
    Ok(())
}

fn render_summary(summary: &ReportSummary, writer: &mut impl fmt::Write) -> fmt::Result {
    let overall = &summary.overall;
    writeln!(writer, "capability report")?;
    writeln!(writer, "=================")?;
    writeln!(writer, "total checks   : {}", overall.total)?;
    writeln!(writer, "passed         : {}", overall.passed)?;
    writeln!(
        writer,
        "failed         : {} (timed out: {})",
        overall.failed, overall.timed_out
    )?;
    writeln!(writer, "skipped        : {}", overall.skipped)?;
    writeln!(writer, "missing aliases: {}", summary.missing_aliases)?;
    writeln!(writer, "success rate   : {:.1}%", overall.success_rate)?;
    writeln!(writer, "rank           : {}", summary.rank)?;
    if summary.cancelled {
        writeln!(
            writer,
            "note           : run cancelled after {} of {} checks",
            overall.total, summary.registered
        )?;
    }
    Ok(())
}

fn render_result(idx: usize, result: &CheckResult, writer: &mut impl fmt::Write) -> fmt::Result {
    writeln!(
        writer,
        "[#{}] {:<7} {} ({})",
        idx,
        result.outcome.label(),
        result.name,
        result.category
    )?;
    match &result.outcome {
        CheckOutcome::Passed {
            detail: Some(detail),
        } => writeln!(writer, "  detail: {}", truncate_line(detail))?,
        CheckOutcome::Passed { detail: None } => {}
        CheckOutcome::Failed { reason, .. } | CheckOutcome::Skipped { reason } => {
            writeln!(writer, "  reason: {}", truncate_line(reason))?
        }
    }
    if !result.missing_aliases.is_empty() {
        let aliases: Vec<&str> = result.missing_aliases.iter().map(String::as_str).collect();
        writeln!(writer, "  missing aliases: {}", aliases.join(", "))?;
    }
    Ok(())
}

fn render_categories(summary: &ReportSummary, writer: &mut impl fmt::Write) -> fmt::Result {
    writeln!(writer)?;
    writeln!(writer, "categories")?;
    writeln!(writer, "----------")?;
    let width = summary
        .categories
        .iter()
        .map(|entry| entry.category.chars().count())
        .max()
        .unwrap_or(0);
    for entry in &summary.categories {
        writeln!(
            writer,
            "{:<width$}  {}",
            entry.category,
            format_tally(&entry.tally),
            width = width
        )?;
    }
    Ok(())
}

fn format_tally(tally: &Tally) -> String {
    format!(
        "passed={} failed={} skipped={} rate={:.1}%",
        tally.passed, tally.failed, tally.skipped, tally.success_rate
    )
}

fn truncate_line(line: &str) -> String {
    let clean = line.lines().next().unwrap_or("").trim_end();
    if clean.chars().count() <= MAX_DETAIL_CHARS {
        return clean.to_string();
    }
    let mut shortened: String = clean.chars().take(MAX_DETAIL_CHARS - 1).collect();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{RankPolicy, summarize};

    fn sample_report() -> Report {
        Report {
            registered: 4,
            cancelled: true,
            results: vec![
                CheckResult {
                    name: "alpha".into(),
                    category: "Core".into(),
                    outcome: CheckOutcome::passed(Some("v1".into())),
                    missing_aliases: ["alpha_alias".to_string()].into_iter().collect(),
                },
                CheckResult {
                    name: "beta".into(),
                    category: "Crypt".into(),
                    outcome: CheckOutcome::failed("probe returned false"),
                    missing_aliases: Default::default(),
                },
                CheckResult {
                    name: "gamma".into(),
                    category: "Core".into(),
                    outcome: CheckOutcome::skipped("identifier not found"),
                    missing_aliases: Default::default(),
                },
            ],
        }
    }

    #[test]
    fn renders_summary_results_and_categories() {
        let report = sample_report();
        let summary = summarize(&report, &RankPolicy::default());
        let mut output = String::new();
        render_report(&report, &summary, &mut output).expect("render");

        assert!(output.contains("total checks   : 3"));
        assert!(output.contains("success rate   : 50.0%"));
        assert!(output.contains("rank           : Average"));
        assert!(output.contains("run cancelled after 3 of 4 checks"));
        assert!(output.contains("[#1] passed  alpha (Core)"));
        assert!(output.contains("  detail: v1"));
        assert!(output.contains("  missing aliases: alpha_alias"));
        assert!(output.contains("[#2] failed  beta (Crypt)"));
        assert!(output.contains("  reason: probe returned false"));
        assert!(output.contains("Core   passed=1 failed=0 skipped=1 rate=100.0%"));
        assert!(output.contains("Crypt  passed=0 failed=1 skipped=0 rate=0.0%"));
    }

    #[test]
    fn empty_report_renders_header_only() {
        let report = Report {
            registered: 0,
            cancelled: false,
            results: Vec::new(),
        };
        let summary = summarize(&report, &RankPolicy::default());
        let mut output = String::new();
        render_report(&report, &summary, &mut output).expect("render");
        assert!(output.contains("total checks   : 0"));
        assert!(output.contains("success rate   : 0.0%"));
        assert!(!output.contains("categories"));
        assert!(!output.contains("[#1]"));
    }

    #[test]
    fn long_details_are_truncated_to_one_line() {
        let long = "x".repeat(400) + "\nsecond line";
        let shortened = truncate_line(&long);
        assert_eq!(shortened.chars().count(), MAX_DETAIL_CHARS);
        assert!(shortened.ends_with('…'));
        assert!(!shortened.contains("second"));
    }
}
