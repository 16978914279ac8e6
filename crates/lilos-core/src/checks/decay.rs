//! Decision-log completeness and decay patterns.
//!
//! Responsibilities:
//! - Count incomplete entries inside the rolling review window
//! - Flag entries whose date cannot be parsed
//! - Flag runs of entries justified by the same optimization metric
//! - Flag clusters of emergency overrides
//! - Note entries whose review date has passed
//!
//! All signals are prose heuristics; none fail the gate.

use std::collections::BTreeSet;

use chrono::Duration;
use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::extract::model::DecisionEntry;
use crate::report::model::Finding;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let entries = &ctx.corpus.decisions;
    let mut findings = Vec::new();

    let window_len = ctx.config.windows.review_entries.min(entries.len());
    let window = &entries[entries.len() - window_len..];

    findings.extend(completeness(ctx, window));
    findings.extend(malformed(ctx, entries));
    findings.extend(metric_dominance(ctx, entries));
    findings.extend(override_normalization(ctx, entries));
    findings.extend(review_overdue(ctx, window));
    findings
}

fn completeness(ctx: &CheckContext, window: &[DecisionEntry]) -> Vec<Finding> {
    let threshold = ctx.config.thresholds.justification_decay;
    let incomplete: Vec<&DecisionEntry> = window.iter().filter(|e| !e.complete).collect();
    let listed: Vec<serde_json::Value> = incomplete
        .iter()
        .map(|e| {
            json!({
                "entry_index": e.index,
                "entry_date": e.date_raw,
                "line": e.line,
                "missing": e.missing,
            })
        })
        .collect();
    let details = json!({
        "count": incomplete.len(),
        "threshold": threshold,
        "window_entries": window.len(),
        "incomplete": listed,
    });

    match incomplete.len() {
        0 => Vec::new(),
        n if n >= threshold => vec![
            Finding::warn(
                Code::JustificationDecay,
                Detector::Decay,
                format!(
                    "{n} of the last {} decision entries are missing required fields (threshold {threshold})",
                    window.len()
                ),
            )
            .with_details(details),
        ],
        _ => vec![
            Finding::info(
                Code::DecisionEntryIncomplete,
                Detector::Decay,
                format!(
                    "decision entry dated {} is missing: {}",
                    incomplete[0].date_raw,
                    incomplete[0].missing.join(", ")
                ),
            )
            .with_details(details),
        ],
    }
}

fn malformed(ctx: &CheckContext, entries: &[DecisionEntry]) -> Vec<Finding> {
    entries
        .iter()
        .filter(|e| e.date.is_none() && !e.date_raw.is_empty())
        .map(|e| {
            let date = ctx.redact(&e.date_raw);
            Finding::warn(
                Code::MalformedEntity,
                Detector::Decay,
                format!(
                    "decision entry at line {} has an unparseable date \"{}\" (expected YYYY-MM-DD)",
                    e.line, date
                ),
            )
            .with_details(json!({
                "entry_index": e.index,
                "line": e.line,
                "date": date,
            }))
        })
        .collect()
}

/// Runs of consecutive entries whose rationale or tradeoffs cite one metric.
fn metric_dominance(ctx: &CheckContext, entries: &[DecisionEntry]) -> Vec<Finding> {
    let threshold = ctx.config.thresholds.metric_dominance_consecutive;
    let cited: Vec<BTreeSet<String>> = entries
        .iter()
        .map(|e| {
            let text = format!("{}\n{}", e.rationale, e.tradeoffs);
            ctx.matchers.metric_markers.found(&text).into_iter().collect()
        })
        .collect();

    let mut metrics: Vec<&String> = Vec::new();
    for set in &cited {
        for m in set {
            if !metrics.contains(&m) {
                metrics.push(m);
            }
        }
    }

    let mut findings = Vec::new();
    for metric in metrics {
        let mut run: Vec<&DecisionEntry> = Vec::new();
        // Trailing sentinel flushes a run that reaches the end of the log.
        for (idx, set) in cited.iter().map(Some).chain([None]).enumerate() {
            if set.is_some_and(|s| s.contains(metric)) {
                run.push(&entries[idx]);
                continue;
            }
            if run.len() >= threshold {
                findings.push(
                    Finding::warn(
                        Code::MetricDominance,
                        Detector::Decay,
                        format!(
                            "{} consecutive decision entries are justified by \"{metric}\"",
                            run.len()
                        ),
                    )
                    .with_details(json!({
                        "metric": metric,
                        "consecutive": run.len(),
                        "threshold": threshold,
                        "entry_dates": run.iter().map(|e| e.date_raw.as_str()).collect::<Vec<_>>(),
                    })),
                );
            }
            run.clear();
        }
    }
    findings
}

/// The densest `override_days` span of override-tagged entries.
fn override_normalization(ctx: &CheckContext, entries: &[DecisionEntry]) -> Vec<Finding> {
    let threshold = ctx.config.thresholds.override_normalization;
    let days = i64::from(ctx.config.windows.override_days);

    let mut tagged: Vec<(chrono::NaiveDate, &DecisionEntry)> = entries
        .iter()
        .filter(|e| ctx.matchers.override_markers.any(&e.body))
        .filter_map(|e| e.date.map(|d| (d, e)))
        .collect();
    tagged.sort_by_key(|(d, e)| (*d, e.index));

    let mut best: Option<(usize, usize)> = None;
    for start in 0..tagged.len() {
        let limit = tagged[start]
            .0
            .checked_add_signed(Duration::days(days))
            .unwrap_or(chrono::NaiveDate::MAX);
        let end = tagged[start..].iter().take_while(|(d, _)| *d < limit).count() + start;
        if best.is_none_or(|(s, e)| end - start > e - s) {
            best = Some((start, end));
        }
    }

    let Some((start, end)) = best else {
        return Vec::new();
    };
    let cluster = &tagged[start..end];
    if cluster.len() < threshold {
        return Vec::new();
    }
    vec![
        Finding::warn(
            Code::OverrideNormalization,
            Detector::Decay,
            format!(
                "{} emergency overrides logged within {days} days (threshold {threshold})",
                cluster.len()
            ),
        )
        .with_details(json!({
            "count": cluster.len(),
            "window_days": days,
            "threshold": threshold,
            "entry_dates": cluster.iter().map(|(d, _)| *d).collect::<Vec<_>>(),
        })),
    ]
}

fn review_overdue(ctx: &CheckContext, window: &[DecisionEntry]) -> Vec<Finding> {
    let today = ctx.corpus.sources.today;
    window
        .iter()
        .filter_map(|e| e.review_date.filter(|r| *r < today).map(|r| (e, r)))
        .map(|(e, review)| {
            Finding::info(
                Code::ReviewOverdue,
                Detector::Decay,
                format!("decision entry dated {} was due for review on {review}", e.date_raw),
            )
            .with_details(json!({
                "entry_index": e.index,
                "entry_date": e.date_raw,
                "review_date": review,
                "days_overdue": (today - review).num_days(),
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing;
    use crate::config::EngineConfig;
    use crate::report::model::Level;

    fn entry(date: &str, tradeoffs: bool, extra: &str) -> String {
        let mut s = format!(
            "Date: {date}\nDecision: d\nTrigger: t\nRationale: r {extra}\nExpected Impact: e\n"
        );
        if tradeoffs {
            s.push_str("Tradeoffs: slower\n");
        }
        s
    }

    fn codes(findings: &[Finding]) -> Vec<Code> {
        findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn three_incomplete_entries_decay() {
        let log = [
            entry("2025-05-01", false, ""),
            entry("2025-05-02", false, ""),
            entry("2025-05-03", false, ""),
        ]
        .concat();
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::JustificationDecay]);
        assert_eq!(findings[0].level, Level::Warn);
        assert_eq!(findings[0].details["count"], 3);
        assert_eq!(findings[0].details["incomplete"][0]["missing"], json!(["Tradeoffs"]));
    }

    #[test]
    fn single_incomplete_entry_is_info() {
        let log = [entry("2025-05-01", true, ""), entry("2025-05-02", false, "")].concat();
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::DecisionEntryIncomplete]);
        assert_eq!(findings[0].level, Level::Info);
    }

    #[test]
    fn only_recent_entries_count() {
        let mut cfg = EngineConfig::default();
        cfg.windows.review_entries = 2;
        let log = [
            entry("2025-05-01", false, ""),
            entry("2025-05-02", false, ""),
            entry("2025-05-03", true, ""),
            entry("2025-05-04", true, ""),
        ]
        .concat();
        let ctx = testing::context_with(testing::sources("", &log), cfg);
        assert!(check(&ctx).is_empty());
    }

    #[test]
    fn unparseable_date_is_malformed() {
        let log = entry("someday", true, "");
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::MalformedEntity]);
    }

    #[test]
    fn metric_run_is_reported_once() {
        let log = [
            entry("2025-05-01", true, "to cut latency"),
            entry("2025-05-02", true, "latency again"),
            entry("2025-05-03", true, "p99 latency"),
            entry("2025-05-04", true, "Latency wins"),
            entry("2025-05-05", true, "readability"),
        ]
        .concat();
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::MetricDominance]);
        assert_eq!(findings[0].details["consecutive"], 4);
    }

    #[test]
    fn broken_metric_run_is_quiet() {
        let log = [
            entry("2025-05-01", true, "latency"),
            entry("2025-05-02", true, "latency"),
            entry("2025-05-03", true, "clarity"),
            entry("2025-05-04", true, "latency"),
        ]
        .concat();
        assert!(check(&testing::context("", &log)).is_empty());
    }

    #[test]
    fn clustered_overrides_warn() {
        let log = [
            entry("2025-01-01", true, "emergency override"),
            entry("2025-04-01", true, "Emergency Override of freeze"),
            entry("2025-04-20", true, "emergency override again"),
        ]
        .concat();
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::OverrideNormalization]);
        assert_eq!(findings[0].details["count"], 2);
    }

    #[test]
    fn spread_out_overrides_are_quiet() {
        let log = [
            entry("2025-01-01", true, "emergency override"),
            entry("2025-03-01", true, "emergency override"),
        ]
        .concat();
        assert!(check(&testing::context("", &log)).is_empty());
    }

    #[test]
    fn past_review_date_is_noted() {
        let log = format!("{}Review Date: 2025-05-01\n", entry("2025-01-01", true, ""));
        let findings = check(&testing::context("", &log));
        assert_eq!(codes(&findings), vec![Code::ReviewOverdue]);
        assert_eq!(findings[0].details["days_overdue"], 31);
    }
}
