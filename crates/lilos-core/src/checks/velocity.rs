//! Rule growth velocity.
//!
//! Rule additions and removals are bucketed into two back-to-back windows
//! ending at `today`. Net growth in both is the accretion signal.

use chrono::{Duration, NaiveDate};
use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::extract::lineage::{RuleDelta, rule_timeline};
use crate::report::model::Finding;
use crate::source::history::FileHistory;

/// Additions and removals inside `(start, end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Window {
    start: NaiveDate,
    end: NaiveDate,
    added: usize,
    removed: usize,
}

impl Window {
    fn tally(start: NaiveDate, end: NaiveDate, deltas: &[RuleDelta]) -> Self {
        let inside = deltas.iter().filter(|d| d.date > start && d.date <= end);
        let (added, removed) = inside.fold((0, 0), |(a, r), d| (a + d.added.len(), r + d.removed.len()));
        Self {
            start,
            end,
            added,
            removed,
        }
    }

    fn net_growth(&self) -> bool {
        self.added > self.removed
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "after": self.start,
            "through": self.end,
            "added": self.added,
            "removed": self.removed,
        })
    }
}

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let sources = &ctx.corpus.sources;
    if let Some(reason) = sources.history.unavailable_reason() {
        return vec![
            Finding::info(
                Code::RuleVelocitySkipped,
                Detector::Velocity,
                "rule growth velocity not evaluated: commit history unavailable",
            )
            .with_details(json!({ "reason": reason })),
        ];
    }

    let files: Vec<&FileHistory> = sources
        .rule_documents
        .iter()
        .filter_map(|doc| sources.history.file(&doc.path))
        .collect();
    let deltas = rule_timeline(&files, &ctx.matchers);

    let days = i64::from(ctx.config.windows.velocity_days);
    let today = sources.today;
    let back = |n: i64| {
        today
            .checked_sub_signed(Duration::days(n))
            .unwrap_or(NaiveDate::MIN)
    };
    let current = Window::tally(back(days), today, &deltas);
    let previous = Window::tally(back(2 * days), current.start, &deltas);

    if !(current.net_growth() && previous.net_growth()) {
        return Vec::new();
    }

    vec![
        Finding::warn(
            Code::RuleAccretion,
            Detector::Velocity,
            format!(
                "rules grew in two consecutive {days}-day windows (+{} -{}, then +{} -{})",
                previous.added, previous.removed, current.added, current.removed
            ),
        )
        .with_details(json!({
            "window_days": days,
            "previous": previous.to_json(),
            "current": current.to_json(),
        })),
    ]
}
