//! Automation-creep detection.
//!
//! A decision entry that both describes automation and names a domain the
//! budget forbids automating is flagged for human review. Prose matching is
//! imprecise, so this never fails the gate.

use serde_json::json;
use tracing::warn;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::report::model::Finding;
use crate::util::terms::TermSet;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let domains = match TermSet::new(&ctx.corpus.sources.budget.forbidden_automation_domains) {
        Ok(domains) => domains,
        Err(e) => {
            warn!("forbidden automation domains could not be compiled: {e}");
            return Vec::new();
        }
    };
    if domains.is_empty() {
        return Vec::new();
    }

    ctx.corpus
        .decisions
        .iter()
        .filter_map(|entry| {
            let indicators = ctx.matchers.automation_indicators.found(&entry.body);
            if indicators.is_empty() {
                return None;
            }
            let matched = domains.found(&entry.body);
            if matched.is_empty() {
                return None;
            }
            Some(
                Finding::warn(
                    Code::AutomationCreep,
                    Detector::AutomationCreep,
                    format!(
                        "decision entry dated {} describes automation touching a forbidden domain ({})",
                        display_date(&entry.date_raw),
                        matched.join(", ")
                    ),
                )
                .with_details(json!({
                    "entry_index": entry.index,
                    "entry_date": entry.date_raw,
                    "line": entry.line,
                    "commit": entry.commit_hash,
                    "automation_terms": indicators,
                    "forbidden_domains": matched,
                })),
            )
        })
        .collect()
}

fn display_date(raw: &str) -> &str {
    if raw.is_empty() { "(undated)" } else { raw }
}
