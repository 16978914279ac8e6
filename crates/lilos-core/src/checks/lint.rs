//! Rule lint: identifier uniqueness, keyword presence and reference hygiene.
//!
//! Responsibilities:
//! - Fail on ids declared more than once
//! - Fail on declarations without a normative keyword
//! - Warn on identical rule text under different ids
//! - Fail on references to ids that are never declared
//!
//! Non-responsibilities:
//! - Judging rule meaning (handled in `checks::contradiction`)

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use crate::checks::catalog::{Code, Detector};
use crate::checks::{CheckContext, excerpt};
use crate::extract::model::Location;
use crate::report::model::Finding;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let corpus = &ctx.corpus;
    let mut findings = Vec::new();

    // Every declaration site per id, keyed or not.
    let mut sites: BTreeMap<&str, Vec<&Location>> = BTreeMap::new();
    for rule in &corpus.rules {
        sites.entry(&rule.id).or_default().push(&rule.location);
    }
    for unkeyed in &corpus.unkeyed {
        sites.entry(&unkeyed.id).or_default().push(&unkeyed.location);
    }

    if sites.is_empty() {
        let documents: Vec<&str> = corpus
            .sources
            .rule_documents
            .iter()
            .map(|d| d.path.as_str())
            .collect();
        findings.push(
            Finding::warn(
                Code::NoRulesFound,
                Detector::Lint,
                "no rule declarations found in the scanned rule documents",
            )
            .with_details(json!({ "documents": documents })),
        );
    }

    for (id, locations) in sites.iter().filter(|(_, l)| l.len() > 1) {
        let mut locations = locations.clone();
        locations.sort();
        findings.push(
            Finding::hard_fail(
                Code::DuplicateRuleId,
                Detector::Lint,
                format!("rule id {id} is declared {} times", locations.len()),
            )
            .with_details(json!({ "rule_id": id, "locations": locations })),
        );
    }

    for unkeyed in &corpus.unkeyed {
        findings.push(
            Finding::hard_fail(
                Code::MissingNormativeKeyword,
                Detector::Lint,
                format!(
                    "rule {} at {}:{} has no normative keyword (MUST, MUST NOT, SHOULD, SHOULD NOT, MAY)",
                    unkeyed.id, unkeyed.location.file, unkeyed.location.line
                ),
            )
            .with_details(json!({
                "rule_id": unkeyed.id,
                "location": unkeyed.location,
                "line": excerpt(&ctx.redact(&unkeyed.text), 240),
            })),
        );
    }

    // Identical text under different ids.
    let mut by_text: BTreeMap<String, Vec<(&str, &Location)>> = BTreeMap::new();
    for rule in &corpus.rules {
        let normalized = normalize_text(&rule.text, &rule.id);
        if !normalized.is_empty() {
            by_text.entry(normalized).or_default().push((&rule.id, &rule.location));
        }
    }
    for (text, group) in &by_text {
        let ids: BTreeSet<&str> = group.iter().map(|(id, _)| *id).collect();
        if ids.len() < 2 {
            continue;
        }
        let locations: Vec<&Location> = group.iter().map(|(_, l)| *l).collect();
        findings.push(
            Finding::warn(
                Code::DuplicateRuleText,
                Detector::Lint,
                format!("{} rule ids share identical text", ids.len()),
            )
            .with_details(json!({
                "rule_ids": ids,
                "text": excerpt(&ctx.redact(text), 240),
                "locations": locations,
            })),
        );
    }

    // References to ids never declared.
    let mut dangling: BTreeMap<&str, Vec<&Location>> = BTreeMap::new();
    for reference in &corpus.references {
        if !sites.contains_key(reference.target.as_str()) {
            dangling
                .entry(&reference.target)
                .or_default()
                .push(&reference.location);
        }
    }
    for (target, locations) in dangling {
        findings.push(
            Finding::hard_fail(
                Code::DanglingRuleReference,
                Detector::Lint,
                format!("rule id {target} is referenced but never declared"),
            )
            .with_details(json!({ "rule_id": target, "referenced_at": locations })),
        );
    }

    findings
}

/// Line text without its declared id, lowercased, whitespace collapsed.
fn normalize_text(text: &str, id: &str) -> String {
    let without_id = text.replace(&format!("[{id}]"), " ");
    let trimmed = without_id
        .trim()
        .trim_start_matches(['-', '*', '+'])
        .to_lowercase();
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
