//! Contradiction detection.
//!
//! Responsibilities:
//! - Pair rules of opposed polarity and equal strength on the same subject
//! - Honor configured scope qualifiers when pairing
//! - Surface explicit `contradicts <id>` markers
//!
//! Non-responsibilities:
//! - Meaning-level reasoning; similarity is lexical only
//!
//! Policy:
//!
//!   - MUST vs MUST NOT            → HARD_FAIL RULE_CONTRADICTION
//!   - SHOULD vs SHOULD NOT        → WARN RULE_CONTRADICTION_SOFT
//!   - explicit `contradicts <id>` → HARD_FAIL RULE_CONTRADICTION
//!   - MAY                         → never contradicts
//!
//! Each unordered pair is reported at most once, with ids sorted, so the
//! output does not depend on document or line order.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::extract::model::{Location, Rule, Strength};
use crate::extract::subject::jaccard;
use crate::report::model::{Finding, Level};
use crate::util::deterministic::sorted_pair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Explicit,
    Hard,
    Soft,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Explicit => "explicit",
            Kind::Hard => "hard",
            Kind::Soft => "soft",
        }
    }
}

fn opposition(a: Strength, b: Strength) -> Option<Kind> {
    use Strength::*;
    match (a, b) {
        (ObligatoryPositive, ObligatoryNegative) | (ObligatoryNegative, ObligatoryPositive) => {
            Some(Kind::Hard)
        }
        (AdvisoryPositive, AdvisoryNegative) | (AdvisoryNegative, AdvisoryPositive) => {
            Some(Kind::Soft)
        }
        _ => None,
    }
}

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let rules = &ctx.corpus.rules;
    let threshold = ctx.config.analysis.similarity_threshold;

    // Sorted id pair -> finding; BTreeMap keeps output order stable.
    let mut found: BTreeMap<(String, String), Finding> = BTreeMap::new();

    let mut declared: HashMap<&str, &Location> = HashMap::new();
    for rule in rules {
        declared.entry(rule.id.as_str()).or_insert(&rule.location);
    }
    for unkeyed in &ctx.corpus.unkeyed {
        declared.entry(unkeyed.id.as_str()).or_insert(&unkeyed.location);
    }

    for reference in ctx.corpus.references.iter().filter(|r| r.contradicts) {
        let Some(from) = reference.from.as_deref() else {
            continue;
        };
        // Undeclared targets are reported by lint.
        let Some(target_location) = declared.get(reference.target.as_str()) else {
            continue;
        };
        let (a, b) = sorted_pair(from, &reference.target);
        let key = (a.to_string(), b.to_string());
        if found.contains_key(&key) {
            continue;
        }
        let finding = Finding::hard_fail(
            Code::RuleContradiction,
            Detector::Contradiction,
            format!("{from} declares that it contradicts {}", reference.target),
        )
        .with_details(json!({
            "kind": Kind::Explicit.as_str(),
            "rule_ids": [a, b],
            "locations": [&reference.location, target_location],
        }));
        found.insert(key, finding);
    }

    for (i, left) in rules.iter().enumerate() {
        for right in &rules[i + 1..] {
            if left.id == right.id {
                continue;
            }
            let Some(kind) = opposition(left.strength(), right.strength()) else {
                continue;
            };
            if left.qualifiers != right.qualifiers {
                continue;
            }
            let similarity = jaccard(&left.tokens, &right.tokens);
            if similarity < threshold {
                continue;
            }

            let (a, b) = ordered(left, right);
            let key = (a.id.clone(), b.id.clone());
            if found.contains_key(&key) {
                continue;
            }
            found.insert(key, implicit(ctx, kind, a, b, similarity));
        }
    }

    found.into_values().collect()
}

fn ordered<'a>(x: &'a Rule, y: &'a Rule) -> (&'a Rule, &'a Rule) {
    if (&x.id, &x.location) <= (&y.id, &y.location) {
        (x, y)
    } else {
        (y, x)
    }
}

fn implicit(ctx: &CheckContext, kind: Kind, a: &Rule, b: &Rule, similarity: f64) -> Finding {
    let (level, code) = match kind {
        Kind::Soft => (Level::Warn, Code::RuleContradictionSoft),
        _ => (Level::HardFail, Code::RuleContradiction),
    };
    let subjects = [ctx.redact(&a.subject), ctx.redact(&b.subject)];
    Finding::new(
        level,
        code,
        Detector::Contradiction,
        format!(
            "{} ({}) and {} ({}) conflict on subject \"{}\"",
            a.id, a.keyword, b.id, b.keyword, subjects[0]
        ),
    )
    .with_details(json!({
        "kind": kind.as_str(),
        "rule_ids": [&a.id, &b.id],
        "keywords": [a.keyword, b.keyword],
        "subjects": subjects,
        "similarity": (similarity * 1000.0).round() / 1000.0,
        "qualifiers": &a.qualifiers,
        "locations": [&a.location, &b.location],
    }))
}
