//! Deterministic ordering helpers.
//!
//! Reports must be byte-identical for identical inputs, regardless of how
//! detectors were scheduled or in which order files were read.

use crate::report::model::Finding;

/// Findings in console order: severity descending, then detector order.
///
/// The sort is stable, so findings of the same severity and detector keep
/// the order their detector produced them in.
pub fn display_order(findings: &[Finding]) -> Vec<&Finding> {
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by(|a, b| b.level.cmp(&a.level).then(a.detector.cmp(&b.detector)));
    ordered
}

/// Order a pair of identifiers canonically so `(a, b)` and `(b, a)` agree.
pub fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}
