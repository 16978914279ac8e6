//! Budget ceilings and memory metadata.
//!
//! Pure counting: the one structural check that is exact rather than
//! inferred, so every violation fails the gate.

use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::report::model::Finding;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let corpus = &ctx.corpus;
    let budget = &corpus.sources.budget;

    let counts = [
        ("rules", corpus.distinct_rule_ids().len(), budget.max_rules),
        ("agents", corpus.sources.agent_count, budget.max_agents),
        (
            "memory_artifacts",
            corpus.sources.memory_artifacts.len(),
            budget.max_memory_artifacts,
        ),
    ];

    let mut findings: Vec<Finding> = counts
        .into_iter()
        .filter_map(|(resource, count, ceiling)| {
            let ceiling = ceiling.filter(|c| count > *c)?;
            Some(
                Finding::hard_fail(
                    Code::BudgetOverflow,
                    Detector::Budget,
                    format!("{resource} budget exceeded: {count} > {ceiling}"),
                )
                .with_details(json!({
                    "resource": resource,
                    "count": count,
                    "ceiling": ceiling,
                })),
            )
        })
        .collect();

    for artifact in &corpus.sources.memory_artifacts {
        let text = artifact.text.to_lowercase();
        let missing: Vec<&str> = budget
            .memory_required_metadata
            .iter()
            .map(String::as_str)
            .filter(|field| !text.contains(&field.to_lowercase()))
            .collect();
        if missing.is_empty() {
            continue;
        }
        findings.push(
            Finding::hard_fail(
                Code::MemoryMetadataMissing,
                Detector::Budget,
                format!(
                    "memory artifact {} is missing required metadata: {}",
                    artifact.path,
                    missing.join(", ")
                ),
            )
            .with_details(json!({ "path": artifact.path, "missing": missing })),
        );
    }

    findings
}
