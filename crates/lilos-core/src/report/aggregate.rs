//! Report aggregation.
//!
//! This module merges per-detector findings and derives the overall verdict.
//!
//! Responsibilities:
//! - Concatenate findings in detector declaration order
//! - Roll severities up into a single status
//! - Compute CI-compatible exit codes
//!
//! Non-responsibilities:
//! - Running detectors (handled in `checks::battery`)
//! - Rendering (handled in `report::render`)
//!
//! The rollup policy is deliberately plain:
//!
//!   - Any HARD_FAIL finding → HARD_FAIL
//!   - Else any WARN         → WARN
//!   - Else                  → OK
//!
//! Exit code mapping: OK and WARN → 0, HARD_FAIL → 1. CI gating depends on it.

use serde::{Deserialize, Serialize};

use crate::checks::catalog::Detector;
use crate::report::model::{Finding, Level, Status};

/// Finding counts per level.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub hard_fail: usize,
    pub warn: usize,
    pub info: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub status: Status,
    pub exit_code: i32,
    pub summary: Summary,
}

/// Derive status, exit code and counts from a finding list.
///
/// Independent of finding order.
pub fn rollup(findings: &[Finding]) -> Rollup {
    let mut summary = Summary {
        total: findings.len(),
        ..Default::default()
    };
    for f in findings {
        match f.level {
            Level::HardFail => summary.hard_fail += 1,
            Level::Warn => summary.warn += 1,
            Level::Info => summary.info += 1,
        }
    }

    let status = match findings.iter().map(|f| f.level).max() {
        Some(Level::HardFail) => Status::HardFail,
        Some(Level::Warn) => Status::Warn,
        _ => Status::Ok,
    };

    Rollup {
        status,
        exit_code: exit_code(status),
        summary,
    }
}

pub fn exit_code(status: Status) -> i32 {
    match status {
        Status::Ok | Status::Warn => 0,
        Status::HardFail => 1,
    }
}

/// Concatenate per-detector batches in declared detector order.
///
/// Batches may arrive in any order (detectors run concurrently); the result
/// only depends on their contents.
pub fn merge(mut batches: Vec<(Detector, Vec<Finding>)>) -> Vec<Finding> {
    batches.sort_by_key(|(detector, _)| *detector);
    batches.into_iter().flat_map(|(_, f)| f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::catalog::Code;

    fn f(level: Level, code: Code, detector: Detector) -> Finding {
        Finding::new(level, code, detector, "m")
    }

    #[test]
    fn empty_is_ok() {
        let r = rollup(&[]);
        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.summary.total, 0);
    }

    #[test]
    fn info_only_is_ok() {
        let r = rollup(&[f(Level::Info, Code::ReviewOverdue, Detector::Decay)]);
        assert_eq!(r.status, Status::Ok);
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn warn_does_not_fail_the_gate() {
        let r = rollup(&[
            f(Level::Info, Code::ReviewOverdue, Detector::Decay),
            f(Level::Warn, Code::AutomationCreep, Detector::AutomationCreep),
        ]);
        assert_eq!(r.status, Status::Warn);
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.summary.warn, 1);
    }

    #[test]
    fn any_hard_fail_fails() {
        let r = rollup(&[
            f(Level::Warn, Code::AutomationCreep, Detector::AutomationCreep),
            f(Level::HardFail, Code::SecretDetected, Detector::Secrets),
            f(Level::Info, Code::ReviewOverdue, Detector::Decay),
        ]);
        assert_eq!(r.status, Status::HardFail);
        assert_eq!(r.exit_code, 1);
        assert_eq!(
            r.summary,
            Summary {
                hard_fail: 1,
                warn: 1,
                info: 1,
                total: 3
            }
        );
    }

    #[test]
    fn merge_orders_by_detector_declaration() {
        let merged = merge(vec![
            (
                Detector::Secrets,
                vec![f(Level::HardFail, Code::SecretDetected, Detector::Secrets)],
            ),
            (
                Detector::Lint,
                vec![f(Level::HardFail, Code::DuplicateRuleId, Detector::Lint)],
            ),
            (
                Detector::Decay,
                vec![f(Level::Info, Code::ReviewOverdue, Detector::Decay)],
            ),
        ]);
        let order: Vec<Detector> = merged.iter().map(|f| f.detector).collect();
        assert_eq!(order, vec![Detector::Lint, Detector::Decay, Detector::Secrets]);
    }

    #[test]
    fn merge_is_independent_of_arrival_order() {
        let a = vec![
            (Detector::Budget, vec![f(Level::HardFail, Code::BudgetOverflow, Detector::Budget)]),
            (Detector::Marker, vec![f(Level::HardFail, Code::ExplanationFailure, Detector::Marker)]),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(merge(a), merge(b));
    }
}
