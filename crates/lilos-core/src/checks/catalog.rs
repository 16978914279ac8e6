//! Detector identities and the stable finding codes they emit.
//!
//! Both enums are part of the report contract: codes are what CI
//! annotations key on, and the declaration order of `Detector` is the
//! order findings are merged in.

use serde::{Deserialize, Serialize};

/// A check in the battery. Declaration order is the report merge order.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    Sources,
    Marker,
    Lint,
    Contradiction,
    AutomationCreep,
    Velocity,
    Decay,
    Budget,
    Integrity,
    GovernanceChanges,
    Secrets,
    Checksums,
    Battery,
}

impl Detector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::Sources => "sources",
            Detector::Marker => "marker",
            Detector::Lint => "lint",
            Detector::Contradiction => "contradiction",
            Detector::AutomationCreep => "automation_creep",
            Detector::Velocity => "velocity",
            Detector::Decay => "decay",
            Detector::Budget => "budget",
            Detector::Integrity => "integrity",
            Detector::GovernanceChanges => "governance_changes",
            Detector::Secrets => "secrets",
            Detector::Checksums => "checksums",
            Detector::Battery => "battery",
        }
    }
}

impl std::fmt::Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable finding codes.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    // sources
    HistoryUnavailable,
    // marker
    ExplanationFailure,
    // lint
    DuplicateRuleId,
    MissingNormativeKeyword,
    DuplicateRuleText,
    DanglingRuleReference,
    NoRulesFound,
    // contradiction
    RuleContradiction,
    RuleContradictionSoft,
    // automation creep
    AutomationCreep,
    // velocity
    RuleAccretion,
    RuleVelocitySkipped,
    // decay
    JustificationDecay,
    DecisionEntryIncomplete,
    MetricDominance,
    OverrideNormalization,
    MalformedEntity,
    ReviewOverdue,
    // budget
    BudgetOverflow,
    MemoryMetadataMissing,
    // integrity
    DecisionLogTamper,
    DecisionLogIntegritySkipped,
    // governance changes
    GovernanceChangeUnlogged,
    GovernanceChangesSkipped,
    // secrets
    SecretDetected,
    // checksums
    ChecksumMismatch,
    ChecksumSourceMissing,
    // battery
    ValidationIncomplete,
    DetectorFailed,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::HistoryUnavailable => "HISTORY_UNAVAILABLE",
            Code::ExplanationFailure => "EXPLANATION_FAILURE",
            Code::DuplicateRuleId => "DUPLICATE_RULE_ID",
            Code::MissingNormativeKeyword => "MISSING_NORMATIVE_KEYWORD",
            Code::DuplicateRuleText => "DUPLICATE_RULE_TEXT",
            Code::DanglingRuleReference => "DANGLING_RULE_REFERENCE",
            Code::NoRulesFound => "NO_RULES_FOUND",
            Code::RuleContradiction => "RULE_CONTRADICTION",
            Code::RuleContradictionSoft => "RULE_CONTRADICTION_SOFT",
            Code::AutomationCreep => "AUTOMATION_CREEP",
            Code::RuleAccretion => "RULE_ACCRETION",
            Code::RuleVelocitySkipped => "RULE_VELOCITY_SKIPPED",
            Code::JustificationDecay => "JUSTIFICATION_DECAY",
            Code::DecisionEntryIncomplete => "DECISION_ENTRY_INCOMPLETE",
            Code::MetricDominance => "METRIC_DOMINANCE",
            Code::OverrideNormalization => "OVERRIDE_NORMALIZATION",
            Code::MalformedEntity => "MALFORMED_ENTITY",
            Code::ReviewOverdue => "REVIEW_OVERDUE",
            Code::BudgetOverflow => "BUDGET_OVERFLOW",
            Code::MemoryMetadataMissing => "MEMORY_METADATA_MISSING",
            Code::DecisionLogTamper => "DECISION_LOG_TAMPER",
            Code::DecisionLogIntegritySkipped => "DECISION_LOG_INTEGRITY_SKIPPED",
            Code::GovernanceChangeUnlogged => "GOVERNANCE_CHANGE_UNLOGGED",
            Code::GovernanceChangesSkipped => "GOVERNANCE_CHANGES_SKIPPED",
            Code::SecretDetected => "SECRET_DETECTED",
            Code::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Code::ChecksumSourceMissing => "CHECKSUM_SOURCE_MISSING",
            Code::ValidationIncomplete => "VALIDATION_INCOMPLETE",
            Code::DetectorFailed => "DETECTOR_FAILED",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
