//! Detector Battery.
//!
//! Every detector is a pure function from the shared, read-only
//! `CheckContext` to a list of findings. Detectors never see each other's
//! output and never perform I/O.

pub mod automation;
pub mod battery;
pub mod budget;
pub mod catalog;
pub mod checksum;
pub mod contradiction;
pub mod decay;
pub mod governance;
pub mod integrity;
pub mod lint;
pub mod marker;
pub mod secrets;
pub mod velocity;

use crate::checks::catalog::Detector;
use crate::config::{CheckToggles, EngineConfig, Matchers};
use crate::extract::Corpus;
use crate::report::model::Finding;
use crate::source::loader::LoadScope;

/// Immutable inputs shared by every detector of one run.
#[derive(Debug)]
pub struct CheckContext {
    pub corpus: Corpus,
    pub config: EngineConfig,
    pub matchers: Matchers,
}

impl CheckContext {
    /// Document text with every secret-pattern match hidden, for report details.
    pub fn redact(&self, text: &str) -> String {
        secrets::redact(text, &self.matchers.secrets)
    }
}

/// Run one detector to completion.
pub fn run_detector(detector: Detector, ctx: &CheckContext) -> Vec<Finding> {
    match detector {
        Detector::Marker => marker::check(ctx),
        Detector::Lint => lint::check(ctx),
        Detector::Contradiction => contradiction::check(ctx),
        Detector::AutomationCreep => automation::check(ctx),
        Detector::Velocity => velocity::check(ctx),
        Detector::Decay => decay::check(ctx),
        Detector::Budget => budget::check(ctx),
        Detector::Integrity => integrity::check(ctx),
        Detector::GovernanceChanges => governance::check(ctx),
        Detector::Secrets => secrets::check(ctx),
        Detector::Checksums => checksum::check(ctx),
        // Emitted by the engine and the battery themselves.
        Detector::Sources | Detector::Battery => Vec::new(),
    }
}

/// Detectors a run executes, in declared order.
pub fn enabled_detectors(scope: LoadScope, toggles: &CheckToggles) -> Vec<Detector> {
    let mut out = vec![Detector::Marker, Detector::Lint];
    if scope == LoadScope::RulesOnly {
        return out;
    }
    let optional = [
        (Detector::Contradiction, toggles.contradiction),
        (Detector::AutomationCreep, toggles.automation_creep),
        (Detector::Velocity, toggles.velocity),
        (Detector::Decay, toggles.decay),
        (Detector::Budget, toggles.budget),
        (Detector::Integrity, toggles.integrity),
        (Detector::GovernanceChanges, toggles.governance_changes),
        (Detector::Secrets, toggles.secrets),
        (Detector::Checksums, toggles.checksums),
    ];
    out.extend(optional.into_iter().filter(|(_, on)| *on).map(|(d, _)| d));
    out
}

/// Truncate display text to `max` characters on a char boundary.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for detector unit tests.

    use chrono::NaiveDate;

    use super::CheckContext;
    use crate::config::EngineConfig;
    use crate::extract::Corpus;
    use crate::source::history::History;
    use crate::source::loader::Sources;
    use crate::source::read::Document;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    pub fn sources(rules: &str, log: &str) -> Sources {
        Sources {
            root: ".".into(),
            today: today(),
            rule_documents: vec![Document::from_text("docs/MASTER_RULES.md", rules)],
            decision_log: Some(Document::from_text("docs/DECISION_LOG.md", log)),
            budget: Default::default(),
            agent_count: 0,
            memory_artifacts: Vec::new(),
            checksums: Vec::new(),
            explanation_marker: None,
            history: History::Unavailable("not a git repository".into()),
        }
    }

    pub fn context_with(sources: Sources, config: EngineConfig) -> CheckContext {
        let matchers = config.compile().unwrap();
        let corpus = Corpus::build(sources, &config, &matchers);
        CheckContext {
            corpus,
            config,
            matchers,
        }
    }

    pub fn context(rules: &str, log: &str) -> CheckContext {
        context_with(sources(rules, log), EngineConfig::default())
    }
}
