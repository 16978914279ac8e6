//! Extraction: raw sources to the immutable entity snapshot detectors read.

pub mod decisions;
pub mod lineage;
pub mod model;
pub mod rules;
pub mod subject;

use tracing::debug;

use crate::config::{EngineConfig, Matchers};
use crate::extract::lineage::LogLineage;
use crate::extract::model::{DecisionEntry, Rule, RuleReference, UnkeyedRule};
use crate::extract::subject::Analyzer;
use crate::source::loader::Sources;

/// Every entity of one run. Built once, then shared read-only.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub sources: Sources,
    pub rules: Vec<Rule>,
    pub unkeyed: Vec<UnkeyedRule>,
    pub references: Vec<RuleReference>,
    pub decisions: Vec<DecisionEntry>,
    /// Decision-log lineage; `None` without history.
    pub lineage: Option<LogLineage>,
}

impl Corpus {
    pub fn build(sources: Sources, config: &EngineConfig, matchers: &Matchers) -> Self {
        let analyzer = Analyzer::new(&config.analysis, matchers);
        let extraction = rules::extract(&sources.rule_documents, matchers, &analyzer);

        let mut entries = sources
            .decision_log
            .as_ref()
            .map(|doc| decisions::parse(&doc.text))
            .unwrap_or_default();

        let lineage = sources
            .decision_log
            .as_ref()
            .and_then(|doc| sources.history.file(&doc.path))
            .filter(|history| history.is_tracked())
            .map(lineage::log_lineage);

        if let Some(lineage) = &lineage {
            let keys: Vec<_> = decisions::keyed(&entries)
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            for (entry, key) in entries.iter_mut().zip(keys) {
                if let Some(commit) = lineage.introduced_commit(&key) {
                    entry.commit_hash = Some(commit.hash.clone());
                    entry.commit_date = Some(commit.date);
                }
            }
        }

        debug!(
            rules = extraction.rules.len(),
            unkeyed = extraction.unkeyed.len(),
            references = extraction.references.len(),
            decisions = entries.len(),
            "corpus extracted"
        );

        Self {
            sources,
            rules: extraction.rules,
            unkeyed: extraction.unkeyed,
            references: extraction.references,
            decisions: entries,
            lineage,
        }
    }

    /// Distinct declared rule ids, keyed or not.
    pub fn distinct_rule_ids(&self) -> std::collections::BTreeSet<&str> {
        self.rules
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.unkeyed.iter().map(|u| u.id.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::history::{CommitInfo, FileHistory, History, Revision, RevisionSource};
    use crate::source::read::Document;
    use chrono::NaiveDate;

    fn sources(rules: &str, log: &str, history: History) -> Sources {
        Sources {
            root: ".".into(),
            today: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            rule_documents: vec![Document::from_text("docs/MASTER_RULES.md", rules)],
            decision_log: Some(Document::from_text("docs/DECISION_LOG.md", log)),
            budget: Default::default(),
            agent_count: 0,
            memory_artifacts: Vec::new(),
            checksums: Vec::new(),
            explanation_marker: None,
            history,
        }
    }

    #[test]
    fn builds_entities_from_sources() {
        let cfg = EngineConfig::default();
        let m = cfg.compile().unwrap();
        let corpus = Corpus::build(
            sources(
                "[LIL-MR-LOG-0001] Agents MUST log.\n[LIL-MR-LOG-0002] Notes.\n[LIL-MR-LOG-0001] dup MAY\n",
                "Date: 2025-01-01\nDecision: a\n",
                History::Unavailable("no git".into()),
            ),
            &cfg,
            &m,
        );
        assert_eq!(corpus.rules.len(), 2);
        assert_eq!(corpus.unkeyed.len(), 1);
        assert_eq!(corpus.decisions.len(), 1);
        assert!(corpus.lineage.is_none());
        assert_eq!(corpus.distinct_rule_ids().len(), 2);
    }

    #[test]
    fn stamps_entries_with_introducing_commit() {
        let cfg = EngineConfig::default();
        let m = cfg.compile().unwrap();
        let log = "Date: 2025-01-01\nDecision: a\n";
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let history = History::Available(vec![FileHistory {
            path: "docs/DECISION_LOG.md".into(),
            revisions: vec![
                Revision {
                    source: RevisionSource::Commit(CommitInfo {
                        hash: "abcdef0123".into(),
                        date,
                        subject: "log".into(),
                    }),
                    date,
                    text: Some(log.into()),
                },
                Revision {
                    source: RevisionSource::WorkingTree,
                    date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                    text: Some(log.into()),
                },
            ],
        }]);

        let corpus = Corpus::build(sources("", log, history), &cfg, &m);
        assert_eq!(corpus.decisions[0].commit_hash.as_deref(), Some("abcdef0123"));
        assert_eq!(corpus.decisions[0].commit_date, Some(date));
    }

    #[test]
    fn untracked_log_has_no_lineage() {
        let cfg = EngineConfig::default();
        let m = cfg.compile().unwrap();
        let log = "Date: 2025-01-01\nDecision: a\n";
        let history = History::Available(vec![FileHistory {
            path: "docs/DECISION_LOG.md".into(),
            revisions: vec![Revision {
                source: RevisionSource::WorkingTree,
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                text: Some(log.into()),
            }],
        }]);
        let corpus = Corpus::build(sources("", log, history), &cfg, &m);
        assert!(corpus.lineage.is_none());
        assert!(corpus.decisions[0].commit_hash.is_none());
    }
}
