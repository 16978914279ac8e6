//! Unlogged governance changes.
//!
//! Every recent commit to a rule document should be accompanied by a
//! decision entry naming the document (or the commit) and dated close to
//! the commit. The first commit of each document is its creation and is
//! exempt.

use chrono::{Duration, NaiveDate};
use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::extract::model::DecisionEntry;
use crate::report::model::Finding;
use crate::source::history::CommitInfo;
use crate::source::read::Document;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let sources = &ctx.corpus.sources;
    if let Some(reason) = sources.history.unavailable_reason() {
        return vec![
            Finding::info(
                Code::GovernanceChangesSkipped,
                Detector::GovernanceChanges,
                "governance change logging not evaluated: commit history unavailable",
            )
            .with_details(json!({ "reason": reason })),
        ];
    }

    let windows = &ctx.config.windows;
    let since = sources
        .today
        .checked_sub_signed(Duration::days(i64::from(windows.governance_change_days)))
        .unwrap_or(NaiveDate::MIN);
    let slack = i64::from(windows.governance_log_slack_days);

    let mut unlogged = Vec::new();
    for doc in &sources.rule_documents {
        let Some(history) = sources.history.file(&doc.path) else {
            continue;
        };
        for commit in history.commits().skip(1) {
            if commit.date <= since || commit.date > sources.today {
                continue;
            }
            if !ctx
                .corpus
                .decisions
                .iter()
                .any(|e| mentions(e, doc, commit, slack))
            {
                unlogged.push(json!({
                    "file": doc.path,
                    "commit": commit.short_hash(),
                    "date": commit.date,
                    "subject": commit.subject,
                }));
            }
        }
    }

    if unlogged.is_empty() {
        return Vec::new();
    }
    vec![
        Finding::warn(
            Code::GovernanceChangeUnlogged,
            Detector::GovernanceChanges,
            format!(
                "{} rule document change(s) in the last {} days have no matching decision entry",
                unlogged.len(),
                windows.governance_change_days
            ),
        )
        .with_details(json!({
            "window_days": windows.governance_change_days,
            "slack_days": slack,
            "changes": unlogged,
        })),
    ]
}

fn mentions(entry: &DecisionEntry, doc: &Document, commit: &CommitInfo, slack: i64) -> bool {
    let body = entry.body.to_lowercase();
    let named = body.contains(&doc.path.to_lowercase())
        || body.contains(&doc.file_name().to_lowercase())
        || body.contains(&commit.short_hash().to_lowercase());
    if !named {
        return false;
    }
    entry
        .date
        .is_none_or(|d| (d - commit.date).num_days().abs() <= slack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing;
    use crate::config::EngineConfig;
    use crate::report::model::Level;
    use crate::source::history::{FileHistory, History, Revision, RevisionSource};
    use chrono::NaiveDate;

    const RULES: &str = "[LIL-MR-LOG-0001] Agents MUST log.\n";

    fn days_ago(n: i64) -> NaiveDate {
        testing::today() - Duration::days(n)
    }

    fn rev(hash: &str, date: NaiveDate) -> Revision {
        Revision {
            source: RevisionSource::Commit(CommitInfo {
                hash: hash.into(),
                date,
                subject: format!("edit {hash}"),
            }),
            date,
            text: Some(RULES.into()),
        }
    }

    fn ctx(commits: Vec<Revision>, log: &str) -> CheckContext {
        let mut revisions = commits;
        revisions.push(Revision {
            source: RevisionSource::WorkingTree,
            date: testing::today(),
            text: Some(RULES.into()),
        });
        let mut sources = testing::sources(RULES, log);
        sources.history = History::Available(vec![FileHistory {
            path: "docs/MASTER_RULES.md".into(),
            revisions,
        }]);
        testing::context_with(sources, EngineConfig::default())
    }

    #[test]
    fn creation_commit_is_exempt() {
        let c = ctx(vec![rev("aaaaaaa1", days_ago(3))], "");
        assert!(check(&c).is_empty());
    }

    #[test]
    fn unlogged_edit_warns() {
        let c = ctx(
            vec![rev("aaaaaaa1", days_ago(60)), rev("bbbbbbb2", days_ago(5))],
            "Date: 2025-05-27\nDecision: unrelated\n",
        );
        let findings = check(&c);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Level::Warn);
        assert_eq!(findings[0].details["changes"][0]["commit"], "bbbbbbb");
    }

    #[test]
    fn entry_naming_file_logs_edit() {
        let c = ctx(
            vec![rev("aaaaaaa1", days_ago(60)), rev("bbbbbbb2", days_ago(5))],
            "Date: 2025-05-28\nDecision: Tighten master_rules.md logging rule\n",
        );
        assert!(check(&c).is_empty());
    }

    #[test]
    fn entry_naming_commit_logs_edit() {
        let c = ctx(
            vec![rev("aaaaaaa1", days_ago(60)), rev("bbbbbbb2", days_ago(5))],
            "Date: 2025-05-26\nDecision: See bbbbbbb\n",
        );
        assert!(check(&c).is_empty());
    }

    #[test]
    fn entry_outside_slack_does_not_count() {
        let c = ctx(
            vec![rev("aaaaaaa1", days_ago(60)), rev("bbbbbbb2", days_ago(5))],
            "Date: 2025-04-01\nDecision: Edit MASTER_RULES.md\n",
        );
        assert_eq!(check(&c).len(), 1);
    }

    #[test]
    fn old_edits_are_outside_window() {
        let c = ctx(vec![rev("aaaaaaa1", days_ago(90)), rev("bbbbbbb2", days_ago(45))], "");
        assert!(check(&c).is_empty());
    }

    #[test]
    fn skips_without_history() {
        let findings = check(&testing::context(RULES, ""));
        assert_eq!(findings[0].code, Code::GovernanceChangesSkipped);
    }
}
