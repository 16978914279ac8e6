//! Decision-log tamper evidence.
//!
//! Responsibilities:
//! - Find entries modified or deleted after the revision that introduced them
//! - Accept a change when a later, newer entry documents it
//!
//! Non-responsibilities:
//! - Materializing history (handled in `source::history`)
//! - Entry lineage across revisions (handled in `extract::lineage`)
//!
//! Entry lifecycle:
//!
//!   introduced → unchanged                    ok
//!   introduced → modified, documented         ok
//!   introduced → modified, undocumented       HARD_FAIL DECISION_LOG_TAMPER
//!
//! A change is documented by a current entry that is dated after the changed
//! entry, mentions its date or the changing commit's short hash, and was
//! itself introduced no earlier than the change.

use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::extract::decisions::{keyed, parse_date};
use crate::extract::lineage::{EntryChange, EntryLineage, LogLineage};
use crate::extract::model::{DecisionEntry, EntryKey};
use crate::report::model::Finding;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let Some(lineage) = &ctx.corpus.lineage else {
        let reason = ctx
            .corpus
            .sources
            .history
            .unavailable_reason()
            .unwrap_or("decision log is not tracked");
        return vec![
            Finding::info(
                Code::DecisionLogIntegritySkipped,
                Detector::Integrity,
                "decision log integrity not evaluated: commit history unavailable",
            )
            .with_details(json!({ "reason": reason })),
        ];
    };

    let current = keyed(&ctx.corpus.decisions);
    let mut findings = Vec::new();

    for entry in &lineage.entries {
        for change in &entry.changes {
            if documented(entry, change, &current, lineage) {
                continue;
            }
            findings.push(tamper(entry, change, lineage));
        }
    }
    findings
}

fn documented(
    entry: &EntryLineage,
    change: &EntryChange,
    current: &[(EntryKey, &DecisionEntry)],
    lineage: &LogLineage,
) -> bool {
    let changed_date = parse_date(&entry.key.date);
    let short_hash = lineage
        .revisions
        .get(change.revision)
        .and_then(|r| r.commit.as_ref())
        .map(|c| c.short_hash().to_string());

    current.iter().any(|(key, candidate)| {
        if *key == entry.key {
            return false;
        }
        let later = match (candidate.date, changed_date) {
            (Some(c), Some(e)) => c > e,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !later {
            return false;
        }
        let mentions = (!entry.key.date.is_empty() && candidate.body.contains(&entry.key.date))
            || short_hash.as_deref().is_some_and(|h| candidate.body.contains(h));
        if !mentions {
            return false;
        }
        lineage
            .get(key)
            .is_some_and(|l| l.introduced >= change.revision)
    })
}

fn tamper(entry: &EntryLineage, change: &EntryChange, lineage: &LogLineage) -> Finding {
    let at = &lineage.revisions[change.revision];
    let introduced = &lineage.revisions[entry.introduced];
    Finding::hard_fail(
        Code::DecisionLogTamper,
        Detector::Integrity,
        format!(
            "decision entry dated {} was {} in {} without a later entry documenting the change",
            entry.key.date,
            change.kind.as_str(),
            at.label
        ),
    )
    .with_details(json!({
        "entry_date": entry.key.date,
        "ordinal": entry.key.ordinal,
        "change": change.kind.as_str(),
        "changed_in": at.label,
        "changed_on": at.date,
        "introduced_in": introduced.label,
        "introduced_on": introduced.date,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing;
    use crate::config::EngineConfig;
    use crate::report::model::Level;
    use crate::source::history::{CommitInfo, FileHistory, History, Revision, RevisionSource};
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn commit(hash: &str, date: NaiveDate, text: &str) -> Revision {
        Revision {
            source: RevisionSource::Commit(CommitInfo {
                hash: hash.into(),
                date,
                subject: "log".into(),
            }),
            date,
            text: Some(text.into()),
        }
    }

    fn ctx(revisions: Vec<Revision>, working: &str) -> CheckContext {
        let mut revisions = revisions;
        revisions.push(Revision {
            source: RevisionSource::WorkingTree,
            date: testing::today(),
            text: Some(working.into()),
        });
        let mut sources = testing::sources("", working);
        sources.history = History::Available(vec![FileHistory {
            path: "docs/DECISION_LOG.md".into(),
            revisions,
        }]);
        testing::context_with(sources, EngineConfig::default())
    }

    const ORIGINAL: &str = "Date: 2025-01-10\nDecision: Keep manual deploys\n";
    const EDITED: &str = "Date: 2025-01-10\nDecision: Automate deploys\n";

    #[test]
    fn unchanged_history_is_clean() {
        let c = ctx(vec![commit("1111111aaaa", day(1, 10), ORIGINAL)], ORIGINAL);
        assert!(check(&c).is_empty());
    }

    #[test]
    fn silent_edit_is_tamper() {
        let c = ctx(
            vec![
                commit("1111111aaaa", day(1, 10), ORIGINAL),
                commit("2222222bbbb", day(2, 1), EDITED),
            ],
            EDITED,
        );
        let findings = check(&c);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Level::HardFail);
        assert_eq!(findings[0].code, Code::DecisionLogTamper);
        assert_eq!(findings[0].details["changed_in"], "2222222");
        assert_eq!(findings[0].details["introduced_in"], "1111111");
    }

    #[test]
    fn later_entry_referencing_date_documents_edit() {
        let working = format!(
            "{EDITED}\nDate: 2025-02-02\nDecision: Amend the 2025-01-10 entry to reflect automation\n"
        );
        let c = ctx(
            vec![
                commit("1111111aaaa", day(1, 10), ORIGINAL),
                commit("2222222bbbb", day(2, 1), EDITED),
            ],
            &working,
        );
        assert!(check(&c).is_empty());
    }

    #[test]
    fn later_entry_referencing_commit_documents_edit() {
        let working = format!("{EDITED}\nDate: 2025-02-02\nDecision: Explains change 2222222\n");
        let c = ctx(
            vec![
                commit("1111111aaaa", day(1, 10), ORIGINAL),
                commit("2222222bbbb", day(2, 1), EDITED),
            ],
            &working,
        );
        assert!(check(&c).is_empty());
    }

    #[test]
    fn documenting_entry_must_not_predate_change() {
        let with_note = format!("{ORIGINAL}\nDate: 2025-01-20\nDecision: See 2025-01-10\n");
        let edited_with_note = format!("{EDITED}\nDate: 2025-01-20\nDecision: See 2025-01-10\n");
        let c = ctx(
            vec![
                commit("1111111aaaa", day(1, 10), &with_note),
                commit("2222222bbbb", day(2, 1), &edited_with_note),
            ],
            &edited_with_note,
        );
        assert_eq!(check(&c).len(), 1);
    }

    #[test]
    fn deletion_is_tamper() {
        let both = format!("{ORIGINAL}\nDate: 2025-01-11\nDecision: Second\n");
        let c = ctx(
            vec![commit("1111111aaaa", day(1, 11), &both)],
            "Date: 2025-01-11\nDecision: Second\n",
        );
        let findings = check(&c);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].details["change"], "deleted");
        assert_eq!(findings[0].details["changed_in"], "working-tree");
    }

    #[test]
    fn appending_entries_is_not_tamper() {
        let appended = format!("{ORIGINAL}\nDate: 2025-03-01\nDecision: New\n");
        let c = ctx(vec![commit("1111111aaaa", day(1, 10), ORIGINAL)], &appended);
        assert!(check(&c).is_empty());
    }

    #[test]
    fn skips_without_history() {
        let findings = check(&testing::context("", ORIGINAL));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, Code::DecisionLogIntegritySkipped);
        assert_eq!(findings[0].level, Level::Info);
    }
}
