//! Entity lineage across historical revisions.
//!
//! Two views are derived from materialized file history: how each decision
//! entry changed from revision to revision, and how the set of declared
//! rule ids evolved commit by commit.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::config::Matchers;
use crate::extract::decisions;
use crate::extract::model::EntryKey;
use crate::source::history::{CommitInfo, FileHistory, Revision};

/// Revision metadata, detached from its text.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionMeta {
    pub date: NaiveDate,
    pub commit: Option<CommitInfo>,
    pub label: String,
}

impl From<&Revision> for RevisionMeta {
    fn from(rev: &Revision) -> Self {
        Self {
            date: rev.date,
            commit: rev.commit().cloned(),
            label: rev.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// A change to an entry after the revision that introduced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryChange {
    /// Index into `LogLineage::revisions`.
    pub revision: usize,
    pub kind: ChangeKind,
}

/// Life of one entry key across the log's history.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryLineage {
    pub key: EntryKey,
    pub introduced: usize,
    pub changes: Vec<EntryChange>,
}

/// Per-entry history of the decision log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogLineage {
    pub revisions: Vec<RevisionMeta>,
    /// Every key ever observed, ordered by first appearance.
    pub entries: Vec<EntryLineage>,
}

impl LogLineage {
    pub fn get(&self, key: &EntryKey) -> Option<&EntryLineage> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn introduced_commit(&self, key: &EntryKey) -> Option<&CommitInfo> {
        let lineage = self.get(key)?;
        self.revisions.get(lineage.introduced)?.commit.as_ref()
    }
}

fn normalize(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn snapshot(text: Option<&str>) -> BTreeMap<EntryKey, String> {
    let Some(text) = text else {
        return BTreeMap::new();
    };
    let entries = decisions::parse(text);
    decisions::keyed(&entries)
        .into_iter()
        .map(|(key, entry)| (key, normalize(&entry.body)))
        .collect()
}

/// Walk every revision of the decision log and record, per entry key, the
/// revision that introduced it and every later modification or deletion.
pub fn log_lineage(history: &FileHistory) -> LogLineage {
    let mut lineage = LogLineage {
        revisions: history.revisions.iter().map(RevisionMeta::from).collect(),
        entries: Vec::new(),
    };
    let mut slots: HashMap<EntryKey, usize> = HashMap::new();
    // Last body seen per key, kept across deletions so restores are recognized.
    let mut last_body: HashMap<EntryKey, String> = HashMap::new();
    let mut previous: BTreeMap<EntryKey, String> = BTreeMap::new();

    for (idx, rev) in history.revisions.iter().enumerate() {
        let current = snapshot(rev.text.as_deref());

        for (key, body) in &current {
            match slots.get(key) {
                None => {
                    slots.insert(key.clone(), lineage.entries.len());
                    lineage.entries.push(EntryLineage {
                        key: key.clone(),
                        introduced: idx,
                        changes: Vec::new(),
                    });
                }
                Some(&slot) => {
                    let changed = last_body.get(key).is_some_and(|b| b != body);
                    if changed {
                        lineage.entries[slot].changes.push(EntryChange {
                            revision: idx,
                            kind: ChangeKind::Modified,
                        });
                    }
                }
            }
            last_body.insert(key.clone(), body.clone());
        }

        for key in previous.keys().filter(|k| !current.contains_key(*k)) {
            if let Some(&slot) = slots.get(key) {
                lineage.entries[slot].changes.push(EntryChange {
                    revision: idx,
                    kind: ChangeKind::Deleted,
                });
            }
        }

        previous = current;
    }

    lineage
}

/// Net change to the declared rule id set at one point in history.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDelta {
    pub date: NaiveDate,
    pub label: String,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

/// Declared ids (first bracketed id per line) in one revision of a document.
pub fn declared_ids(text: &str, matchers: &Matchers) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| matchers.declared_id.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Rule id additions and removals across all rule documents, one delta per
/// day of history, ending with the working tree.
///
/// All revisions dated the same day are applied together, so a rule moved
/// between files is neither added nor removed.
pub fn rule_timeline(files: &[&FileHistory], matchers: &Matchers) -> Vec<RuleDelta> {
    struct Step {
        date: NaiveDate,
        working: bool,
        label: String,
        file: usize,
        ids: BTreeSet<String>,
    }

    let mut steps: Vec<Step> = Vec::new();
    for (file, history) in files.iter().enumerate() {
        for rev in &history.revisions {
            steps.push(Step {
                date: rev.date,
                working: rev.commit().is_none(),
                label: rev.label(),
                file,
                ids: rev
                    .text
                    .as_deref()
                    .map(|t| declared_ids(t, matchers))
                    .unwrap_or_default(),
            });
        }
    }
    // Stable: each file's own revision order survives within a day.
    steps.sort_by_key(|s| (s.date, s.working));

    let mut state: Vec<BTreeSet<String>> = vec![BTreeSet::new(); files.len()];
    let mut union: BTreeSet<String> = BTreeSet::new();
    let mut deltas: Vec<RuleDelta> = Vec::new();

    for group in steps.chunk_by(|a, b| (a.date, a.working) == (b.date, b.working)) {
        for step in group {
            state[step.file] = step.ids.clone();
        }
        let next: BTreeSet<String> = state.iter().flatten().cloned().collect();
        let added: BTreeSet<String> = next.difference(&union).cloned().collect();
        let removed: BTreeSet<String> = union.difference(&next).cloned().collect();
        if !added.is_empty() || !removed.is_empty() {
            let last = &group[group.len() - 1];
            deltas.push(RuleDelta {
                date: last.date,
                label: last.label.clone(),
                added,
                removed,
            });
        }
        union = next;
    }

    deltas
}
