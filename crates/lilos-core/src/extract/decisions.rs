//! Decision Log Parser.
//!
//! Tolerant by construction: an entry starts at any `Date:` line, fields are
//! `Name: value` lines (list markers, heading hashes and bold emphasis are
//! ignored), and lines that are not fields continue the previous field.
//! Missing fields are flagged on the entry, never rejected.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::extract::model::{DecisionEntry, EntryKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Decision,
    Trigger,
    Rationale,
    Tradeoffs,
    ExpectedImpact,
    ReviewDate,
    Other,
}

impl Field {
    fn from_name(name: &str) -> Field {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "date" => Field::Date,
            "decision" => Field::Decision,
            "trigger" => Field::Trigger,
            "rationale" => Field::Rationale,
            "tradeoffs" | "trade-offs" => Field::Tradeoffs,
            "expected impact" => Field::ExpectedImpact,
            "review date" => Field::ReviewDate,
            _ => Field::Other,
        }
    }
}

/// Required fields and the names reported when they are empty.
const REQUIRED: [(Field, &str); 6] = [
    (Field::Date, "Date"),
    (Field::Decision, "Decision"),
    (Field::Trigger, "Trigger"),
    (Field::Rationale, "Rationale"),
    (Field::Tradeoffs, "Tradeoffs"),
    (Field::ExpectedImpact, "Expected Impact"),
];

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:[-*+]\s+)?(?:#+\s*)?(?:\*\*|__)?\s*([A-Za-z][A-Za-z\- ]{0,30}?)\s*(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.*?)\s*$",
        )
        .expect("field regex must compile")
    })
}

fn is_break(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('#') || (t.len() >= 3 && t.chars().all(|c| c == '-' || c == '*' || c == '='))
}

#[derive(Default)]
struct Draft {
    line: usize,
    values: Vec<(Field, String)>,
    body: Vec<String>,
}

impl Draft {
    fn value(&self, field: Field) -> String {
        self.values
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_skeleton(&self) -> bool {
        self.values.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Parse every entry in `text`, in log order. Skeleton entries whose fields
/// are all empty (templates) are skipped.
pub fn parse(text: &str) -> Vec<DecisionEntry> {
    let mut drafts: Vec<Draft> = Vec::new();
    let mut current: Option<Draft> = None;
    // Index into current.values of the field accepting continuation lines.
    let mut open: Option<usize> = None;

    for (idx, line) in text.lines().enumerate() {
        let field = field_regex().captures(line).and_then(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2).map_or("", |m| m.as_str());
            (name.split_whitespace().count() <= 3).then(|| (Field::from_name(name), strip_emphasis(value)))
        });

        match field {
            Some((Field::Date, value)) => {
                drafts.extend(current.take());
                current = Some(Draft {
                    line: idx + 1,
                    values: vec![(Field::Date, value)],
                    body: vec![line.trim().to_string()],
                });
                open = Some(0);
            }
            Some((field, value)) => {
                let Some(draft) = current.as_mut() else {
                    continue;
                };
                draft.values.push((field, value));
                draft.body.push(line.trim().to_string());
                open = Some(draft.values.len() - 1);
            }
            None if is_break(line) => open = None,
            None => {
                let (Some(draft), Some(slot)) = (current.as_mut(), open) else {
                    continue;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let value = &mut draft.values[slot].1;
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(&strip_emphasis(trimmed));
                draft.body.push(trimmed.to_string());
            }
        }
    }
    drafts.extend(current);

    drafts
        .into_iter()
        .filter(|d| !d.is_skeleton())
        .enumerate()
        .map(|(i, d)| finish(i + 1, d))
        .collect()
}

fn strip_emphasis(value: &str) -> String {
    value
        .trim()
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim()
        .to_string()
}

fn finish(index: usize, draft: Draft) -> DecisionEntry {
    let date_raw = draft.value(Field::Date);
    let review_raw = draft.value(Field::ReviewDate);
    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|(field, _)| draft.value(*field).is_empty())
        .map(|(_, name)| name.to_string())
        .collect();

    DecisionEntry {
        index,
        line: draft.line,
        date: parse_date(&date_raw),
        decision: draft.value(Field::Decision),
        trigger: draft.value(Field::Trigger),
        rationale: draft.value(Field::Rationale),
        tradeoffs: draft.value(Field::Tradeoffs),
        expected_impact: draft.value(Field::ExpectedImpact),
        review_date: parse_date(&review_raw),
        body: draft.body.join("\n"),
        complete: missing.is_empty(),
        missing,
        date_raw,
        commit_hash: None,
        commit_date: None,
    }
}

/// `YYYY-MM-DD`, optionally followed by other text (`2025-01-05 (amended)`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    let token = token.trim_end_matches([',', ';', '.', ':']);
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Pair each entry with its identity across revisions.
pub fn keyed(entries: &[DecisionEntry]) -> Vec<(EntryKey, &DecisionEntry)> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    entries
        .iter()
        .map(|e| {
            let date = e.date_raw.trim().to_string();
            let ordinal = seen.entry(date).or_insert(0);
            let key = e.key(*ordinal);
            *ordinal += 1;
            (key, e)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
# Decision Log

Template:
- Date:
- Decision:

## 2025-01-05

**Date:** 2025-01-05
**Decision:** Adopt weekly rule review
**Trigger:** Rules grew quickly
**Rationale:**
Too many rules were added
without review.
**Tradeoffs:** Slower changes
**Expected Impact:** Fewer rules
**Review Date:** 2025-03-01

---

- Date: 2025-02-01
- Decision: Drop the staging gate
- Trigger: Flaky deploys
- Rationale: Gate caused noise
- Expected Impact: Faster deploys
- Review Date: N/A
";

    #[test]
    fn parses_entries_and_skips_templates() {
        let entries = parse(LOG);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.line, 9);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 5));
        assert_eq!(first.decision, "Adopt weekly rule review");
        assert_eq!(first.rationale, "Too many rules were added without review.");
        assert_eq!(first.review_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(first.complete);
        assert!(!first.body.contains("---"));
        assert!(!first.body.contains("## 2025"));
    }

    #[test]
    fn flags_missing_fields() {
        let entries = parse(LOG);
        let second = &entries[1];
        assert!(!second.complete);
        assert_eq!(second.missing, vec!["Tradeoffs"]);
        assert_eq!(second.review_date, None);
    }

    #[test]
    fn malformed_date_is_kept_with_no_parsed_date() {
        let entries = parse("Date: last tuesday\nDecision: x\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date_raw, "last tuesday");
        assert!(entries[0].date.is_none());
    }

    #[test]
    fn parse_date_accepts_trailing_text() {
        assert_eq!(parse_date("2025-01-05 (amended)"), NaiveDate::from_ymd_opt(2025, 1, 5));
        assert_eq!(parse_date("2025-13-05"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn keys_count_ordinals_per_date() {
        let entries = parse("Date: 2025-01-01\nDecision: a\nDate: 2025-01-01\nDecision: b\nDate: 2025-01-02\nDecision: c\n");
        let keys: Vec<(String, usize)> = keyed(&entries)
            .into_iter()
            .map(|(k, _)| (k.date, k.ordinal))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2025-01-01".to_string(), 0),
                ("2025-01-01".to_string(), 1),
                ("2025-01-02".to_string(), 0)
            ]
        );
    }

    #[test]
    fn text_before_first_entry_is_ignored() {
        let entries = parse("Intro: this log records decisions\n\nDate: 2025-01-01\nDecision: a\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, "a");
    }
}
