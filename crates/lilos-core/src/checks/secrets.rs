//! Credential scanning over governance text.
//!
//! Responsibilities:
//! - Match every configured secret pattern line by line
//! - Report file, line and pattern name for each match
//!
//! Non-responsibilities:
//! - Entropy analysis
//! - Scanning files outside the rule documents and the decision log
//!
//! Policy:
//! - Matched values never reach the report. The message names only the
//!   pattern, and the excerpt has every match replaced by `[REDACTED]`.

use regex::Regex;
use serde_json::json;

use crate::checks::catalog::{Code, Detector};
use crate::checks::{CheckContext, excerpt};
use crate::report::model::Finding;

const REDACTED: &str = "[REDACTED]";
const EXCERPT_CHARS: usize = 120;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let excluded: Vec<String> = ctx
        .config
        .security
        .excluded_files
        .iter()
        .map(|f| f.to_lowercase())
        .collect();

    let mut findings = Vec::new();
    for doc in ctx.corpus.sources.texts() {
        if excluded.contains(&doc.file_name().to_lowercase()) {
            continue;
        }
        for (idx, line) in doc.text.lines().enumerate() {
            for (name, re) in &ctx.matchers.secrets {
                if !re.is_match(line) {
                    continue;
                }
                let redacted = redact(line, &ctx.matchers.secrets);
                findings.push(
                    Finding::hard_fail(
                        Code::SecretDetected,
                        Detector::Secrets,
                        format!("possible {name} in {} at line {}", doc.path, idx + 1),
                    )
                    .with_details(json!({
                        "file": doc.path,
                        "line": idx + 1,
                        "pattern": name,
                        "excerpt": excerpt(&redacted, EXCERPT_CHARS),
                    })),
                );
            }
        }
    }
    findings
}

/// Replace the matches of every secret pattern in `text`.
///
/// Spans are taken from the original text and merged, so overlapping
/// matches from different patterns are hidden as a whole.
pub(crate) fn redact(text: &str, patterns: &[(String, Regex)]) -> String {
    let mut spans: Vec<(usize, usize)> = patterns
        .iter()
        .flat_map(|(_, re)| re.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    if spans.is_empty() {
        return text.to_string();
    }
    spans.sort_unstable();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in spans {
        if end <= cursor {
            continue;
        }
        if start >= cursor {
            out.push_str(&text[cursor..start]);
            out.push_str(REDACTED);
        }
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
