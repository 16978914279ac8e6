//! Subject/Keyword Analyzer.
//!
//! Classifies a rule line's normative keyword and reduces the rest of the
//! line to a normalized subject phrase whose word tokens drive similarity
//! grouping.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{AnalysisConfig, Matchers};
use crate::extract::model::Normative;

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Alternation is leftmost-first: at a given offset the negated form wins.
    RE.get_or_init(|| {
        Regex::new(r"\b(?:MUST\s+NOT|MUST|SHOULD\s+NOT|SHOULD|MAY)\b")
            .expect("keyword regex must compile")
    })
}

/// First normative keyword on the line and its byte range.
///
/// Matching is case-sensitive: lowercase "may" in running prose is not a
/// normative keyword.
pub fn find_keyword(line: &str) -> Option<(Normative, Range<usize>)> {
    let m = keyword_regex().find(line)?;
    let word = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    Some((Normative::parse(&word)?, m.range()))
}

/// Derived subject of one rule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub phrase: String,
    pub tokens: BTreeSet<String>,
    pub qualifiers: BTreeSet<String>,
}

/// Subject derivation bound to one configuration.
pub struct Analyzer<'a> {
    matchers: &'a Matchers,
    stop_words: BTreeSet<String>,
}

impl<'a> Analyzer<'a> {
    pub fn new(analysis: &AnalysisConfig, matchers: &'a Matchers) -> Self {
        Self {
            matchers,
            stop_words: analysis
                .stop_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Strip ids, keywords and stop phrases; lowercase; drop stop words.
    pub fn subject(&self, line: &str) -> Subject {
        let qualifiers = self.matchers.scope_qualifiers.found(line).into_iter().collect();

        let without_ids = self.matchers.declared_id.replace_all(line, " ");
        let without_keywords = keyword_regex().replace_all(&without_ids, " ");
        let stripped = self.matchers.stop_phrases.strip(&without_keywords).to_lowercase();

        let words: Vec<String> = stripped
            .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
            .map(|w| w.trim_matches(|c| c == '-' || c == '_'))
            .filter(|w| !w.is_empty() && !self.stop_words.contains(*w))
            .map(str::to_string)
            .collect();

        Subject {
            phrase: words.join(" "),
            tokens: words.into_iter().collect(),
            qualifiers,
        }
    }
}

/// Intersection over union of two token sets. Two empty sets score 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
