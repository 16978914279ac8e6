use regex::{Regex, RegexBuilder};

/// A case-insensitive vocabulary matcher over prose.
///
/// Each term matches on a word boundary wherever the term itself starts or
/// ends with a word character, so `bot` does not fire inside `both` while
/// `auto-` still matches `auto-merge`.
#[derive(Debug, Clone)]
pub struct TermSet {
    terms: Vec<(String, Regex)>,
}

impl TermSet {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, regex::Error> {
        let mut compiled = Vec::with_capacity(terms.len());
        for term in terms {
            let term = term.as_ref().trim();
            if term.is_empty() {
                continue;
            }
            compiled.push((term.to_string(), term_regex(term)?));
        }
        Ok(Self { terms: compiled })
    }

    /// Terms present in `text`, in vocabulary order.
    pub fn found(&self, text: &str) -> Vec<String> {
        self.terms
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(term, _)| term.clone())
            .collect()
    }

    pub fn any(&self, text: &str) -> bool {
        self.terms.iter().any(|(_, re)| re.is_match(text))
    }

    /// Remove every occurrence of every term, leaving a space in its place.
    pub fn strip(&self, text: &str) -> String {
        self.terms
            .iter()
            .fold(text.to_string(), |acc, (_, re)| re.replace_all(&acc, " ").into_owned())
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn term_regex(term: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let mut pattern = String::new();
    if is_word(term.chars().next()) {
        pattern.push_str(r"\b");
    }
    // Internal whitespace in a phrase matches any run of whitespace.
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    pattern.push_str(&words.join(r"\s+"));
    if is_word(term.chars().last()) {
        pattern.push_str(r"\b");
    }
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_word_boundaries() {
        let set = TermSet::new(&["bot", "auto-"]).unwrap();
        assert!(set.found("both teams agreed").is_empty());
        assert_eq!(set.found("the Bot merges"), vec!["bot"]);
        assert_eq!(set.found("enable auto-merge"), vec!["auto-"]);
    }

    #[test]
    fn phrases_tolerate_line_breaks() {
        let set = TermSet::new(&["value judgment"]).unwrap();
        assert!(set.any("requires a value\n judgment call"));
    }

    #[test]
    fn strip_removes_phrases_case_insensitively() {
        let set = TermSet::new(&["the system", "shall"]).unwrap();
        let out = set.strip("The System shall log events");
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["log", "events"]);
    }

    #[test]
    fn blank_terms_are_ignored() {
        let set = TermSet::new(&["", "  "]).unwrap();
        assert!(set.is_empty());
        assert!(!set.any("anything"));
    }
}
