//! Rule Extractor.
//!
//! A line that carries a bracketed canonical id declares a rule. The first
//! id on the line is the declaration; every later id, and every
//! `contradicts <id>` phrase, is a reference to another rule.

use crate::config::Matchers;
use crate::extract::model::{Location, Rule, RuleReference, UnkeyedRule};
use crate::extract::subject::{Analyzer, find_keyword};
use crate::source::read::Document;

/// Everything the extractor found across the rule documents, in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub rules: Vec<Rule>,
    pub unkeyed: Vec<UnkeyedRule>,
    pub references: Vec<RuleReference>,
}

pub fn extract(documents: &[Document], matchers: &Matchers, analyzer: &Analyzer<'_>) -> Extraction {
    let mut out = Extraction::default();
    for doc in documents {
        for (idx, raw) in doc.text.lines().enumerate() {
            scan_line(&mut out, doc, idx + 1, raw, matchers, analyzer);
        }
    }
    out
}

fn scan_line(
    out: &mut Extraction,
    doc: &Document,
    line_no: usize,
    raw: &str,
    matchers: &Matchers,
    analyzer: &Analyzer<'_>,
) {
    let mut ids = matchers.declared_id.captures_iter(raw).filter_map(|c| c.get(1));
    let Some(first) = ids.next() else {
        return;
    };
    let declared = first.as_str().to_string();
    let text = raw.trim().to_string();
    let location = Location {
        file: doc.path.clone(),
        line: line_no,
    };

    let mut references: Vec<RuleReference> = ids
        .map(|m| m.as_str())
        .filter(|target| *target != declared)
        .map(|target| RuleReference {
            target: target.to_string(),
            from: Some(declared.clone()),
            location: location.clone(),
            contradicts: false,
        })
        .collect();

    for caps in matchers.explicit_contradiction.captures_iter(raw) {
        let Some(target) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if target == declared {
            continue;
        }
        match references.iter_mut().find(|r| r.target == target) {
            Some(existing) => existing.contradicts = true,
            None => references.push(RuleReference {
                target: target.to_string(),
                from: Some(declared.clone()),
                location: location.clone(),
                contradicts: true,
            }),
        }
    }
    out.references.extend(references);

    match find_keyword(raw) {
        Some((keyword, _)) => {
            let subject = analyzer.subject(raw);
            out.rules.push(Rule {
                id: declared,
                text,
                location,
                keyword,
                subject: subject.phrase,
                tokens: subject.tokens,
                qualifiers: subject.qualifiers,
            });
        }
        None => out.unkeyed.push(UnkeyedRule {
            id: declared,
            text,
            location,
        }),
    }
}
