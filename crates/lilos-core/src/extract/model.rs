use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normative keyword carried by a rule line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Normative {
    #[serde(rename = "MUST")]
    Must,
    #[serde(rename = "MUST NOT")]
    MustNot,
    #[serde(rename = "SHOULD")]
    Should,
    #[serde(rename = "SHOULD NOT")]
    ShouldNot,
    #[serde(rename = "MAY")]
    May,
}

/// Obligation strength and polarity derived from a normative keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    ObligatoryPositive,
    ObligatoryNegative,
    AdvisoryPositive,
    AdvisoryNegative,
    Permissive,
}

impl Normative {
    /// All keywords, longest form first so `MUST NOT` wins over `MUST`.
    pub const ALL: [Normative; 5] = [
        Normative::MustNot,
        Normative::Must,
        Normative::ShouldNot,
        Normative::Should,
        Normative::May,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Normative::Must => "MUST",
            Normative::MustNot => "MUST NOT",
            Normative::Should => "SHOULD",
            Normative::ShouldNot => "SHOULD NOT",
            Normative::May => "MAY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn strength(&self) -> Strength {
        match self {
            Normative::Must => Strength::ObligatoryPositive,
            Normative::MustNot => Strength::ObligatoryNegative,
            Normative::Should => Strength::AdvisoryPositive,
            Normative::ShouldNot => Strength::AdvisoryNegative,
            Normative::May => Strength::Permissive,
        }
    }
}

impl std::fmt::Display for Normative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where something was read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

/// One governance statement.
///
/// Rules have no persistence of their own; they are recomputed from
/// document text on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    /// Full trimmed line text.
    pub text: String,
    pub location: Location,
    pub keyword: Normative,
    /// Normalized subject phrase.
    pub subject: String,
    /// Word tokens of `subject`, used for similarity.
    pub tokens: BTreeSet<String>,
    /// Configured scope qualifiers stated in the rule text.
    pub qualifiers: BTreeSet<String>,
}

impl Rule {
    pub fn strength(&self) -> Strength {
        self.keyword.strength()
    }
}

/// A line that declares a rule id but carries no normative keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct UnkeyedRule {
    pub id: String,
    pub text: String,
    pub location: Location,
}

/// A mention of a rule id that is not the line's declared id.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleReference {
    pub target: String,
    /// Declared id of the line the reference appears on, if any.
    pub from: Option<String>,
    pub location: Location,
    /// True when phrased as `contradicts <id>`.
    pub contradicts: bool,
}

/// One logged decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionEntry {
    /// 1-based position in the log.
    pub index: usize,
    /// Line of the `Date:` field.
    pub line: usize,
    pub date_raw: String,
    pub date: Option<NaiveDate>,
    pub decision: String,
    pub trigger: String,
    pub rationale: String,
    pub tradeoffs: String,
    pub expected_impact: String,
    pub review_date: Option<NaiveDate>,
    /// Raw entry text, from the `Date:` line to the next entry.
    pub body: String,
    /// Display names of required fields that are empty.
    pub missing: Vec<String>,
    pub complete: bool,
    /// Commit that introduced this entry, when history is available.
    pub commit_hash: Option<String>,
    pub commit_date: Option<NaiveDate>,
}

impl DecisionEntry {
    /// Identity of the entry across historical revisions of the log.
    pub fn key(&self, ordinal: usize) -> EntryKey {
        EntryKey {
            date: self.date_raw.trim().to_string(),
            ordinal,
        }
    }
}

/// `(Date value, ordinal among entries sharing that value)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryKey {
    pub date: String,
    pub ordinal: usize,
}

/// Ceilings and forbidden lists. An absent ceiling is unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetDeclaration {
    pub max_rules: Option<usize>,
    pub max_agents: Option<usize>,
    pub max_memory_artifacts: Option<usize>,
    pub forbidden_automation_domains: Vec<String>,
    pub memory_required_metadata: Vec<String>,
}

impl Default for BudgetDeclaration {
    fn default() -> Self {
        Self {
            max_rules: None,
            max_agents: None,
            max_memory_artifacts: None,
            forbidden_automation_domains: vec![
                "value judgment".into(),
                "moral tradeoff".into(),
                "irreversible harm".into(),
                "without audit".into(),
            ],
            memory_required_metadata: vec![
                "purpose".into(),
                "retention".into(),
                "review trigger".into(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_strength_mapping() {
        assert_eq!(Normative::Must.strength(), Strength::ObligatoryPositive);
        assert_eq!(Normative::MustNot.strength(), Strength::ObligatoryNegative);
        assert_eq!(Normative::Should.strength(), Strength::AdvisoryPositive);
        assert_eq!(Normative::ShouldNot.strength(), Strength::AdvisoryNegative);
        assert_eq!(Normative::May.strength(), Strength::Permissive);
    }

    #[test]
    fn keyword_parse_and_serialize() {
        assert_eq!(Normative::parse("SHOULD NOT"), Some(Normative::ShouldNot));
        assert_eq!(Normative::parse("must"), None);
        assert_eq!(serde_json::to_string(&Normative::MustNot).unwrap(), "\"MUST NOT\"");
    }

    #[test]
    fn budget_declaration_parses_partial_toml() {
        let budget: BudgetDeclaration = toml::from_str("max_rules = 5\n").unwrap();
        assert_eq!(budget.max_rules, Some(5));
        assert_eq!(budget.max_agents, None);
        assert!(!budget.forbidden_automation_domains.is_empty());
    }
}
