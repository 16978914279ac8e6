//! Engine configuration.
//!
//! Every threshold, window and vocabulary the detectors use lives here so
//! that tuning is a config change. The struct is versioned; files are TOML.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::extract::model::BudgetDeclaration;
use crate::util::terms::TermSet;

pub const CONFIG_VERSION: u32 = 1;

/// Looked up in the repository root when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lilos.toml";

/// Upper bound for any `[windows]` length, in days.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,
    pub paths: PathsConfig,
    pub rule_id: RuleIdConfig,
    pub analysis: AnalysisConfig,
    pub windows: WindowConfig,
    pub thresholds: ThresholdConfig,
    pub vocabulary: VocabularyConfig,
    pub budget: BudgetDeclaration,
    pub security: SecurityConfig,
    pub checks: CheckToggles,
    pub runtime: RuntimeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            paths: PathsConfig::default(),
            rule_id: RuleIdConfig::default(),
            analysis: AnalysisConfig::default(),
            windows: WindowConfig::default(),
            thresholds: ThresholdConfig::default(),
            vocabulary: VocabularyConfig::default(),
            budget: BudgetDeclaration::default(),
            security: SecurityConfig::default(),
            checks: CheckToggles::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Required rule documents. Directories expand to the `*.md` files inside.
    pub rule_documents: Vec<PathBuf>,
    /// Rule documents skipped when absent.
    pub optional_documents: Vec<PathBuf>,
    pub decision_log: PathBuf,
    /// Separate budget declaration; replaces the `[budget]` table when set.
    pub budget: Option<PathBuf>,
    pub agents_dir: PathBuf,
    pub memory_dir: PathBuf,
    pub explanation_marker: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rule_documents: vec![
                "docs/MASTER_RULES.md".into(),
                "docs/GOVERNANCE.md".into(),
                "docs/CONTEXT_BUDGET.md".into(),
            ],
            optional_documents: vec![".cursorrules".into()],
            decision_log: "docs/DECISION_LOG.md".into(),
            budget: None,
            agents_dir: "agents".into(),
            memory_dir: "memory".into(),
            explanation_marker: ".lil_os/EXPLANATION_FAILED".into(),
        }
    }
}

/// Closed vocabularies of the `<prefix>-<DOC>-<CAT>-<NNNN>` identifier grammar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuleIdConfig {
    pub prefix: String,
    pub documents: Vec<String>,
    pub categories: Vec<String>,
}

impl Default for RuleIdConfig {
    fn default() -> Self {
        let words = |s: &str| s.split_whitespace().map(String::from).collect();
        Self {
            prefix: "LIL".into(),
            documents: words("MR GOV CB RT WF QL SEC DATA API PERF CR"),
            categories: words("BOUNDARY AUTH PROCESS SAFETY SCOPE FORMAT BUDGET LOG RESET"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Jaccard overlap of subject tokens at or above which two rules share a subject.
    pub similarity_threshold: f64,
    pub scope_qualifiers: Vec<String>,
    pub stop_phrases: Vec<String>,
    pub stop_words: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            scope_qualifiers: vec![
                "in testing".into(),
                "in production".into(),
                "in development".into(),
                "in staging".into(),
            ],
            stop_phrases: vec!["the system".into(), "shall".into(), "must not".into()],
            stop_words: "a an the is are was were be been being have has had do does did \
                         will would should could may might must can cannot shall to of and \
                         or in on for with when under if only any all by at as from into \
                         its it this that these those not no"
                .split_whitespace()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub velocity_days: u32,
    /// Rolling review window, counted in most recent decision entries.
    pub review_entries: usize,
    pub override_days: u32,
    pub governance_change_days: u32,
    pub governance_log_slack_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            velocity_days: 30,
            review_entries: 20,
            override_days: 30,
            governance_change_days: 30,
            governance_log_slack_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    pub justification_decay: usize,
    pub metric_dominance_consecutive: usize,
    pub override_normalization: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            justification_decay: 2,
            metric_dominance_consecutive: 3,
            override_normalization: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VocabularyConfig {
    pub automation_indicators: Vec<String>,
    pub metric_markers: Vec<String>,
    pub override_markers: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            automation_indicators: list(&[
                "automate",
                "automated",
                "automatic",
                "automatically",
                "auto-",
                "without human",
                "no human",
                "bot",
                "agent will",
            ]),
            metric_markers: list(&[
                "latency",
                "throughput",
                "conversion",
                "engagement",
                "retention",
                "revenue",
                "cost",
                "velocity",
                "kpi",
                "okr",
            ]),
            override_markers: list(&["emergency override", "override:"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SecretPattern {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub secret_patterns: Vec<SecretPattern>,
    /// File names never scanned for secrets (they document the patterns).
    pub excluded_files: Vec<String>,
    /// Relative path to expected lowercase SHA-256 hex.
    pub checksums: BTreeMap<PathBuf, String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let p = |name: &str, pattern: &str| SecretPattern {
            name: name.into(),
            pattern: pattern.into(),
        };
        Self {
            secret_patterns: vec![
                p("api_key", r#"api[_-]?key\s*[:=]\s*["']?[a-z0-9_\-]{32,}"#),
                p("secret_key", r#"secret[_-]?key\s*[:=]\s*["']?[a-z0-9_\-]{32,}"#),
                p("sk_token", r"\bsk-[a-z0-9_\-]{32,}"),
                p("aws_access_key", r"\bAKIA[0-9A-Z]{16}\b"),
                p("bearer_token", r"\bbearer\s+[a-z0-9_\-\.=]{20,}"),
                p("password", r#"password\s*[:=]\s*["']?[^\s"']{12,}"#),
                p("private_key", r"-----BEGIN [A-Z ]*PRIVATE KEY-----"),
                p(
                    "connection_string",
                    r"\b[a-z][a-z0-9+.\-]*://[^\s:/@]+:[^\s:/@]+@[^\s/]+",
                ),
            ],
            excluded_files: vec!["SECURITY.md".into()],
            checksums: BTreeMap::new(),
        }
    }
}

/// Per-detector switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckToggles {
    pub contradiction: bool,
    pub automation_creep: bool,
    pub velocity: bool,
    pub decay: bool,
    pub budget: bool,
    pub integrity: bool,
    pub governance_changes: bool,
    pub secrets: bool,
    pub checksums: bool,
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            contradiction: true,
            automation_creep: true,
            velocity: true,
            decay: true,
            budget: true,
            integrity: true,
            governance_changes: true,
            secrets: true,
            checksums: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Upper bound on concurrent file reads and git invocations.
    pub workers: usize,
    /// Detector wall-clock budget. Unset means wait for every detector.
    pub timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Resolve configuration for a run rooted at `root`.
    ///
    /// An explicit path must exist. Without one, `<root>/lilos.toml` is used
    /// when present and built-in defaults otherwise.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, EngineError> {
        let path = match explicit {
            Some(p) => {
                if !p.is_file() {
                    return Err(EngineError::config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    info!("no {DEFAULT_CONFIG_FILE} in {}; using defaults", root.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        debug!(path = %path.display(), "loading configuration");
        let text = fs::read_to_string(&path)
            .map_err(|e| EngineError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Parse a TOML document. The `version` key is mandatory in files.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| EngineError::config(e.message().to_string()))?;
        if !table.contains_key("version") {
            return Err(EngineError::config("missing `version` key"));
        }
        let config: EngineConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| EngineError::config(e.message().to_string()))?;
        if config.version != CONFIG_VERSION {
            return Err(EngineError::config(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                config.version
            )));
        }
        Ok(config)
    }

    /// Check thresholds and compile every pattern the detectors need.
    pub fn compile(&self) -> Result<Matchers, EngineError> {
        let a = &self.analysis;
        if !(a.similarity_threshold > 0.0 && a.similarity_threshold <= 1.0) {
            return Err(EngineError::config(format!(
                "analysis.similarity_threshold must be in (0, 1], got {}",
                a.similarity_threshold
            )));
        }
        let w = &self.windows;
        if w.velocity_days == 0 || w.override_days == 0 || w.governance_change_days == 0 {
            return Err(EngineError::config("window lengths must be at least one day"));
        }
        let longest = [
            ("velocity_days", w.velocity_days),
            ("override_days", w.override_days),
            ("governance_change_days", w.governance_change_days),
            ("governance_log_slack_days", w.governance_log_slack_days),
        ]
        .into_iter()
        .find(|(_, days)| *days > MAX_WINDOW_DAYS);
        if let Some((name, days)) = longest {
            return Err(EngineError::config(format!(
                "windows.{name} must be at most {MAX_WINDOW_DAYS} days, got {days}"
            )));
        }
        if w.review_entries == 0 {
            return Err(EngineError::config("windows.review_entries must be at least 1"));
        }
        let t = &self.thresholds;
        if t.justification_decay == 0
            || t.metric_dominance_consecutive == 0
            || t.override_normalization == 0
        {
            return Err(EngineError::config("thresholds must be at least 1"));
        }
        if self.runtime.workers == 0 {
            return Err(EngineError::config("runtime.workers must be at least 1"));
        }
        if self.paths.rule_documents.is_empty() && self.paths.optional_documents.is_empty() {
            return Err(EngineError::config("no rule documents configured"));
        }
        for (path, digest) in &self.security.checksums {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(EngineError::config(format!(
                    "security.checksums: {} is not a SHA-256 hex digest",
                    path.display()
                )));
            }
        }

        let rule_id = rule_id_pattern(&self.rule_id)?;
        let compile_re = |pattern: String| {
            Regex::new(&pattern).map_err(|e| EngineError::config(format!("rule id grammar: {e}")))
        };
        let declared_id = compile_re(format!(r"\[({rule_id})\]"))?;
        let explicit_contradiction =
            compile_re(format!(r"(?i:contradicts)\s+\[?({rule_id})\]?"))?;

        let mut secrets = Vec::with_capacity(self.security.secret_patterns.len());
        for sp in &self.security.secret_patterns {
            let re = RegexBuilder::new(&sp.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    EngineError::config(format!("secret pattern `{}`: {e}", sp.name))
                })?;
            secrets.push((sp.name.clone(), re));
        }

        let terms = |name: &str, list: &[String]| {
            TermSet::new(list).map_err(|e| EngineError::config(format!("{name}: {e}")))
        };

        Ok(Matchers {
            declared_id,
            explicit_contradiction,
            scope_qualifiers: terms("analysis.scope_qualifiers", &a.scope_qualifiers)?,
            stop_phrases: terms("analysis.stop_phrases", &a.stop_phrases)?,
            automation_indicators: terms(
                "vocabulary.automation_indicators",
                &self.vocabulary.automation_indicators,
            )?,
            metric_markers: terms("vocabulary.metric_markers", &self.vocabulary.metric_markers)?,
            override_markers: terms(
                "vocabulary.override_markers",
                &self.vocabulary.override_markers,
            )?,
            secrets,
        })
    }
}

fn rule_id_pattern(cfg: &RuleIdConfig) -> Result<String, EngineError> {
    let alternation = |name: &str, words: &[String]| {
        if words.is_empty() {
            return Err(EngineError::config(format!("rule_id.{name} must not be empty")));
        }
        if let Some(bad) = words
            .iter()
            .find(|w| w.is_empty() || !w.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(EngineError::config(format!(
                "rule_id.{name}: `{bad}` is not an alphanumeric token"
            )));
        }
        Ok(words.join("|"))
    };
    if cfg.prefix.is_empty() || !cfg.prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::config("rule_id.prefix must be alphanumeric"));
    }
    Ok(format!(
        r"{}-(?:{})-(?:{})-\d{{4}}",
        cfg.prefix,
        alternation("documents", &cfg.documents)?,
        alternation("categories", &cfg.categories)?
    ))
}

/// Patterns compiled once per engine from an `EngineConfig`.
#[derive(Debug, Clone)]
pub struct Matchers {
    /// Bracketed canonical id; group 1 is the bare id.
    pub declared_id: Regex,
    /// `contradicts <id>`; group 1 is the bare id.
    pub explicit_contradiction: Regex,
    pub scope_qualifiers: TermSet,
    pub stop_phrases: TermSet,
    pub automation_indicators: TermSet,
    pub metric_markers: TermSet,
    pub override_markers: TermSet,
    pub secrets: Vec<(String, Regex)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_compile() {
        let m = EngineConfig::default().compile().expect("defaults are valid");
        assert!(m.declared_id.is_match("[LIL-MR-BOUNDARY-0001] text"));
        assert!(!m.declared_id.is_match("[LIL-XX-BOUNDARY-0001] text"));
        assert!(!m.declared_id.is_match("[LIL-MR-BOUNDARY-001] text"));
        assert!(!m.secrets.is_empty());
    }

    #[test]
    fn explicit_contradiction_accepts_bare_and_bracketed_ids() {
        let m = EngineConfig::default().compile().unwrap();
        let caps = m
            .explicit_contradiction
            .captures("This Contradicts [LIL-GOV-AUTH-0002].")
            .unwrap();
        assert_eq!(&caps[1], "LIL-GOV-AUTH-0002");
        let caps = m
            .explicit_contradiction
            .captures("contradicts LIL-GOV-AUTH-0003")
            .unwrap();
        assert_eq!(&caps[1], "LIL-GOV-AUTH-0003");
    }

    #[test]
    fn parses_partial_file_over_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            version = 1

            [analysis]
            similarity_threshold = 0.7

            [budget]
            max_rules = 5
            forbidden_automation_domains = ["value judgment"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.analysis.similarity_threshold, 0.7);
        assert_eq!(cfg.analysis.stop_phrases, AnalysisConfig::default().stop_phrases);
        assert_eq!(cfg.budget.max_rules, Some(5));
        assert_eq!(cfg.windows, WindowConfig::default());
    }

    #[test]
    fn missing_version_is_invalid() {
        let err = EngineConfig::from_toml_str("[budget]\nmax_rules = 5\n").unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationInvalid(_)));
    }

    #[test]
    fn unknown_version_is_invalid() {
        let err = EngineConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(err.to_string().contains("unsupported config version"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("version = 1\n[analysis]\nsimilarity = 0.4\n");
        assert!(err.is_err());
    }

    #[test]
    fn threshold_out_of_range_is_invalid() {
        let mut cfg = EngineConfig::default();
        cfg.analysis.similarity_threshold = 1.5;
        assert!(matches!(cfg.compile(), Err(EngineError::ConfigurationInvalid(_))));
    }

    #[test]
    fn bad_secret_pattern_is_invalid() {
        let mut cfg = EngineConfig::default();
        cfg.security.secret_patterns.push(SecretPattern {
            name: "broken".into(),
            pattern: "([unclosed".into(),
        });
        let err = cfg.compile().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn empty_vocabulary_is_invalid() {
        let mut cfg = EngineConfig::default();
        cfg.rule_id.categories.clear();
        assert!(cfg.compile().is_err());
    }

    #[test]
    fn oversized_windows_are_invalid() {
        let mut cfg = EngineConfig::default();
        cfg.windows.velocity_days = 200_000_000;
        let err = cfg.compile().unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("windows.velocity_days"));

        let mut cfg = EngineConfig::default();
        cfg.windows.governance_log_slack_days = MAX_WINDOW_DAYS + 1;
        assert!(cfg.compile().is_err());

        let mut cfg = EngineConfig::default();
        cfg.windows.override_days = MAX_WINDOW_DAYS;
        assert!(cfg.compile().is_ok());
    }

    #[test]
    fn malformed_checksum_is_invalid() {
        let mut cfg = EngineConfig::default();
        cfg.security
            .checksums
            .insert("scripts/check.sh".into(), "abc".into());
        assert!(cfg.compile().is_err());
    }

    #[test]
    fn load_uses_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::load(dir.path(), None).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn load_reads_default_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        writeln!(f, "version = 1\n[runtime]\nworkers = 2").unwrap();
        let cfg = EngineConfig::load(dir.path(), None).unwrap();
        assert_eq!(cfg.runtime.workers, 2);
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationInvalid(_)));
    }
}
