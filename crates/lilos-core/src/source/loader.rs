//! Document Loader.
//!
//! The only stage that performs I/O. Everything it returns is owned,
//! immutable input for the extraction and detection stages.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extract::model::BudgetDeclaration;
use crate::source::history::{self, History};
use crate::source::read::{self, Document};
use crate::util::pool::map_bounded;

/// How much of the corpus a run needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadScope {
    /// Rule documents only (the `lint` command).
    RulesOnly,
    /// Everything the full detector battery consumes.
    Full,
}

/// A file under the memory directory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryArtifact {
    pub path: String,
    pub text: String,
}

/// A configured checksum and what the working tree currently hashes to.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecksumTarget {
    pub path: String,
    pub expected: String,
    /// `None` when the file is missing.
    pub actual: Option<String>,
}

/// Raw inputs of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Sources {
    pub root: PathBuf,
    pub today: NaiveDate,
    pub rule_documents: Vec<Document>,
    pub decision_log: Option<Document>,
    pub budget: BudgetDeclaration,
    pub agent_count: usize,
    pub memory_artifacts: Vec<MemoryArtifact>,
    pub checksums: Vec<ChecksumTarget>,
    /// Path of the explanation-failure marker, when present.
    pub explanation_marker: Option<String>,
    pub history: History,
}

impl Sources {
    /// Every text source scanned for secrets: rule documents, then the log.
    pub fn texts(&self) -> impl Iterator<Item = &Document> {
        self.rule_documents.iter().chain(self.decision_log.iter())
    }
}

/// Load all inputs for a run rooted at `root`.
///
/// Missing required files abort with `SourceUnavailable`. A root that is not
/// under version control yields `History::Unavailable` instead of an error.
pub fn load(
    root: &Path,
    config: &EngineConfig,
    scope: LoadScope,
    today: NaiveDate,
) -> Result<Sources, EngineError> {
    let workers = config.runtime.workers;
    let paths = &config.paths;

    let mut rule_paths: Vec<PathBuf> = Vec::new();
    for rel in &paths.rule_documents {
        let files = read::expand_source(root, rel)
            .ok_or_else(|| EngineError::source(root.join(rel), "required rule document not found"))?;
        rule_paths.extend(files);
    }
    for rel in &paths.optional_documents {
        match read::expand_source(root, rel) {
            Some(files) => rule_paths.extend(files),
            None => info!(path = %rel.display(), "optional rule document absent; skipping"),
        }
    }
    dedup_in_order(&mut rule_paths);

    let rule_documents = map_bounded(rule_paths, workers, |rel| -> Result<Document, EngineError> {
        let doc = read::read_document(root, &rel)?;
        debug!(path = %doc.path, bytes = doc.size_bytes, sha256 = %doc.sha256, "read rule document");
        Ok(doc)
    })
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    let explanation_marker = root
        .join(&paths.explanation_marker)
        .exists()
        .then(|| read::display_path(&paths.explanation_marker));

    if scope == LoadScope::RulesOnly {
        return Ok(Sources {
            root: root.to_path_buf(),
            today,
            rule_documents,
            decision_log: None,
            budget: config.budget.clone(),
            agent_count: 0,
            memory_artifacts: Vec::new(),
            checksums: Vec::new(),
            explanation_marker,
            history: History::Unavailable("history not loaded for rule lint".into()),
        });
    }

    let decision_log = read::read_document(root, &paths.decision_log)?;
    let budget = load_budget(root, config)?;

    let agent_count = read::list_files(&root.join(&paths.agents_dir)).len();
    let memory_files: Vec<PathBuf> = read::list_files(&root.join(&paths.memory_dir))
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    let memory_artifacts = map_bounded(memory_files, workers, |rel| {
        read::read_document(root, &rel).map(|doc| MemoryArtifact {
            path: doc.path,
            text: doc.text,
        })
    })
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    let checksums = config
        .security
        .checksums
        .iter()
        .map(|(rel, expected)| ChecksumTarget {
            path: read::display_path(rel),
            expected: expected.to_ascii_lowercase(),
            actual: fs::read(root.join(rel)).ok().map(|b| read::sha256_hex(&b)),
        })
        .collect();

    let history = load_history(root, &rule_documents, &decision_log, workers, today);

    Ok(Sources {
        root: root.to_path_buf(),
        today,
        rule_documents,
        decision_log: Some(decision_log),
        budget,
        agent_count,
        memory_artifacts,
        checksums,
        explanation_marker,
        history,
    })
}

fn load_budget(root: &Path, config: &EngineConfig) -> Result<BudgetDeclaration, EngineError> {
    let Some(rel) = &config.paths.budget else {
        return Ok(config.budget.clone());
    };
    let doc = read::read_document(root, rel)?;
    toml::from_str(&doc.text)
        .map_err(|e| EngineError::config(format!("budget declaration {}: {}", doc.path, e.message())))
}

fn load_history(
    root: &Path,
    rule_documents: &[Document],
    decision_log: &Document,
    workers: usize,
    today: NaiveDate,
) -> History {
    if let Err(e) = history::probe(root) {
        warn!("commit history unavailable: {e}");
        return History::Unavailable(e.to_string());
    }

    let tracked: Vec<&Document> = rule_documents.iter().chain([decision_log]).collect();
    let results = map_bounded(tracked, workers, |doc| {
        history::file_history(root, &doc.path, Some(&doc.text), today)
    });

    match results.into_iter().collect::<Result<Vec<_>, _>>() {
        Ok(files) => History::Available(files),
        Err(e) => {
            warn!("commit history unavailable: {e}");
            History::Unavailable(e.to_string())
        }
    }
}

fn dedup_in_order(paths: &mut Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}
