//! Engine entry points: load, extract, detect, aggregate.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info};

use crate::checks::battery;
use crate::checks::catalog::{Code, Detector};
use crate::checks::{CheckContext, enabled_detectors};
use crate::config::{EngineConfig, Matchers};
use crate::error::EngineError;
use crate::extract::Corpus;
use crate::report::aggregate::merge;
use crate::report::model::{Finding, Report, ToolInfo};
use crate::source::loader::{self, LoadScope, Sources};

/// A validated configuration and the matchers compiled from it.
///
/// Construction is the only place configuration can be rejected; once an
/// `Engine` exists every run produces a report or a `SourceUnavailable`.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    matchers: Matchers,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let matchers = config.compile()?;
        Ok(Self { config, matchers })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full battery over every governance source under `root`.
    pub fn check(&self, root: &Path, today: NaiveDate, tool: ToolInfo) -> Result<Report, EngineError> {
        self.run(root, today, tool, LoadScope::Full)
    }

    /// Rule documents only: marker and rule lint.
    pub fn lint(&self, root: &Path, today: NaiveDate, tool: ToolInfo) -> Result<Report, EngineError> {
        self.run(root, today, tool, LoadScope::RulesOnly)
    }

    fn run(
        &self,
        root: &Path,
        today: NaiveDate,
        tool: ToolInfo,
        scope: LoadScope,
    ) -> Result<Report, EngineError> {
        info!(root = %root.display(), %today, ?scope, "validating governance sources");
        let sources = loader::load(root, &self.config, scope, today)?;
        let source_findings = source_findings(&sources, scope);

        let corpus = Corpus::build(sources, &self.config, &self.matchers);
        let detectors = enabled_detectors(scope, &self.config.checks);
        debug!(detectors = detectors.len(), "running detector battery");

        let ctx = Arc::new(CheckContext {
            corpus,
            config: self.config.clone(),
            matchers: self.matchers.clone(),
        });
        let outcome = battery::run(ctx, &detectors);

        let findings = merge(vec![
            (Detector::Sources, source_findings),
            (Detector::Battery, outcome.findings),
        ]);
        Ok(Report::new(tool, today, findings, outcome.complete))
    }
}

fn source_findings(sources: &Sources, scope: LoadScope) -> Vec<Finding> {
    if scope != LoadScope::Full {
        return Vec::new();
    }
    match sources.history.unavailable_reason() {
        Some(reason) => vec![
            Finding::warn(
                Code::HistoryUnavailable,
                Detector::Sources,
                "commit history unavailable; history-based checks are skipped",
            )
            .with_details(json!({ "reason": reason })),
        ],
        None => Vec::new(),
    }
}
