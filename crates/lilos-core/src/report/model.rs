use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::checks::catalog::{Code, Detector};
use crate::report::aggregate::{Rollup, Summary, rollup};

/// Severity of a single finding. Ordering is semantic: INFO < WARN < HARD_FAIL.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Info,
    Warn,
    HardFail,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::HardFail => "HARD_FAIL",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detector output. Findings are produced fresh per run and never mutated
/// once handed to the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub level: Level,
    pub code: Code,
    pub detector: Detector,
    pub message: String,
    pub details: serde_json::Value,
}

impl Finding {
    pub fn new(level: Level, code: Code, detector: Detector, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            detector,
            message: message.into(),
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn hard_fail(code: Code, detector: Detector, message: impl Into<String>) -> Self {
        Self::new(Level::HardFail, code, detector, message)
    }

    pub fn warn(code: Code, detector: Detector, message: impl Into<String>) -> Self {
        Self::new(Level::Warn, code, detector, message)
    }

    pub fn info(code: Code, detector: Detector, message: impl Into<String>) -> Self {
        Self::new(Level::Info, code, detector, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Overall run status: the maximum severity present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Warn,
    HardFail,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Warn => "WARN",
            Status::HardFail => "HARD_FAIL",
        })
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub commit: Option<String>,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: crate::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: None,
        }
    }
}

/// Top-level report.
///
/// This is the machine-readable contract consumed by CI. It must be
/// identical for identical inputs and an identical `today`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub today: NaiveDate,
    pub status: Status,
    pub exit_code: i32,
    /// False when the detector deadline expired before every detector reported.
    pub complete: bool,
    pub summary: Summary,
    pub findings: Vec<Finding>,
}

impl Report {
    /// Assemble a report from findings already merged in detector order.
    pub fn new(tool: ToolInfo, today: NaiveDate, findings: Vec<Finding>, complete: bool) -> Self {
        let Rollup {
            status,
            exit_code,
            summary,
        } = rollup(&findings);

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            today,
            status,
            exit_code,
            complete,
            summary,
            findings,
        }
    }

    pub fn has_code(&self, code: Code) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    pub fn with_code(&self, code: Code) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.code == code).collect()
    }
}
