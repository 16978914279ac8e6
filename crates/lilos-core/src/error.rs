use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a run before a report can be produced.
///
/// Everything else (unreadable history, malformed entries, detector
/// timeouts) is reported as a finding instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required input file is missing or unreadable.
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Configuration is malformed or names thresholds the detectors cannot apply.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
}

impl EngineError {
    pub fn source(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_names_path() {
        let err = EngineError::source("docs/DECISION_LOG.md", "not found");
        assert_eq!(
            err.to_string(),
            "source unavailable: docs/DECISION_LOG.md: not found"
        );
    }

    #[test]
    fn config_error_message() {
        let err = EngineError::config("similarity_threshold must be in (0, 1]");
        assert!(err.to_string().starts_with("configuration invalid:"));
    }
}
