use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::report::model::Finding;

/// The explanation-failure marker forces a failing run by its mere presence.
pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    let Some(path) = &ctx.corpus.sources.explanation_marker else {
        return Vec::new();
    };
    vec![
        Finding::hard_fail(
            Code::ExplanationFailure,
            Detector::Marker,
            format!("explanation failure marker present at {path}; a change could not be explained"),
        )
        .with_details(json!({ "path": path })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing;
    use crate::config::EngineConfig;
    use crate::report::model::Level;

    #[test]
    fn absent_marker_is_silent() {
        assert!(check(&testing::context("", "")).is_empty());
    }

    #[test]
    fn present_marker_fails() {
        let mut sources = testing::sources("", "");
        sources.explanation_marker = Some(".lil_os/EXPLANATION_FAILED".into());
        let ctx = testing::context_with(sources, EngineConfig::default());

        let findings = check(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Level::HardFail);
        assert_eq!(findings[0].code, Code::ExplanationFailure);
    }
}
