use colored::Colorize;

use crate::TOOL_NAME;
use crate::report::model::{Level, Report, Status};
use crate::util::deterministic::display_order;

/// Human-readable console report, ordered by severity then detector.
///
/// Colour is controlled globally through `colored::control`.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} (today {})\n",
        TOOL_NAME, report.tool.version, report.today
    ));

    if !report.complete {
        out.push_str(&format!(
            "{}\n",
            "Validation did not finish; results below are partial.".yellow().bold()
        ));
    }

    for f in display_order(&report.findings) {
        out.push_str(&format!("{} {}: {}\n", level_tag(f.level), f.code, f.message));
        let has_details = f.details.as_object().is_some_and(|m| !m.is_empty());
        if has_details {
            let details = serde_json::to_string(&f.details).unwrap_or_default();
            out.push_str(&format!("  {} {}\n", "details:".dimmed(), details));
        }
    }

    out.push_str(&format!(
        "\nSummary: {} hard fail(s), {} warning(s), {} info, {} total finding(s).\n",
        report.summary.hard_fail, report.summary.warn, report.summary.info, report.summary.total
    ));
    out.push_str(&format!("Status: {}\n", status_tag(report.status)));
    out
}

/// Machine-readable report, one record per finding.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

fn level_tag(level: Level) -> String {
    let tag = format!("[{level}]");
    match level {
        Level::HardFail => tag.red().bold().to_string(),
        Level::Warn => tag.yellow().to_string(),
        Level::Info => tag.cyan().to_string(),
    }
}

fn status_tag(status: Status) -> String {
    let text = status.to_string();
    match status {
        Status::HardFail => text.red().bold().to_string(),
        Status::Warn => text.yellow().bold().to_string(),
        Status::Ok => text.green().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::catalog::{Code, Detector};
    use crate::report::model::{Finding, ToolInfo};
    use chrono::NaiveDate;
    use serde_json::json;

    fn report(findings: Vec<Finding>, complete: bool) -> Report {
        Report::new(
            ToolInfo {
                name: "lilos".into(),
                version: "0.1.0".into(),
                commit: None,
            },
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            findings,
            complete,
        )
    }

    #[test]
    fn text_lists_hard_fail_before_warn() {
        colored::control::set_override(false);
        let text = render_text(&report(
            vec![
                Finding::warn(Code::AutomationCreep, Detector::AutomationCreep, "creep"),
                Finding::hard_fail(Code::SecretDetected, Detector::Secrets, "secret")
                    .with_details(json!({"file": "docs/DECISION_LOG.md"})),
            ],
            true,
        ));

        let hard = text.find("[HARD_FAIL] SECRET_DETECTED").unwrap();
        let warn = text.find("[WARN] AUTOMATION_CREEP").unwrap();
        assert!(hard < warn);
        assert!(text.contains("details: {\"file\":\"docs/DECISION_LOG.md\"}"));
        assert!(text.contains("Status: HARD_FAIL"));
    }

    #[test]
    fn text_flags_partial_results() {
        colored::control::set_override(false);
        let text = render_text(&report(vec![], false));
        assert!(text.contains("partial"));
        assert!(text.contains("Status: OK"));
    }

    #[test]
    fn json_round_trips() {
        let r = report(
            vec![Finding::info(Code::ReviewOverdue, Detector::Decay, "overdue")],
            true,
        );
        let json = render_json(&r).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
