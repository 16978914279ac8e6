//! Pinned file checksums.

use serde_json::json;

use crate::checks::CheckContext;
use crate::checks::catalog::{Code, Detector};
use crate::report::model::Finding;

pub fn check(ctx: &CheckContext) -> Vec<Finding> {
    ctx.corpus
        .sources
        .checksums
        .iter()
        .filter_map(|target| match &target.actual {
            None => Some(
                Finding::warn(
                    Code::ChecksumSourceMissing,
                    Detector::Checksums,
                    format!("checksummed file {} is missing", target.path),
                )
                .with_details(json!({ "file": target.path, "expected": target.expected })),
            ),
            Some(actual) if *actual != target.expected => Some(
                Finding::hard_fail(
                    Code::ChecksumMismatch,
                    Detector::Checksums,
                    format!("{} does not match its pinned SHA-256", target.path),
                )
                .with_details(json!({
                    "file": target.path,
                    "expected": target.expected,
                    "actual": actual,
                })),
            ),
            Some(_) => None,
        })
        .collect()
}
