//! Concurrent detector execution under a wall-clock deadline.
//!
//! Responsibilities:
//! - Run each enabled detector on its own named thread
//! - Collect batches as they finish, in any order
//! - Stop waiting at the deadline and report what did not finish
//! - Fail the run when a detector panics, since its findings are unknown
//!
//! Non-responsibilities:
//! - Cancelling detectors (late threads finish detached; their results are dropped)
//! - Ordering findings (handled in `report::aggregate::merge`)

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, warn};

use crate::checks::catalog::{Code, Detector};
use crate::checks::{CheckContext, run_detector};
use crate::report::aggregate::merge;
use crate::report::model::Finding;

/// Merged findings of one battery run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub findings: Vec<Finding>,
    /// False when at least one detector missed the deadline or panicked.
    pub complete: bool,
}

/// Run `detectors` against `ctx` with the configured deadline.
pub fn run(ctx: Arc<CheckContext>, detectors: &[Detector]) -> Outcome {
    let timeout = ctx.config.runtime.timeout_ms.map(Duration::from_millis);
    run_with(ctx, detectors, timeout, run_detector)
}

pub(crate) fn run_with<F>(
    ctx: Arc<CheckContext>,
    detectors: &[Detector],
    timeout: Option<Duration>,
    runner: F,
) -> Outcome
where
    F: Fn(Detector, &CheckContext) -> Vec<Finding> + Send + Sync + 'static,
{
    let runner = Arc::new(runner);
    let (tx, rx) = mpsc::channel::<(Detector, Result<Vec<Finding>, String>)>();
    let mut pending: BTreeSet<Detector> = detectors.iter().copied().collect();
    let mut failed: BTreeMap<Detector, String> = BTreeMap::new();
    let mut batches: Vec<(Detector, Vec<Finding>)> = Vec::with_capacity(detectors.len());

    for &detector in detectors {
        let task_ctx = Arc::clone(&ctx);
        let task_runner = Arc::clone(&runner);
        let task_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("lilos-{detector}"))
            .spawn(move || {
                let result = guarded(|| task_runner(detector, &task_ctx));
                // The receiver is gone once the deadline has passed.
                let _ = task_tx.send((detector, result));
            });
        if let Err(e) = spawned {
            warn!(%detector, "could not spawn detector thread ({e}); running inline");
            pending.remove(&detector);
            match guarded(|| runner(detector, &ctx)) {
                Ok(findings) => batches.push((detector, findings)),
                Err(reason) => {
                    failed.insert(detector, reason);
                }
            }
        }
    }
    drop(tx);

    let deadline = timeout.map(|t| Instant::now() + t);
    while !pending.is_empty() {
        let received = match deadline {
            Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok((detector, Ok(findings))) => {
                debug!(%detector, findings = findings.len(), "detector finished");
                pending.remove(&detector);
                batches.push((detector, findings));
            }
            Ok((detector, Err(reason))) => {
                warn!(%detector, %reason, "detector panicked");
                pending.remove(&detector);
                failed.insert(detector, reason);
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(pending = pending.len(), "detector deadline expired");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(pending = pending.len(), "detector threads exited without reporting");
                break;
            }
        }
    }

    let complete = pending.is_empty() && failed.is_empty();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.keys().map(Detector::as_str).collect();
        let errors: BTreeMap<&str, &str> = failed
            .iter()
            .map(|(d, reason)| (d.as_str(), reason.as_str()))
            .collect();
        batches.push((
            Detector::Battery,
            vec![
                Finding::hard_fail(
                    Code::DetectorFailed,
                    Detector::Battery,
                    format!("detector failure: {} panicked", names.join(", ")),
                )
                .with_details(json!({ "failed": names, "errors": errors })),
            ],
        ));
    }
    if !pending.is_empty() {
        let names: Vec<&str> = pending.iter().map(Detector::as_str).collect();
        batches.push((
            Detector::Battery,
            vec![
                Finding::info(
                    Code::ValidationIncomplete,
                    Detector::Battery,
                    format!("validation incomplete: {} did not finish", names.join(", ")),
                )
                .with_details(json!({
                    "pending": names,
                    "timeout_ms": timeout.map(|t| t.as_millis() as u64),
                })),
            ],
        ));
    }

    Outcome {
        findings: merge(batches),
        complete,
    }
}

/// Run `task`, turning a panic into its message.
fn guarded<F>(task: F) -> Result<Vec<Finding>, String>
where
    F: FnOnce() -> Vec<Finding>,
{
    panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}
