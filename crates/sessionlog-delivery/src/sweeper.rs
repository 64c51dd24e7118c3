//! Startup resubmission of snapshots left behind by earlier sessions.

use futures::future::join_all;
use tracing::{error, info};

use crate::pipeline::DeliveryPipeline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub found: usize,
    pub delivered: usize,
    pub deferred: usize,
    pub unreadable: usize,
}

/// Attempts one upload per stale file. Files stamped `exclude_stamp` belong to
/// the running session and are left alone. A file that cannot be read is
/// logged and skipped without affecting the others.
pub async fn sweep_unsent(pipeline: &DeliveryPipeline, exclude_stamp: &str) -> SweepReport {
    let mut report = SweepReport::default();
    if !pipeline.mode().send_to_server {
        return report;
    }

    let candidates = match pipeline.store().list_unsent(exclude_stamp) {
        Ok(candidates) => candidates,
        Err(err) => {
            error!("Error scanning for unsent logs: {err}");
            return report;
        }
    };
    report.found = candidates.len();

    let mut uploads = Vec::with_capacity(candidates.len());
    for path in candidates {
        match pipeline.store().read(&path) {
            Ok(json) => {
                info!("Found previous unsent log file {:?}; attempting to send", path);
                uploads.push(async move { pipeline.upload_only(json, &path).await });
            }
            Err(err) => {
                error!("Error reading previous log file: {err}");
                report.unreadable += 1;
            }
        }
    }

    for outcome in join_all(uploads).await {
        if outcome.succeeded() {
            report.delivered += 1;
        } else {
            report.deferred += 1;
        }
    }

    if report.found > 0 {
        info!(
            "Unsent log sweep finished: {} found, {} delivered, {} deferred, {} unreadable",
            report.found, report.delivered, report.deferred, report.unreadable
        );
    }
    report
}
