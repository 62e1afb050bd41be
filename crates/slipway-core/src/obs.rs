//! Structured observability hooks for deploy run lifecycle events.
//!
//! Emission functions for the key lifecycle points: run start, change
//! resolution, per-service deploy, run finish. Events carry a `run_id` via
//! the `RunSpan` RAII guard so one pipeline run can be followed through the
//! build server's logs.

use tracing::info;

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// pipeline run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("slipway.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: pipeline run started.
pub fn emit_run_started(run_id: &str, tag: &str, dry_run: bool) {
    info!(event = "run.started", run_id = %run_id, tag = %tag, dry_run = dry_run);
}

/// Emit event: changed files resolved against monitored roots.
pub fn emit_changes_resolved(run_id: &str, changed_files: usize, impacted: usize) {
    info!(
        event = "run.changes_resolved",
        run_id = %run_id,
        changed_files = changed_files,
        impacted = impacted,
    );
}

/// Emit event: one service deploy finished.
pub fn emit_service_deployed(run_id: &str, service: &str, success: bool, duration_ms: u64) {
    info!(
        event = "run.service_deployed",
        run_id = %run_id,
        service = %service,
        success = success,
        duration_ms = duration_ms,
    );
}

/// Emit event: pipeline run finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, deployed: usize, failed: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        deployed = deployed,
        failed = failed,
        success = success,
    );
}
