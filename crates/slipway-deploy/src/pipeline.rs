//! Deployment pipeline orchestration.
//!
//! Sequential and explicit: materialize the changed-file list, resolve it
//! against the monitored roots, then refresh each impacted service in root
//! order. All collaborators come in as trait objects; the pipeline itself
//! holds no state between runs.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use slipway_core::domain::{ChangeComparisonSpec, ImpactedServiceSet, Result};
use slipway_core::obs::{self, RunSpan};
use slipway_core::resolver::ChangeSetResolver;

use crate::deploy::{DeployExecutor, DeployOutcome};
use crate::diff_source::DiffSource;

/// What one pipeline run intends to do.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    /// Refs, remote, and monitored roots.
    pub spec: ChangeComparisonSpec,

    /// Build tag every impacted service is moved to.
    pub tag: String,

    /// Resolve and report without touching the deployer.
    pub dry_run: bool,
}

impl PipelinePlan {
    pub fn new(spec: ChangeComparisonSpec, tag: impl Into<String>) -> Self {
        Self {
            spec,
            tag: tag.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Per-service deployment record.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDeployResult {
    pub service: String,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DeployOutcome>,
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Unique id for this run, carried on every log line.
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    /// Digest of the ordered impacted services and target tag; identical
    /// plans produce identical digests.
    pub plan_digest: String,

    pub tag: String,
    pub dry_run: bool,

    pub changed_file_count: usize,

    /// Impacted service names in deploy order.
    pub impacted: Vec<String>,

    /// One entry per attempted service deploy (empty on dry runs).
    pub services: Vec<ServiceDeployResult>,

    /// Whether every attempted deploy succeeded.
    pub success: bool,

    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn deployed_count(&self) -> usize {
        self.services.iter().filter(|s| s.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.services.iter().filter(|s| !s.success).count()
    }
}

/// Sequential deployment pipeline.
pub struct DeployPipeline;

impl DeployPipeline {
    /// Run change detection and redeploy every impacted service in order.
    ///
    /// A failure to obtain the changed-file list fails the run before
    /// anything is deployed. Per-service failures are recorded and do not
    /// stop later services; the run as a whole fails if any service failed.
    pub async fn run(
        diff_source: &dyn DiffSource,
        deployer: &dyn DeployExecutor,
        plan: &PipelinePlan,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let _span = RunSpan::enter(&run_id);

        obs::emit_run_started(&run_id, &plan.tag, plan.dry_run);

        let changed = diff_source.changed_files(&plan.spec).await?;
        let impacted = ChangeSetResolver::resolve(&changed, &plan.spec.service_roots);
        obs::emit_changes_resolved(&run_id, changed.len(), impacted.len());

        let plan_digest = compute_plan_digest(&impacted, &plan.tag);

        let mut services = Vec::new();
        let mut all_ok = true;

        for root in impacted.iter() {
            if plan.dry_run {
                info!(event = "deploy.skipped", service = %root, reason = "dry-run");
                continue;
            }

            match deployer.deploy(root, &plan.tag).await {
                Ok(outcome) => {
                    obs::emit_service_deployed(&run_id, root.as_str(), true, outcome.duration_ms);
                    services.push(ServiceDeployResult {
                        service: root.as_str().to_string(),
                        success: true,
                        error: None,
                        outcome: Some(outcome),
                    });
                }
                Err(e) => {
                    all_ok = false;
                    warn!(event = "deploy.failed", service = %root, error = %e);
                    services.push(ServiceDeployResult {
                        service: root.as_str().to_string(),
                        success: false,
                        error: Some(e.to_string()),
                        outcome: None,
                    });
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let deployed = services.iter().filter(|s| s.success).count();
        let failed = services.len() - deployed;
        obs::emit_run_finished(&run_id, duration_ms, deployed, failed, all_ok);

        Ok(PipelineResult {
            run_id,
            started_at,
            plan_digest,
            tag: plan.tag.clone(),
            dry_run: plan.dry_run,
            changed_file_count: changed.len(),
            impacted: impacted.iter().map(|r| r.as_str().to_string()).collect(),
            services,
            success: all_ok,
            duration_ms,
        })
    }
}

/// Deterministic digest of ordered impacted services plus target tag.
fn compute_plan_digest(impacted: &ImpactedServiceSet, tag: &str) -> String {
    let mut hasher = Sha256::new();
    for root in impacted.iter() {
        hasher.update(root.as_str().as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(tag.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::domain::ServiceRoot;

    fn impacted(names: &[&str]) -> ImpactedServiceSet {
        ImpactedServiceSet::new(
            names
                .iter()
                .map(|n| ServiceRoot::new(n).unwrap())
                .collect(),
        )
    }

    #[test]
    fn plan_digest_is_deterministic() {
        let a = compute_plan_digest(&impacted(&["backend", "frontend"]), "1.2.3");
        let b = compute_plan_digest(&impacted(&["backend", "frontend"]), "1.2.3");
        assert_eq!(a, b);
    }

    #[test]
    fn plan_digest_is_order_sensitive() {
        let a = compute_plan_digest(&impacted(&["backend", "frontend"]), "1.2.3");
        let b = compute_plan_digest(&impacted(&["frontend", "backend"]), "1.2.3");
        assert_ne!(a, b);
    }

    #[test]
    fn plan_digest_is_tag_sensitive() {
        let a = compute_plan_digest(&impacted(&["backend"]), "1.2.3");
        let b = compute_plan_digest(&impacted(&["backend"]), "1.2.4");
        assert_ne!(a, b);
    }

    #[test]
    fn result_counts_split_by_success() {
        let result = PipelineResult {
            run_id: "run123".to_string(),
            started_at: Utc::now(),
            plan_digest: "abc".to_string(),
            tag: "1.2.3".to_string(),
            dry_run: false,
            changed_file_count: 3,
            impacted: vec!["backend".to_string(), "frontend".to_string()],
            services: vec![
                ServiceDeployResult {
                    service: "backend".to_string(),
                    success: true,
                    error: None,
                    outcome: None,
                },
                ServiceDeployResult {
                    service: "frontend".to_string(),
                    success: false,
                    error: Some("pull failed".to_string()),
                    outcome: None,
                },
            ],
            success: false,
            duration_ms: 10,
        };

        assert_eq!(result.deployed_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.success);
    }
}
