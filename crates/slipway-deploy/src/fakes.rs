//! In-memory fakes for the executor, diff-source and deployer traits
//! (testing only).
//!
//! These satisfy the trait contracts without git, docker, or a network, so
//! pipeline behavior can be exercised hermetically.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use slipway_core::domain::{
    ChangeComparisonSpec, ChangedFile, Result, ServiceRoot, SlipwayError,
};

use crate::deploy::{DeployExecutor, DeployOutcome};
use crate::diff_source::DiffSource;
use crate::exec::{CommandExecutor, CommandSpec, ExecOutput};

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

/// [`CommandExecutor`] that replays queued outputs in order and records every
/// invocation.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    queue: Mutex<VecDeque<ExecOutput>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful invocation with the given stdout.
    pub fn push_success(&self, stdout: &str) {
        self.queue.lock().unwrap().push_back(ExecOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration_ms: 1,
        });
    }

    /// Queue a failing invocation with the given exit code and stderr.
    pub fn push_failure(&self, exit_code: i32, stderr: &str) {
        self.queue.lock().unwrap().push_back(ExecOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration_ms: 1,
        });
    }

    /// Every command spec run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SlipwayError::Exec {
                program: spec.program.clone(),
                message: "no scripted output queued".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// StaticDiffSource / FailingDiffSource
// ---------------------------------------------------------------------------

/// [`DiffSource`] returning a fixed changed-file list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiffSource {
    files: Vec<ChangedFile>,
}

impl StaticDiffSource {
    pub fn new(paths: &[&str]) -> Self {
        Self {
            files: paths.iter().filter_map(|p| ChangedFile::parse(p)).collect(),
        }
    }
}

#[async_trait]
impl DiffSource for StaticDiffSource {
    async fn changed_files(&self, _spec: &ChangeComparisonSpec) -> Result<Vec<ChangedFile>> {
        Ok(self.files.clone())
    }
}

/// [`DiffSource`] that always fails with a fetch error.
#[derive(Debug, Clone, Default)]
pub struct FailingDiffSource;

#[async_trait]
impl DiffSource for FailingDiffSource {
    async fn changed_files(&self, _spec: &ChangeComparisonSpec) -> Result<Vec<ChangedFile>> {
        Err(SlipwayError::Fetch(
            "scripted fetch failure".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// RecordingDeployer
// ---------------------------------------------------------------------------

/// [`DeployExecutor`] that records `(service, tag)` pairs and can be told to
/// fail for specific services.
#[derive(Debug, Default)]
pub struct RecordingDeployer {
    deployed: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deploys of `service` fail.
    pub fn fail_for(&self, service: &str) {
        self.failing.lock().unwrap().insert(service.to_string());
    }

    /// `(service, tag)` pairs deployed so far, in order.
    pub fn deployed(&self) -> Vec<(String, String)> {
        self.deployed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeployExecutor for RecordingDeployer {
    async fn deploy(&self, service: &ServiceRoot, tag: &str) -> Result<DeployOutcome> {
        if self.failing.lock().unwrap().contains(service.as_str()) {
            return Err(SlipwayError::Deploy {
                service: service.as_str().to_string(),
                message: "scripted deploy failure".to_string(),
            });
        }
        self.deployed
            .lock()
            .unwrap()
            .push((service.as_str().to_string(), tag.to_string()));
        Ok(DeployOutcome {
            service: service.as_str().to_string(),
            image: format!("fake.registry/{}:{}", service.as_str(), tag),
            manifest_updated: true,
            steps: Vec::new(),
            duration_ms: 0,
        })
    }
}
