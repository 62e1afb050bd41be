//! Service deployment against a Docker Compose host.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use slipway_core::domain::{Result, ServiceRoot, SlipwayError};

use crate::exec::{CommandExecutor, CommandSpec, ExecOutput};
use crate::manifest;

/// One executed deploy step with its captured exit status.
#[derive(Debug, Clone, Serialize)]
pub struct DeployStep {
    pub name: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl DeployStep {
    fn from_output(name: &str, output: &ExecOutput) -> Self {
        Self {
            name: name.to_string(),
            exit_code: output.exit_code,
            duration_ms: output.duration_ms,
        }
    }
}

/// Outcome of deploying a single service.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub service: String,
    pub image: String,

    /// Whether the manifest text actually changed (false when the image was
    /// already at the target reference).
    pub manifest_updated: bool,

    pub steps: Vec<DeployStep>,
    pub duration_ms: u64,
}

/// Updates one service to a new build artifact.
#[async_trait]
pub trait DeployExecutor: Send + Sync {
    async fn deploy(&self, service: &ServiceRoot, tag: &str) -> Result<DeployOutcome>;
}

/// [`DeployExecutor`] that rewrites the Compose manifest and refreshes the
/// service through `docker compose pull` / `up`.
pub struct ComposeDeployer<E> {
    manifest_path: PathBuf,
    registry: String,
    executor: E,
    timeout_secs: u64,
}

impl<E: CommandExecutor> ComposeDeployer<E> {
    pub fn new(manifest_path: impl Into<PathBuf>, registry: impl Into<String>, executor: E) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            registry: registry.into(),
            executor,
            timeout_secs: 300,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Image reference for a service at a build tag.
    pub fn image_for(&self, service: &ServiceRoot, tag: &str) -> String {
        format!(
            "{}/{}:{}",
            self.registry.trim_end_matches('/'),
            service.as_str(),
            tag
        )
    }

    fn compose(&self, args: &[&str]) -> CommandSpec {
        let mut full = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.manifest_path.display().to_string(),
        ];
        full.extend(args.iter().map(|a| a.to_string()));
        CommandSpec::new("docker", full).timeout(self.timeout_secs)
    }

    async fn run_step(
        &self,
        service: &ServiceRoot,
        name: &str,
        spec: CommandSpec,
    ) -> Result<DeployStep> {
        let output = self.executor.run(&spec).await?;
        if !output.success() {
            return Err(SlipwayError::Deploy {
                service: service.as_str().to_string(),
                message: format!(
                    "{name} failed with exit code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }
        Ok(DeployStep::from_output(name, &output))
    }
}

#[async_trait]
impl<E: CommandExecutor> DeployExecutor for ComposeDeployer<E> {
    async fn deploy(&self, service: &ServiceRoot, tag: &str) -> Result<DeployOutcome> {
        let start = Instant::now();
        let image = self.image_for(service, tag);

        let text = std::fs::read_to_string(&self.manifest_path)?;
        let rewrite = manifest::rewrite_image(&text, service, &image)?;
        if rewrite.changed {
            std::fs::write(&self.manifest_path, &rewrite.content)?;
        }
        info!(
            event = "deploy.image_updated",
            service = %service,
            image = %image,
            previous = %rewrite.previous,
            changed = rewrite.changed,
        );

        let pull = self
            .run_step(service, "pull", self.compose(&["pull", service.as_str()]))
            .await?;
        let up = self
            .run_step(
                service,
                "up",
                self.compose(&["up", "-d", "--no-deps", service.as_str()]),
            )
            .await?;

        Ok(DeployOutcome {
            service: service.as_str().to_string(),
            image,
            manifest_updated: rewrite.changed,
            steps: vec![pull, up],
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;

    const MANIFEST: &str = "\
services:
  backend:
    image: registry.example.com/acme/backend:1.0.0
";

    fn root(name: &str) -> ServiceRoot {
        ServiceRoot::new(name).unwrap()
    }

    fn manifest_file(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[tokio::test]
    async fn deploy_rewrites_manifest_then_pulls_and_restarts() {
        let file = manifest_file(MANIFEST);
        let executor = ScriptedExecutor::new();
        executor.push_success(""); // pull
        executor.push_success(""); // up

        let deployer = ComposeDeployer::new(
            file.path(),
            "registry.example.com/acme",
            executor,
        );
        let outcome = deployer.deploy(&root("backend"), "2.0.0").await.unwrap();

        assert_eq!(outcome.image, "registry.example.com/acme/backend:2.0.0");
        assert!(outcome.manifest_updated);
        assert_eq!(outcome.steps.len(), 2);

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.contains("image: registry.example.com/acme/backend:2.0.0"));

        let calls = deployer.executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "docker");
        assert_eq!(calls[0].args[0], "compose");
        assert_eq!(calls[0].args[3], "pull");
        assert_eq!(calls[0].args[4], "backend");
        assert_eq!(
            &calls[1].args[3..],
            &["up".to_string(), "-d".to_string(), "--no-deps".to_string(), "backend".to_string()]
        );
    }

    #[tokio::test]
    async fn failing_pull_is_a_deploy_error_and_stops_the_service() {
        let file = manifest_file(MANIFEST);
        let executor = ScriptedExecutor::new();
        executor.push_failure(1, "manifest unknown");

        let deployer = ComposeDeployer::new(
            file.path(),
            "registry.example.com/acme",
            executor,
        );
        let err = deployer.deploy(&root("backend"), "2.0.0").await.unwrap_err();

        assert!(matches!(err, SlipwayError::Deploy { .. }));
        assert!(err.to_string().contains("pull"));
        // The up step never ran.
        assert_eq!(deployer.executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn redeploy_of_current_image_skips_the_manifest_write() {
        let file = manifest_file(MANIFEST);
        let executor = ScriptedExecutor::new();
        executor.push_success("");
        executor.push_success("");

        let deployer = ComposeDeployer::new(
            file.path(),
            "registry.example.com/acme",
            executor,
        );
        let outcome = deployer.deploy(&root("backend"), "1.0.0").await.unwrap();

        assert!(!outcome.manifest_updated);
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn unknown_service_fails_before_any_command() {
        let file = manifest_file(MANIFEST);
        let executor = ScriptedExecutor::new();

        let deployer = ComposeDeployer::new(
            file.path(),
            "registry.example.com/acme",
            executor,
        );
        let err = deployer.deploy(&root("nginx"), "2.0.0").await.unwrap_err();

        assert!(matches!(err, SlipwayError::Deploy { .. }));
        assert!(deployer.executor.calls().is_empty());
    }

    #[test]
    fn image_for_normalizes_registry_trailing_slash() {
        let deployer = ComposeDeployer::new(
            "compose.yml",
            "registry.example.com/acme/",
            ScriptedExecutor::new(),
        );
        assert_eq!(
            deployer.image_for(&root("backend"), "2.0.0"),
            "registry.example.com/acme/backend:2.0.0"
        );
    }
}
