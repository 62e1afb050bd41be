//! Deployment configuration: loading, defaults, and validation.
//!
//! Everything the pipeline needs is an explicit field here: repository
//! directory, refs, remote, credential env var names, manifest, registry,
//! service order. There is no ambient working-directory or implicit-env
//! configuration path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::compare::{DEFAULT_BASE_REF, DEFAULT_COMPARE_REF};
use crate::domain::{ChangeComparisonSpec, RemoteDescriptor, Result, ServiceRoot, SlipwayError};

/// Top-level `slipway.toml` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub repo: RepoConfig,
    pub deploy: DeployConfig,

    /// Monitored services; table order is deploy order.
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceEntry>,
}

/// `[repo]` section: where to diff and what to compare.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RepoConfig {
    /// Repository checkout directory.
    pub dir: PathBuf,

    #[serde(default = "default_base_ref")]
    pub base_ref: String,

    #[serde(default = "default_compare_ref")]
    pub compare_ref: String,

    /// Remote to fetch before diffing (optional; local-only diff when absent).
    #[serde(default)]
    pub remote: Option<RemoteDescriptor>,
}

/// `[deploy]` section: how impacted services are refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DeployConfig {
    /// Docker Compose manifest to rewrite and deploy from.
    pub manifest: PathBuf,

    /// Image registry prefix, e.g. `registry.example.com/acme`.
    pub registry: String,

    /// Per-command timeout for deploy steps (0 = unlimited).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One `[[service]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ServiceEntry {
    pub root: String,
}

fn default_base_ref() -> String {
    DEFAULT_BASE_REF.to_string()
}

fn default_compare_ref() -> String {
    DEFAULT_COMPARE_REF.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SlipwayError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| SlipwayError::InvalidConfig(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.repo.dir.as_os_str().is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "repo.dir must not be empty".to_string(),
            ));
        }
        if self.deploy.manifest.as_os_str().is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "deploy.manifest must not be empty".to_string(),
            ));
        }
        if self.deploy.registry.trim().is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "deploy.registry must not be empty".to_string(),
            ));
        }
        if self.services.is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "at least one [[service]] entry is required".to_string(),
            ));
        }
        // Surfaces bad root names at load time rather than mid-pipeline.
        self.service_roots()?;
        if let Some(remote) = &self.repo.remote {
            remote.validate()?;
        }
        Ok(())
    }

    /// Ordered service roots as validated domain values.
    ///
    /// Duplicates are allowed and kept: the resolver's passthrough contract
    /// makes deduplication the operator's decision, not ours.
    pub fn service_roots(&self) -> Result<Vec<ServiceRoot>> {
        self.services
            .iter()
            .map(|entry| ServiceRoot::new(&entry.root))
            .collect()
    }

    /// Build the comparison spec this configuration describes.
    pub fn comparison_spec(&self) -> Result<ChangeComparisonSpec> {
        let mut spec = ChangeComparisonSpec::new(
            self.repo.base_ref.clone(),
            self.repo.compare_ref.clone(),
            self.service_roots()?,
        );
        if let Some(remote) = &self.repo.remote {
            spec = spec.with_remote(remote.clone());
        }
        spec.validate()?;
        Ok(spec)
    }
}
