//! The resolution request: which refs to compare, over which service roots.

use serde::{Deserialize, Serialize};

use super::change::ServiceRoot;
use super::error::{Result, SlipwayError};

/// Default base ref: the commit before the one being deployed.
pub const DEFAULT_BASE_REF: &str = "HEAD~1";

/// Default comparison ref: the commit being deployed.
pub const DEFAULT_COMPARE_REF: &str = "HEAD";

/// A remote to fetch before diffing.
///
/// Carries the env var *names* holding credentials, never the values. Values
/// are looked up through a credential source at fetch time and are never
/// logged or serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RemoteDescriptor {
    /// Remote name, e.g. `origin`.
    pub name: String,

    /// Fetch URL.
    pub url: String,

    /// Env var holding the username (optional; token-only auth when absent).
    #[serde(default)]
    pub username_env: Option<String>,

    /// Env var holding the access token. No fetch authentication when absent.
    #[serde(default)]
    pub token_env: Option<String>,
}

impl RemoteDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "remote.name must not be empty".to_string(),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "remote.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One resolution request: base ref, comparison ref, optional remote, and the
/// ordered service roots to check. Constructed fresh per pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeComparisonSpec {
    pub base_ref: String,
    pub compare_ref: String,
    pub remote: Option<RemoteDescriptor>,
    pub service_roots: Vec<ServiceRoot>,
}

impl ChangeComparisonSpec {
    pub fn new(
        base_ref: impl Into<String>,
        compare_ref: impl Into<String>,
        service_roots: Vec<ServiceRoot>,
    ) -> Self {
        Self {
            base_ref: base_ref.into(),
            compare_ref: compare_ref.into(),
            remote: None,
            service_roots,
        }
    }

    /// Spec comparing the previous commit against the current one.
    pub fn against_previous_commit(service_roots: Vec<ServiceRoot>) -> Self {
        Self::new(DEFAULT_BASE_REF, DEFAULT_COMPARE_REF, service_roots)
    }

    pub fn with_remote(mut self, remote: RemoteDescriptor) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_ref.trim().is_empty() {
            return Err(SlipwayError::InvalidSpec(
                "base ref must not be empty".to_string(),
            ));
        }
        if self.compare_ref.trim().is_empty() {
            return Err(SlipwayError::InvalidSpec(
                "compare ref must not be empty".to_string(),
            ));
        }
        if let Some(remote) = &self.remote {
            remote.validate()?;
        }
        Ok(())
    }

    /// The `<base>..<compare>` range handed to the diff command.
    pub fn range(&self) -> String {
        format!("{}..{}", self.base_ref, self.compare_ref)
    }
}
