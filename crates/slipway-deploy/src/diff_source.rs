//! Changed-file retrieval between two git refs.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use slipway_core::domain::{ChangeComparisonSpec, ChangedFile, Result, SlipwayError};

use crate::exec::{CommandExecutor, CommandSpec};
use crate::remote::{authenticated_url, CredentialSource, EnvCredentialSource};

const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Produces the changed-file list for a comparison spec.
///
/// An empty vector means "no changes found". Any failure to determine the
/// change set (fetch failure, bad ref, git unavailable) is an error, never
/// an empty result.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn changed_files(&self, spec: &ChangeComparisonSpec) -> Result<Vec<ChangedFile>>;
}

/// [`DiffSource`] that shells out to `git` in a local checkout.
pub struct GitDiffSource<E> {
    repo_dir: PathBuf,
    executor: E,
    credentials: Box<dyn CredentialSource>,
    timeout_secs: u64,
}

impl<E: CommandExecutor> GitDiffSource<E> {
    pub fn new(repo_dir: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            executor,
            credentials: Box::new(EnvCredentialSource),
            timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
        }
    }

    pub fn with_credentials(mut self, credentials: Box<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn git<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("git", args)
            .current_dir(&self.repo_dir)
            .timeout(self.timeout_secs)
    }

    /// Fetch the base ref from the configured remote, when one is present.
    async fn fetch_base(&self, spec: &ChangeComparisonSpec) -> Result<()> {
        let remote = match &spec.remote {
            Some(remote) => remote,
            None => return Ok(()),
        };

        let url = authenticated_url(remote, self.credentials.as_ref())?;
        let output = self
            .executor
            .run(&self.git(vec![
                "fetch".to_string(),
                url,
                spec.base_ref.clone(),
            ]))
            .await?;

        if !output.success() {
            // The URL may embed credentials; report the remote by name only.
            return Err(SlipwayError::Fetch(format!(
                "git fetch from remote '{}' failed with exit code {}: {}",
                remote.name,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: CommandExecutor> DiffSource for GitDiffSource<E> {
    async fn changed_files(&self, spec: &ChangeComparisonSpec) -> Result<Vec<ChangedFile>> {
        spec.validate()?;
        self.fetch_base(spec).await?;

        let range = spec.range();
        let output = self
            .executor
            .run(&self.git(["diff", "--name-only", range.as_str()]))
            .await?;

        if !output.success() {
            return Err(SlipwayError::Fetch(format!(
                "git diff {range} failed with exit code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        let files: Vec<ChangedFile> = output.stdout.lines().filter_map(ChangedFile::parse).collect();
        debug!(range = %range, count = files.len(), "diff resolved");
        Ok(files)
    }
}
