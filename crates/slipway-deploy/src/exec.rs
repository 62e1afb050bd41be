//! Structured external command execution.
//!
//! Every external invocation is a [`CommandSpec`]: a program plus an argument
//! vector. Nothing is ever composed into a shell string, so there is no
//! quoting layer to get wrong.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use slipway_core::domain::{Result, SlipwayError};

/// Specification of one external command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments, one element per argument.
    pub args: Vec<String>,

    /// Working directory (inherited when `None`).
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,

    /// Timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            timeout_secs: 0,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// `program arg1 arg2 ...` rendering for log lines.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of one command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Exit code (-1 when terminated by signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ExecOutput {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes commands described by [`CommandSpec`].
///
/// A non-zero exit code is not an error at this layer; callers inspect the
/// [`ExecOutput`] and decide. Spawn failures and timeouts are errors.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command to completion, capturing stdio.
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput>;
}

/// [`CommandExecutor`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecOutput> {
        let start = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out child must not outlive its invocation.
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| SlipwayError::Exec {
            program: spec.program.clone(),
            message: format!("spawn failed: {e}"),
        })?;

        let output = if spec.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(spec.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| SlipwayError::Exec {
                program: spec.program.clone(),
                message: format!("timed out after {} seconds", spec.timeout_secs),
            })?
            .map_err(|e| SlipwayError::Exec {
                program: spec.program.clone(),
                message: format!("wait failed: {e}"),
            })?
        } else {
            child.wait_with_output().await.map_err(|e| SlipwayError::Exec {
                program: spec.program.clone(),
                message: format!("wait failed: {e}"),
            })?
        };

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
