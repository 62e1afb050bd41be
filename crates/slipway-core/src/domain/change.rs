//! Changed files, service roots, and the impacted-service result set.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{Result, SlipwayError};

/// A repository-relative path reported as changed between two refs.
///
/// Always non-empty and whitespace-trimmed. Produced per invocation from diff
/// output; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedFile(String);

impl ChangedFile {
    /// Normalize one raw diff output line into a changed-file path.
    ///
    /// Trims surrounding whitespace and a leading `./`. Returns `None` for
    /// blank lines so diff parsing can `filter_map` directly over output.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A top-level directory that is the unit of independent build/deploy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRoot(String);

impl ServiceRoot {
    /// Validate a configured service root name.
    ///
    /// Roots name directories relative to the repository top level: non-empty,
    /// no surrounding whitespace or slashes, no interior whitespace.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SlipwayError::InvalidConfig(
                "service root must not be empty".to_string(),
            ));
        }
        if name.starts_with('/') || name.ends_with('/') {
            return Err(SlipwayError::InvalidConfig(format!(
                "service root '{name}' must not start or end with '/'"
            )));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(SlipwayError::InvalidConfig(format!(
                "service root '{name}' must not contain whitespace"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `path` lies strictly inside the directory named by this root.
    ///
    /// Requires the root name, a path separator, and at least one further
    /// character. `auth` therefore matches `auth/app.py` but neither
    /// `auth-service/app.py` (sibling sharing a string prefix) nor `auth`
    /// itself (a file named like the root).
    pub fn contains_path(&self, path: &ChangedFile) -> bool {
        path.as_str()
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map_or(false, |rest| !rest.is_empty())
    }
}

impl fmt::Display for ServiceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered sequence of service roots requiring rebuild/redeploy.
///
/// Always a subsequence of the roots handed to the resolver, in their input
/// order. Duplicate input roots propagate here unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImpactedServiceSet(Vec<ServiceRoot>);

impl ImpactedServiceSet {
    pub fn new(roots: Vec<ServiceRoot>) -> Self {
        Self(roots)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceRoot> {
        self.0.iter()
    }

    /// Root names in order, for assertions and report output.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(ServiceRoot::as_str).collect()
    }
}

impl fmt::Display for ImpactedServiceSet {
    /// Newline-separated root names, the `resolve` subcommand's stdout format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, root) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(root.as_str())?;
        }
        Ok(())
    }
}
