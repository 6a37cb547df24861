//! Sprint branch naming and state resolution
//!
//! Sprint branches are named `prefix + N + suffix` (`s3test` by default). The
//! state of a repository is derived from the version marker on mainline and
//! the set of remote branch names; nothing is persisted between runs.

use crate::error::Result;
use crate::version::{Version, next_sprint_number};
use serde::Serialize;
use std::fmt;

/// Naming scheme for sprint branches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintNaming {
    prefix: String,
    suffix: String,
}

impl SprintNaming {
    /// Create a naming scheme
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Branch name for sprint `n`
    pub fn branch_for(&self, sprint: u64) -> String {
        format!("{}{sprint}{}", self.prefix, self.suffix)
    }

    /// Sprint number encoded in `name`, if it is a sprint branch.
    ///
    /// Only canonical names round-trip: the number must be at least 1 and
    /// carry no leading zeros, so `s01test` and `s0test` are not sprint
    /// branches.
    pub fn parse(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        digits.parse().ok()
    }

    /// Whether `name` falls in the sprint namespace: it begins with the
    /// prefix. Any such branch means the repository was bootstrapped, even
    /// when the name is not a canonical sprint branch. A suffix-only scheme
    /// has no prefix to test, so canonical parsing is used instead.
    pub fn in_namespace(&self, name: &str) -> bool {
        if self.prefix.is_empty() {
            return self.is_sprint_branch(name);
        }
        name.starts_with(self.prefix.as_str())
    }

    /// Whether `name` is a sprint branch under this scheme
    pub fn is_sprint_branch(&self, name: &str) -> bool {
        self.parse(name).is_some()
    }
}

impl Default for SprintNaming {
    fn default() -> Self {
        Self::new("s", "test")
    }
}

/// Repository state as seen at the start of a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SprintState {
    /// No sprint branch exists yet: bootstrap sprint 1
    NoSprintBranchesExist,
    /// The branch named by the version marker is absent
    CurrentSprintBranchMissing {
        /// Expected branch name
        current: String,
        /// Branch that will be created instead
        next: String,
    },
    /// The branch named by the version marker exists: run the full cycle
    CurrentSprintBranchPresent {
        /// Branch to release
        current: String,
        /// Branch for the following sprint
        next: String,
    },
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSprintBranchesExist => write!(f, "no sprint branches exist"),
            Self::CurrentSprintBranchMissing { current, .. } => {
                write!(f, "current sprint branch {current} is missing")
            }
            Self::CurrentSprintBranchPresent { current, .. } => {
                write!(f, "current sprint branch {current} is present")
            }
        }
    }
}

/// Classify the repository from the mainline version and the branch snapshot
///
/// Fails only when the sprint counter cannot be advanced.
pub fn resolve_state<S: AsRef<str>>(
    naming: &SprintNaming,
    version: Version,
    branches: &[S],
) -> Result<SprintState> {
    if !branches.iter().any(|b| naming.in_namespace(b.as_ref())) {
        return Ok(SprintState::NoSprintBranchesExist);
    }

    let current = naming.branch_for(version.sprint);
    let next = naming.branch_for(next_sprint_number(version.sprint)?);

    if branches.iter().any(|b| b.as_ref() == current) {
        Ok(SprintState::CurrentSprintBranchPresent { current, next })
    } else {
        Ok(SprintState::CurrentSprintBranchMissing { current, next })
    }
}
