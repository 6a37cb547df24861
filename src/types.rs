//! Core types for sprint-rollup

use serde::{Deserialize, Serialize};

/// A pull request / merge request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number (GitHub) or MR iid (GitLab)
    pub number: u64,
    /// Web URL for the PR/MR
    pub html_url: String,
    /// Base (target) branch name
    pub base_ref: String,
    /// Head (source) branch name
    pub head_ref: String,
    /// PR/MR title
    pub title: String,
}

/// Detected platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// GitHub or GitHub Enterprise
    GitHub,
    /// GitLab or self-hosted GitLab
    GitLab,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
            Self::GitLab => write!(f, "GitLab"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            other => Err(format!("unknown platform '{other}' (expected github or gitlab)")),
        }
    }
}

/// Repository identity on a forge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Platform type
    pub platform: Platform,
    /// Repository owner (user, organization, or nested GitLab group path)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Host parsed from the remote URL
    pub host: String,
}

impl PlatformConfig {
    /// `owner/repo` path
    pub fn project_path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Result of a merge operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Whether the forge reports the head as merged
    pub merged: bool,
    /// The SHA of the merge commit (if any)
    pub sha: Option<String>,
    /// Message from the merge operation (especially on failure)
    pub message: Option<String>,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Squash all commits into one
    #[default]
    Squash,
    /// Create a merge commit
    Merge,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// A tracked file read from a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Repository-relative path
    pub path: String,
    /// Decoded UTF-8 content
    pub content: String,
    /// Integrity token for the write that follows.
    ///
    /// GitHub blob SHA or GitLab last commit id.
    pub token: String,
}

/// A single file write to a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    /// Repository-relative path
    pub path: String,
    /// Branch to commit to
    pub branch: String,
    /// New full content
    pub content: String,
    /// Commit message
    pub message: String,
    /// Token of the content being replaced; `None` creates the file
    pub token: Option<String>,
}

/// Outcome of creating a branch ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCreation {
    /// The ref was created
    Created,
    /// The ref already existed; nothing changed
    AlreadyExists,
}
