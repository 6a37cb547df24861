//! Forge services for GitHub and GitLab
//!
//! Provides a unified interface for the ref, file, tag and PR/MR operations a
//! release cycle needs, so the release engine is written once for both forges.

mod detection;
mod factory;
mod github;
mod gitlab;

pub use detection::{detect_platform, parse_repo_info};
pub use factory::create_forge_service;
pub use github::GitHubService;
pub use gitlab::GitLabService;

use crate::error::{Error, Result};
use crate::types::{
    FileContent, FileUpdate, MergeMethod, MergeResult, PlatformConfig, PullRequest, RefCreation,
};
use async_trait::async_trait;
use reqwest::{Method, Response};

/// Default request timeout in seconds
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for list endpoints
pub(crate) const PER_PAGE: usize = 100;

/// Forge service trait for release operations
///
/// Adapters report non-2xx responses as [`Error::ForgeRequest`] except where a
/// method documents an expected condition (existing refs, missing files, no
/// open requests).
#[async_trait]
pub trait ForgeService: Send + Sync {
    /// Get the repository identity
    fn config(&self) -> &PlatformConfig;

    /// Names of all remote branches
    async fn list_branches(&self) -> Result<Vec<String>>;

    /// Commit SHA at the tip of `branch`
    async fn branch_head(&self, branch: &str) -> Result<String>;

    /// Create `name` pointing at `sha`.
    ///
    /// An existing branch is reported as [`RefCreation::AlreadyExists`].
    async fn create_branch(&self, name: &str, sha: &str) -> Result<RefCreation>;

    /// Read a file from `branch`; `None` when the file does not exist
    async fn get_file(&self, path: &str, branch: &str) -> Result<Option<FileContent>>;

    /// Commit a full-content replacement (or creation) of one file.
    ///
    /// A stale token fails with [`Error::Conflict`].
    async fn put_file(&self, update: &FileUpdate) -> Result<()>;

    /// Names of all tags
    async fn list_tags(&self) -> Result<Vec<String>>;

    /// Create an annotated tag at `sha`.
    ///
    /// An existing tag fails with [`Error::TagAlreadyExists`].
    async fn create_tag(&self, name: &str, sha: &str, message: &str) -> Result<()>;

    /// First lines of the commits reachable from `head` but not `base`,
    /// oldest first
    async fn commit_subjects(&self, base: &str, head: &str) -> Result<Vec<String>>;

    /// Find an open PR/MR from `head` into `base`
    async fn find_open_request(&self, head: &str, base: &str) -> Result<Option<PullRequest>>;

    /// Open a PR/MR
    async fn create_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest>;

    /// Merge an open PR/MR
    async fn merge_request(
        &self,
        number: u64,
        method: MergeMethod,
        title: &str,
    ) -> Result<MergeResult>;

    /// Close an open PR/MR without merging
    async fn close_request(&self, number: u64) -> Result<()>;

    /// Merge `head` into `base` without an existing PR/MR.
    ///
    /// Nothing to merge is a success with `sha: None`.
    async fn merge_branch(&self, head: &str, base: &str, message: &str) -> Result<MergeResult>;
}

/// Turn a non-2xx response into [`Error::ForgeRequest`]
pub(crate) async fn ensure_success(
    response: Response,
    method: &Method,
    endpoint: &str,
) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(request_error(response, method, endpoint).await)
}

/// Build a [`Error::ForgeRequest`] from a response already known to be an
/// error
pub(crate) async fn request_error(response: Response, method: &Method, endpoint: &str) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::ForgeRequest {
        method: method.to_string(),
        endpoint: endpoint.to_string(),
        status,
        body,
    }
}

/// First line of a commit message
pub(crate) fn subject_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}
