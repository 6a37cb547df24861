//! Error types for sprint-rollup

use thiserror::Error;

/// Errors raised while configuring or running a release cycle
#[derive(Debug, Error)]
pub enum Error {
    /// One or more required configuration keys are absent or unusable
    #[error("missing or invalid configuration: {}", .0.join(", "))]
    Configuration(Vec<String>),

    /// A configuration value is present but unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tracked file has no `<marker> = "x.y.z"` line
    #[error("no `{0}` version marker found")]
    MissingVersionMarker(String),

    /// A version marker is present but cannot be used or advanced
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    /// A tracked file does not exist on the given branch
    #[error("{path} not found on branch {branch}")]
    FileNotFound {
        /// Repository-relative path
        path: String,
        /// Branch that was read
        branch: String,
    },

    /// The forge returned a non-2xx status that is not an expected no-op
    #[error("{method} {endpoint} -> {status}: {body}")]
    ForgeRequest {
        /// HTTP method
        method: String,
        /// Endpoint path relative to the API base
        endpoint: String,
        /// Response status code
        status: u16,
        /// Response body (truncated by the forge, not by us)
        body: String,
    },

    /// A file write was rejected because its content changed since it was read
    #[error("{path} on {branch} changed since it was read")]
    Conflict {
        /// Repository-relative path
        path: String,
        /// Branch being written
        branch: String,
    },

    /// The version marker on a branch is neither the expected old nor new value
    #[error("version on {branch} is {found}, expected {expected}")]
    VersionDrift {
        /// Branch that was read
        branch: String,
        /// Version the plan was built from
        expected: String,
        /// Version actually found
        found: String,
    },

    /// A direct branch merge was accepted but not completed
    #[error("merging {head} into {base} did not complete: {reason}")]
    MergeFailed {
        /// Source branch
        head: String,
        /// Target branch
        base: String,
        /// Forge-reported reason
        reason: String,
    },

    /// A release tag with this name already exists
    #[error("tag {0} already exists")]
    TagAlreadyExists(String),

    /// Remote URL could not be parsed into a supported forge repository
    #[error("no supported GitHub or GitLab remote found")]
    NoSupportedRemotes,

    /// GitHub API error outside the raw REST helpers
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// GitLab API error outside the raw REST helpers
    #[error("GitLab API error: {0}")]
    GitLabApi(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Octocrab failure
    #[error("GitHub client error: {0}")]
    Octocrab(#[from] octocrab::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error was caused by configuration rather than the forge
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InvalidConfig(_) | Self::NoSupportedRemotes
        )
    }
}

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;
