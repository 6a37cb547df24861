//! Pull/merge request lifecycle
//!
//! Requests are looked up fresh before every mutating call, so a request
//! opened or merged by someone else between runs is picked up rather than
//! duplicated.

use crate::error::Result;
use crate::platform::ForgeService;
use crate::types::{MergeMethod, PullRequest};
use std::fmt;
use tracing::{info, warn};

/// What happened to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The open request was merged
    Merged {
        /// PR/MR number
        number: u64,
        /// Merge commit, when reported
        sha: Option<String>,
    },
    /// Merging failed; the request was closed instead
    Closed {
        /// PR/MR number
        number: u64,
        /// Why the merge failed
        reason: String,
    },
    /// No request was open; the branch was merged directly
    MergedDirectly {
        /// Merge commit; `None` when there was nothing to merge
        sha: Option<String>,
    },
    /// A request was already open
    AlreadyOpen(PullRequest),
    /// A new request was opened
    Created(PullRequest),
    /// Opening a request failed; the cycle carries on
    CreateFailed {
        /// Forge-reported reason
        reason: String,
    },
    /// No open request exists
    NotFound,
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merged { number, sha } => {
                write!(f, "merged #{number}")?;
                if let Some(sha) = sha {
                    write!(f, " ({sha})")?;
                }
                Ok(())
            }
            Self::Closed { number, reason } => write!(f, "closed #{number}: {reason}"),
            Self::MergedDirectly { sha: Some(sha) } => write!(f, "merged directly ({sha})"),
            Self::MergedDirectly { sha: None } => write!(f, "nothing to merge"),
            Self::AlreadyOpen(pr) => write!(f, "#{} already open: {}", pr.number, pr.html_url),
            Self::Created(pr) => write!(f, "opened #{}: {}", pr.number, pr.html_url),
            Self::CreateFailed { reason } => write!(f, "could not open request: {reason}"),
            Self::NotFound => write!(f, "no open request"),
        }
    }
}

/// Merge the open request from `head` into `base`, closing it if the merge
/// fails.
///
/// A failed close is returned as an error.
pub async fn reconcile_request(
    forge: &dyn ForgeService,
    head: &str,
    base: &str,
    method: MergeMethod,
    title: &str,
) -> Result<RequestOutcome> {
    let Some(pr) = forge.find_open_request(head, base).await? else {
        info!(head, base, "no open request to reconcile");
        return Ok(RequestOutcome::NotFound);
    };
    info!(number = pr.number, head, base, "found open request");

    let reason = match forge.merge_request(pr.number, method, title).await {
        Ok(result) if result.merged => {
            info!(number = pr.number, sha = ?result.sha, "merged request");
            return Ok(RequestOutcome::Merged {
                number: pr.number,
                sha: result.sha,
            });
        }
        Ok(result) => result
            .message
            .unwrap_or_else(|| "merge was not performed".to_string()),
        Err(e) => e.to_string(),
    };

    warn!(number = pr.number, %reason, "merge failed, closing request");
    forge.close_request(pr.number).await?;
    Ok(RequestOutcome::Closed {
        number: pr.number,
        reason,
    })
}

/// Open a request from `head` into `base` unless one is already open
pub async fn ensure_request(
    forge: &dyn ForgeService,
    head: &str,
    base: &str,
    title: &str,
    body: &str,
) -> Result<RequestOutcome> {
    if let Some(pr) = forge.find_open_request(head, base).await? {
        info!(number = pr.number, head, "request already open");
        return Ok(RequestOutcome::AlreadyOpen(pr));
    }

    match forge.create_request(head, base, title, body).await {
        Ok(pr) => {
            info!(number = pr.number, url = %pr.html_url, "opened request");
            Ok(RequestOutcome::Created(pr))
        }
        Err(e) => {
            warn!(head, base, error = %e, "failed to open request");
            Ok(RequestOutcome::CreateFailed {
                reason: e.to_string(),
            })
        }
    }
}
