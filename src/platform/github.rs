//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::{
    DEFAULT_TIMEOUT_SECS, ForgeService, PER_PAGE, ensure_success, request_error, subject_line,
};
use crate::types::{
    FileContent, FileUpdate, MergeMethod, MergeResult, Platform, PlatformConfig, PullRequest,
    RefCreation,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use octocrab::Octocrab;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct Branch {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct Contents {
    sha: String,
    content: String,
}

#[derive(Deserialize)]
struct CommitMessage {
    message: String,
}

#[derive(Deserialize)]
struct CompareCommit {
    commit: CommitMessage,
}

#[derive(Deserialize)]
struct Comparison {
    commits: Vec<CompareCommit>,
}

/// GitHub service using octocrab for pull requests and raw REST for git data
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests (refs, contents, tags, merges)
    http_client: Client,
    /// API base URL, e.g. `https://api.github.com`
    api_base: String,
}

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(token: &str, api_base: &str, owner: String, repo: String, host: String) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("sprint-rollup")
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: PlatformConfig {
                platform: Platform::GitHub,
                owner,
                repo,
                host,
            },
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    /// Build a raw request against `/repos/{owner}/{repo}{path}`
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}{}",
            self.api_base, self.config.owner, self.config.repo, path
        );
        self.http_client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Send a raw request, failing on any non-2xx status
    async fn send(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> Result<reqwest::Response> {
        let mut builder = self.request(method.clone(), path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await?;
        ensure_success(response, &method, path).await
    }

    /// Fetch every page of a list endpoint returning `[{ "name": ... }]`
    async fn list_names(&self, path: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for page in 1.. {
            let endpoint = format!("{path}?per_page={PER_PAGE}&page={page}");
            let batch: Vec<NamedRef> = self.send(Method::GET, &endpoint, None).await?.json().await?;
            let len = batch.len();
            names.extend(batch.into_iter().map(|r| r.name));
            if len < PER_PAGE {
                break;
            }
        }
        Ok(names)
    }

    /// Create a git ref; `Ok(false)` when it already exists
    async fn create_ref(&self, full_ref: &str, sha: &str) -> Result<bool> {
        let method = Method::POST;
        let response = self
            .request(method.clone(), "/git/refs")
            .json(&json!({ "ref": full_ref, "sha": sha }))
            .send()
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let err = request_error(response, &method, "/git/refs").await;
            if let Error::ForgeRequest { body, .. } = &err
                && body.to_ascii_lowercase().contains("already exists")
            {
                return Ok(false);
            }
            return Err(err);
        }
        ensure_success(response, &method, "/git/refs").await?;
        Ok(true)
    }
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl ForgeService for GitHubService {
    fn config(&self) -> &PlatformConfig {
        &self.config
    }

    async fn list_branches(&self) -> Result<Vec<String>> {
        debug!("listing branches");
        let branches = self.list_names("/branches").await?;
        debug!(count = branches.len(), "listed branches");
        Ok(branches)
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        debug!(branch, "getting branch head");
        let path = format!("/branches/{}", urlencoding::encode(branch));
        let branch: Branch = self.send(Method::GET, &path, None).await?.json().await?;
        Ok(branch.commit.sha)
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<RefCreation> {
        debug!(name, sha, "creating branch");
        let created = self.create_ref(&format!("refs/heads/{name}"), sha).await?;
        if created {
            debug!(name, "created branch");
            Ok(RefCreation::Created)
        } else {
            debug!(name, "branch already exists");
            Ok(RefCreation::AlreadyExists)
        }
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<Option<FileContent>> {
        debug!(path, branch, "reading file");
        let endpoint = format!(
            "/contents/{}?ref={}",
            contents_path(path),
            urlencoding::encode(branch)
        );
        let response = self.request(Method::GET, &endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, branch, "file not found");
            return Ok(None);
        }
        let contents: Contents = ensure_success(response, &Method::GET, &endpoint)
            .await?
            .json()
            .await?;

        // GitHub wraps base64 content at 60 columns
        let encoded: String = contents.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::GitHubApi(format!("invalid base64 content for {path}: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::GitHubApi(format!("{path} is not UTF-8: {e}")))?;

        Ok(Some(FileContent {
            path: path.to_string(),
            content,
            token: contents.sha,
        }))
    }

    async fn put_file(&self, update: &FileUpdate) -> Result<()> {
        debug!(path = %update.path, branch = %update.branch, "writing file");
        let endpoint = format!("/contents/{}", contents_path(&update.path));
        let mut payload = json!({
            "message": update.message,
            "content": STANDARD.encode(update.content.as_bytes()),
            "branch": update.branch,
        });
        if let Some(sha) = &update.token {
            payload["sha"] = json!(sha);
        }

        let method = Method::PUT;
        let response = self
            .request(method.clone(), &endpoint)
            .json(&payload)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(Error::Conflict {
                path: update.path.clone(),
                branch: update.branch.clone(),
            });
        }
        ensure_success(response, &method, &endpoint).await?;
        debug!(path = %update.path, "wrote file");
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        debug!("listing tags");
        self.list_names("/tags").await
    }

    async fn create_tag(&self, name: &str, sha: &str, message: &str) -> Result<()> {
        debug!(name, sha, "creating tag");
        let tag: CommitRef = self
            .send(
                Method::POST,
                "/git/tags",
                Some(json!({
                    "tag": name,
                    "message": message,
                    "object": sha,
                    "type": "commit",
                })),
            )
            .await?
            .json()
            .await?;

        if !self.create_ref(&format!("refs/tags/{name}"), &tag.sha).await? {
            return Err(Error::TagAlreadyExists(name.to_string()));
        }
        debug!(name, "created tag");
        Ok(())
    }

    async fn commit_subjects(&self, base: &str, head: &str) -> Result<Vec<String>> {
        debug!(base, head, "comparing commits");
        let endpoint = format!(
            "/compare/{}...{}",
            urlencoding::encode(base),
            urlencoding::encode(head)
        );
        let comparison: Comparison = self.send(Method::GET, &endpoint, None).await?.json().await?;
        Ok(comparison
            .commits
            .iter()
            .map(|c| subject_line(&c.commit.message))
            .collect())
    }

    async fn find_open_request(&self, head: &str, base: &str) -> Result<Option<PullRequest>> {
        debug!(head, base, "finding open PR");
        let head_filter = format!("{}:{}", &self.config.owner, head);

        let prs = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .list()
            .head(head_filter)
            .base(base)
            .state(octocrab::params::State::Open)
            .send()
            .await?;

        // The head filter is advisory on some GitHub versions; match exactly
        let result = prs
            .items
            .iter()
            .find(|pr| pr.head.ref_field == head && pr.base.ref_field == base)
            .map(pr_from_octocrab);
        if let Some(ref pr) = result {
            debug!(pr_number = pr.number, "found open PR");
        } else {
            debug!("no open PR found");
        }
        Ok(result)
    }

    async fn create_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        debug!(head, base, "creating PR");
        let pr = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .create(title, head, base)
            .body(body)
            .send()
            .await?;

        let result = pr_from_octocrab(&pr);
        debug!(pr_number = result.number, "created PR");
        Ok(result)
    }

    async fn merge_request(
        &self,
        number: u64,
        method: MergeMethod,
        title: &str,
    ) -> Result<MergeResult> {
        debug!(pr_number = number, %method, "merging PR");

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
        };

        let result = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .merge(number)
            .method(octocrab_method)
            .title(title)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Merge failed: {e}")))?;

        let merge_result = MergeResult {
            merged: result.merged,
            sha: result.sha,
            message: result.message,
        };
        debug!(
            pr_number = number,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    async fn close_request(&self, number: u64) -> Result<()> {
        debug!(pr_number = number, "closing PR");
        self.send(
            Method::PATCH,
            &format!("/pulls/{number}"),
            Some(json!({ "state": "closed" })),
        )
        .await?;
        debug!(pr_number = number, "closed PR");
        Ok(())
    }

    async fn merge_branch(&self, head: &str, base: &str, message: &str) -> Result<MergeResult> {
        debug!(head, base, "merging branch");
        let response = self
            .send(
                Method::POST,
                "/merges",
                Some(json!({ "base": base, "head": head, "commit_message": message })),
            )
            .await?;

        // 204: base already contains head
        if response.status() == StatusCode::NO_CONTENT {
            debug!(head, base, "nothing to merge");
            return Ok(MergeResult {
                merged: true,
                sha: None,
                message: Some(format!("{base} already contains {head}")),
            });
        }

        let commit: CommitRef = response.json().await?;
        debug!(head, base, sha = %commit.sha, "merged branch");
        Ok(MergeResult {
            merged: true,
            sha: Some(commit.sha),
            message: None,
        })
    }
}

/// Percent-encode each segment of a repository path, keeping the slashes
fn contents_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
