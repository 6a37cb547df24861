//! GitLab platform service implementation

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
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// GitLab service using reqwest
pub struct GitLabService {
    client: Client,
    token: String,
    config: PlatformConfig,
    /// API base URL, e.g. `https://gitlab.com/api/v4`
    api_base: String,
    /// Numeric id or URL-encoded `namespace/project`
    project_ref: String,
}

#[derive(Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Deserialize)]
struct BranchCommit {
    id: String,
}

#[derive(Deserialize)]
struct Branch {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct RepositoryFile {
    content: String,
    last_commit_id: String,
}

#[derive(Deserialize)]
struct CompareCommit {
    title: String,
}

#[derive(Deserialize)]
struct Comparison {
    commits: Vec<CompareCommit>,
}

#[derive(Deserialize)]
struct MergeRequest {
    iid: u64,
    web_url: String,
    source_branch: String,
    target_branch: String,
    title: String,
}

/// Merge response
#[derive(Deserialize)]
struct MergeResponse {
    state: String,
    merge_commit_sha: Option<String>,
    squash_commit_sha: Option<String>,
}

impl From<MergeRequest> for PullRequest {
    fn from(mr: MergeRequest) -> Self {
        Self {
            number: mr.iid,
            html_url: mr.web_url,
            base_ref: mr.target_branch,
            head_ref: mr.source_branch,
            title: mr.title,
        }
    }
}

#[derive(Serialize)]
struct CreateMrPayload<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct FilePayload<'a> {
    branch: &'a str,
    content: &'a str,
    commit_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_commit_id: Option<&'a str>,
}

impl GitLabService {
    /// Create a new GitLab service.
    ///
    /// `project_id` takes precedence over `owner/repo` when addressing the
    /// project.
    pub fn new(
        token: String,
        api_base: &str,
        config: PlatformConfig,
        project_id: Option<&str>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent("sprint-rollup")
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GitLabApi(format!("failed to create HTTP client: {e}")))?;

        let project_ref = project_id.map_or_else(
            || urlencoding::encode(&config.project_path()).into_owned(),
            |id| urlencoding::encode(id).into_owned(),
        );

        Ok(Self {
            client,
            token,
            config: PlatformConfig {
                platform: Platform::GitLab,
                ..config
            },
            api_base: api_base.trim_end_matches('/').to_string(),
            project_ref,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/projects/{}{}", self.api_base, self.project_ref, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.api_url(path))
            .header("PRIVATE-TOKEN", &self.token)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
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

    fn file_path(path: &str) -> String {
        format!("/repository/files/{}", urlencoding::encode(path))
    }
}

/// GitLab reports most validation failures as 400 with a message body
fn body_contains(err: &Error, needle: &str) -> bool {
    matches!(err, Error::ForgeRequest { body, .. } if body.to_ascii_lowercase().contains(needle))
}

#[async_trait]
impl ForgeService for GitLabService {
    fn config(&self) -> &PlatformConfig {
        &self.config
    }

    async fn list_branches(&self) -> Result<Vec<String>> {
        debug!("listing branches");
        let branches = self.list_names("/repository/branches").await?;
        debug!(count = branches.len(), "listed branches");
        Ok(branches)
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        debug!(branch, "getting branch head");
        let path = format!("/repository/branches/{}", urlencoding::encode(branch));
        let branch: Branch = self.send(Method::GET, &path, None).await?.json().await?;
        Ok(branch.commit.id)
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<RefCreation> {
        debug!(name, sha, "creating branch");
        let method = Method::POST;
        let endpoint = "/repository/branches";
        let response = self
            .request(method.clone(), endpoint)
            .json(&json!({ "branch": name, "ref": sha }))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let err = request_error(response, &method, endpoint).await;
            if body_contains(&err, "already exists") {
                debug!(name, "branch already exists");
                return Ok(RefCreation::AlreadyExists);
            }
            return Err(err);
        }
        ensure_success(response, &method, endpoint).await?;
        debug!(name, "created branch");
        Ok(RefCreation::Created)
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<Option<FileContent>> {
        debug!(path, branch, "reading file");
        let endpoint = format!("{}?ref={}", Self::file_path(path), urlencoding::encode(branch));
        let response = self.request(Method::GET, &endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, branch, "file not found");
            return Ok(None);
        }
        let file: RepositoryFile = ensure_success(response, &Method::GET, &endpoint)
            .await?
            .json()
            .await?;

        let bytes = STANDARD
            .decode(file.content.trim())
            .map_err(|e| Error::GitLabApi(format!("invalid base64 content for {path}: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| Error::GitLabApi(format!("{path} is not UTF-8: {e}")))?;

        Ok(Some(FileContent {
            path: path.to_string(),
            content,
            token: file.last_commit_id,
        }))
    }

    async fn put_file(&self, update: &FileUpdate) -> Result<()> {
        debug!(path = %update.path, branch = %update.branch, "writing file");
        let endpoint = Self::file_path(&update.path);
        // PUT updates an existing file, POST creates one
        let method = if update.token.is_some() {
            Method::PUT
        } else {
            Method::POST
        };
        let payload = FilePayload {
            branch: &update.branch,
            content: &update.content,
            commit_message: &update.message,
            last_commit_id: update.token.as_deref(),
        };

        let response = self
            .request(method.clone(), &endpoint)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(Error::Conflict {
                path: update.path.clone(),
                branch: update.branch.clone(),
            });
        }
        if status == StatusCode::BAD_REQUEST {
            let err = request_error(response, &method, &endpoint).await;
            if body_contains(&err, "has changed") {
                return Err(Error::Conflict {
                    path: update.path.clone(),
                    branch: update.branch.clone(),
                });
            }
            return Err(err);
        }
        ensure_success(response, &method, &endpoint).await?;
        debug!(path = %update.path, "wrote file");
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        debug!("listing tags");
        self.list_names("/repository/tags").await
    }

    async fn create_tag(&self, name: &str, sha: &str, message: &str) -> Result<()> {
        debug!(name, sha, "creating tag");
        let method = Method::POST;
        let endpoint = "/repository/tags";
        let response = self
            .request(method.clone(), endpoint)
            .json(&json!({ "tag_name": name, "ref": sha, "message": message }))
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let err = request_error(response, &method, endpoint).await;
            if body_contains(&err, "already exists") {
                return Err(Error::TagAlreadyExists(name.to_string()));
            }
            return Err(err);
        }
        ensure_success(response, &method, endpoint).await?;
        debug!(name, "created tag");
        Ok(())
    }

    async fn commit_subjects(&self, base: &str, head: &str) -> Result<Vec<String>> {
        debug!(base, head, "comparing commits");
        let endpoint = format!(
            "/repository/compare?from={}&to={}",
            urlencoding::encode(base),
            urlencoding::encode(head)
        );
        let comparison: Comparison = self.send(Method::GET, &endpoint, None).await?.json().await?;
        Ok(comparison
            .commits
            .iter()
            .map(|c| subject_line(&c.title))
            .collect())
    }

    async fn find_open_request(&self, head: &str, base: &str) -> Result<Option<PullRequest>> {
        debug!(head, base, "finding open MR");
        let endpoint = format!(
            "/merge_requests?state=opened&source_branch={}&target_branch={}",
            urlencoding::encode(head),
            urlencoding::encode(base)
        );
        let mrs: Vec<MergeRequest> = self.send(Method::GET, &endpoint, None).await?.json().await?;

        let result = mrs
            .into_iter()
            .find(|mr| mr.source_branch == head && mr.target_branch == base)
            .map(PullRequest::from);
        if let Some(ref mr) = result {
            debug!(mr_iid = mr.number, "found open MR");
        } else {
            debug!("no open MR found");
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
        debug!(head, base, "creating MR");
        let payload = CreateMrPayload {
            source_branch: head,
            target_branch: base,
            title,
            description: body,
        };
        let mr: MergeRequest = self
            .send(
                Method::POST,
                "/merge_requests",
                Some(serde_json::to_value(&payload)?),
            )
            .await?
            .json()
            .await?;

        let result = PullRequest::from(mr);
        debug!(mr_iid = result.number, "created MR");
        Ok(result)
    }

    async fn merge_request(
        &self,
        number: u64,
        method: MergeMethod,
        title: &str,
    ) -> Result<MergeResult> {
        debug!(mr_iid = number, %method, "merging MR");
        let squash = method == MergeMethod::Squash;
        let mut payload = json!({ "squash": squash });
        if squash {
            payload["squash_commit_message"] = json!(title);
        } else {
            payload["merge_commit_message"] = json!(title);
        }

        let response: MergeResponse = self
            .send(
                Method::PUT,
                &format!("/merge_requests/{number}/merge"),
                Some(payload),
            )
            .await
            .map_err(|e| Error::GitLabApi(format!("Merge failed: {e}")))?
            .json()
            .await?;

        let merged = response.state == "merged";
        let merge_result = MergeResult {
            merged,
            sha: response.merge_commit_sha.or(response.squash_commit_sha),
            message: (!merged).then(|| format!("MR state is {}", response.state)),
        };
        debug!(
            mr_iid = number,
            merged = merge_result.merged,
            sha = ?merge_result.sha,
            "merge complete"
        );
        Ok(merge_result)
    }

    async fn close_request(&self, number: u64) -> Result<()> {
        debug!(mr_iid = number, "closing MR");
        self.send(
            Method::PUT,
            &format!("/merge_requests/{number}"),
            Some(json!({ "state_event": "close" })),
        )
        .await?;
        debug!(mr_iid = number, "closed MR");
        Ok(())
    }

    async fn merge_branch(&self, head: &str, base: &str, message: &str) -> Result<MergeResult> {
        debug!(head, base, "merging branch");
        // GitLab has no direct merge endpoint; go through a short-lived MR
        let subjects = self.commit_subjects(base, head).await?;
        if subjects.is_empty() {
            debug!(head, base, "nothing to merge");
            return Ok(MergeResult {
                merged: true,
                sha: None,
                message: Some(format!("{base} already contains {head}")),
            });
        }

        let mr = match self.find_open_request(head, base).await? {
            Some(mr) => mr,
            None => self.create_request(head, base, message, message).await?,
        };
        self.merge_request(mr.number, MergeMethod::Merge, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn service(server: &Server) -> GitLabService {
        GitLabService::new(
            "token".to_string(),
            &format!("{}/api/v4", server.url()),
            PlatformConfig {
                platform: Platform::GitLab,
                owner: "group".to_string(),
                repo: "app".to_string(),
                host: "gitlab.example.com".to_string(),
            },
            Some("42"),
        )
        .unwrap()
    }

    #[test]
    fn test_project_ref_from_path() {
        let svc = GitLabService::new(
            "t".to_string(),
            "https://gitlab.com/api/v4/",
            PlatformConfig {
                platform: Platform::GitLab,
                owner: "group/sub".to_string(),
                repo: "app".to_string(),
                host: "gitlab.com".to_string(),
            },
            None,
        )
        .unwrap();
        assert_eq!(
            svc.api_url("/repository/tags"),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fapp/repository/tags"
        );
    }

    #[tokio::test]
    async fn test_create_branch_existing_is_noop() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/42/repository/branches")
            .match_header("PRIVATE-TOKEN", "token")
            .with_status(400)
            .with_body(r#"{"message":"Branch already exists"}"#)
            .create_async()
            .await;

        let outcome = service(&server).create_branch("s2test", "abc").await.unwrap();
        assert_eq!(outcome, RefCreation::AlreadyExists);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_file_uses_encoded_path() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "GET",
                "/api/v4/projects/42/repository/files/demo_package%2F__init__.py",
            )
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(r#"{"content":"X192ZXJzaW9uX18gPSAiMi4zLjAiCg==","last_commit_id":"c1"}"#)
            .create_async()
            .await;

        let file = service(&server)
            .get_file("demo_package/__init__.py", "main")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.content, "__version__ = \"2.3.0\"\n");
        assert_eq!(file.token, "c1");
    }

    #[tokio::test]
    async fn test_put_file_creates_without_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/42/repository/files/CHANGELOG.md")
            .match_body(Matcher::PartialJson(json!({
                "branch": "main",
                "commit_message": "Update changelog for v2.4.0",
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        service(&server)
            .put_file(&FileUpdate {
                path: "CHANGELOG.md".to_string(),
                branch: "main".to_string(),
                content: "# Changelog\n".to_string(),
                message: "Update changelog for v2.4.0".to_string(),
                token: None,
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_file_changed_is_conflict() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/v4/projects/42/repository/files/CHANGELOG.md")
            .with_status(400)
            .with_body(r#"{"message":"You are attempting to update a file that has changed since you started editing it."}"#)
            .create_async()
            .await;

        let err = service(&server)
            .put_file(&FileUpdate {
                path: "CHANGELOG.md".to_string(),
                branch: "main".to_string(),
                content: "x".to_string(),
                message: "m".to_string(),
                token: Some("stale".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_tag_existing() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v4/projects/42/repository/tags")
            .with_status(400)
            .with_body(r#"{"message":"Tag v2.4.0 already exists"}"#)
            .create_async()
            .await;

        let err = service(&server)
            .create_tag("v2.4.0", "abc", "Release v2.4.0")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TagAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_merge_request_reports_sha() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/v4/projects/42/merge_requests/7/merge")
            .match_body(Matcher::PartialJson(json!({ "squash": true })))
            .with_status(200)
            .with_body(r#"{"state":"merged","merge_commit_sha":null,"squash_commit_sha":"sq1"}"#)
            .create_async()
            .await;

        let result = service(&server)
            .merge_request(7, MergeMethod::Squash, "Auto-merge s3test → main")
            .await
            .unwrap();
        assert!(result.merged);
        assert_eq!(result.sha.as_deref(), Some("sq1"));
    }

    #[tokio::test]
    async fn test_find_open_request_filters_exactly() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/merge_requests")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"iid":3,"web_url":"u","source_branch":"s3test-old","target_branch":"main","title":"t"},
                    {"iid":4,"web_url":"u4","source_branch":"s3test","target_branch":"main","title":"t"}]"#,
            )
            .create_async()
            .await;

        let mr = service(&server)
            .find_open_request("s3test", "main")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mr.number, 4);
    }

    #[tokio::test]
    async fn test_merge_branch_nothing_to_merge() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/repository/compare")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"commits":[]}"#)
            .create_async()
            .await;

        let result = service(&server)
            .merge_branch("s3test", "main", "Auto-merge s3test → main")
            .await
            .unwrap();
        assert!(result.merged);
        assert!(result.sha.is_none());
    }
}
