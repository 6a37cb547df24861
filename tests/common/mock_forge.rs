//! In-memory forge for driving release cycles in tests
//!
//! These are test utilities - not all may be used in current tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sprint_rollup::error::{Error, Result};
use sprint_rollup::platform::ForgeService;
use sprint_rollup::types::{
    FileContent, FileUpdate, MergeMethod, MergeResult, Platform, PlatformConfig, PullRequest,
    RefCreation,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of a mock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Open,
    Merged,
    Closed,
}

/// A request stored by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub number: u64,
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub state: RequestState,
}

/// A tag stored by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    pub name: String,
    pub sha: String,
    pub message: String,
}

/// Call record for `merge_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub number: u64,
    pub method: MergeMethod,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
struct Branch {
    head: String,
    files: BTreeMap<String, String>,
    /// Files as they were when the branch was created
    forked: BTreeMap<String, String>,
}

#[derive(Default)]
struct Repo {
    branches: BTreeMap<String, Branch>,
    tags: Vec<MockTag>,
    requests: Vec<MockRequest>,
    subjects: HashMap<(String, String), Vec<String>>,
}

/// In-memory `ForgeService`
///
/// Features:
/// - Branches carry their own files; creating a branch copies the files of
///   the branch whose head matches the requested SHA
/// - Merging copies the files the head branch changed since it was created
/// - Call tracking for verification
/// - Error injection per operation name
pub struct MockForge {
    config: PlatformConfig,
    repo: Mutex<Repo>,
    next_number: AtomicU64,
    next_sha: AtomicU64,
    calls: Mutex<Vec<String>>,
    file_writes: Mutex<Vec<FileUpdate>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    errors: Mutex<HashMap<String, String>>,
    races: Mutex<Vec<String>>,
    merge_responses: Mutex<HashMap<u64, MergeResult>>,
}

impl MockForge {
    /// Create an empty repository with only `mainline`
    pub fn new(mainline: &str) -> Self {
        let forge = Self {
            config: PlatformConfig {
                platform: Platform::GitHub,
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                host: "github.com".to_string(),
            },
            repo: Mutex::new(Repo::default()),
            next_number: AtomicU64::new(1),
            next_sha: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            file_writes: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            errors: Mutex::new(HashMap::new()),
            races: Mutex::new(Vec::new()),
            merge_responses: Mutex::new(HashMap::new()),
        };
        let head = forge.new_sha();
        forge.repo.lock().unwrap().branches.insert(
            mainline.to_string(),
            Branch {
                head,
                ..Branch::default()
            },
        );
        forge
    }

    fn new_sha(&self) -> String {
        format!("sha{}", self.next_sha.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_error(&self, op: &str) -> Result<()> {
        match self.errors.lock().unwrap().get(op) {
            Some(body) => Err(Error::ForgeRequest {
                method: "MOCK".to_string(),
                endpoint: op.to_string(),
                status: 500,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    // === Setup ===

    /// Write a file directly (no call recorded)
    pub fn seed_file(&self, branch: &str, path: &str, content: &str) {
        let sha = self.new_sha();
        let mut repo = self.repo.lock().unwrap();
        let b = repo.branches.entry(branch.to_string()).or_default();
        b.files.insert(path.to_string(), content.to_string());
        b.head = sha;
    }

    /// Create a branch as a copy of `from` (no call recorded)
    pub fn seed_branch(&self, name: &str, from: &str) {
        let mut repo = self.repo.lock().unwrap();
        let source = repo.branches.get(from).cloned().unwrap_or_default();
        repo.branches.insert(
            name.to_string(),
            Branch {
                head: source.head,
                forked: source.files.clone(),
                files: source.files,
            },
        );
    }

    /// Create a tag (no call recorded)
    pub fn seed_tag(&self, name: &str) {
        self.repo.lock().unwrap().tags.push(MockTag {
            name: name.to_string(),
            sha: "seeded".to_string(),
            message: String::new(),
        });
    }

    /// Open a request (no call recorded); returns its number
    pub fn seed_request(&self, head: &str, base: &str, title: &str) -> u64 {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        self.repo.lock().unwrap().requests.push(MockRequest {
            number,
            head: head.to_string(),
            base: base.to_string(),
            title: title.to_string(),
            body: String::new(),
            state: RequestState::Open,
        });
        number
    }

    /// Set the subjects returned by `commit_subjects(base, head)`
    pub fn set_subjects(&self, base: &str, head: &str, subjects: &[&str]) {
        self.repo.lock().unwrap().subjects.insert(
            (base.to_string(), head.to_string()),
            subjects.iter().map(ToString::to_string).collect(),
        );
    }

    /// Make operation `op` (trait method name) fail
    pub fn fail_on(&self, op: &str, body: &str) {
        self.errors
            .lock()
            .unwrap()
            .insert(op.to_string(), body.to_string());
    }

    /// Move the branch head right after the next read of `path`, as if
    /// someone else committed between our read and write
    pub fn race_after_read(&self, path: &str) {
        self.races.lock().unwrap().push(path.to_string());
    }

    /// Override the result of `merge_request` for a request
    pub fn set_merge_response(&self, number: u64, result: MergeResult) {
        self.merge_responses.lock().unwrap().insert(number, result);
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.file_writes.lock().unwrap().clear();
        self.merge_calls.lock().unwrap().clear();
    }

    // === Inspection ===

    /// Every recorded call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls that change the repository
    pub fn mutations(&self) -> Vec<String> {
        const READS: [&str; 6] = [
            "list_branches",
            "branch_head",
            "get_file",
            "list_tags",
            "commit_subjects",
            "find_open_request",
        ];
        self.calls()
            .into_iter()
            .filter(|c| !READS.iter().any(|r| c.split(' ').next() == Some(*r)))
            .collect()
    }

    /// Every `put_file` call
    pub fn file_writes(&self) -> Vec<FileUpdate> {
        self.file_writes.lock().unwrap().clone()
    }

    /// Every `merge_request` call
    pub fn merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    /// Current content of `path` on `branch`
    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        self.repo
            .lock()
            .unwrap()
            .branches
            .get(branch)
            .and_then(|b| b.files.get(path).cloned())
    }

    /// Branch names
    pub fn branch_names(&self) -> Vec<String> {
        self.repo.lock().unwrap().branches.keys().cloned().collect()
    }

    /// Head SHA of a branch
    pub fn head(&self, branch: &str) -> Option<String> {
        self.repo
            .lock()
            .unwrap()
            .branches
            .get(branch)
            .map(|b| b.head.clone())
    }

    /// All tags
    pub fn tags(&self) -> Vec<MockTag> {
        self.repo.lock().unwrap().tags.clone()
    }

    /// All requests
    pub fn requests(&self) -> Vec<MockRequest> {
        self.repo.lock().unwrap().requests.clone()
    }

    /// Requests in a given state
    pub fn requests_in(&self, state: RequestState) -> Vec<MockRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.state == state)
            .collect()
    }

    fn to_pull_request(request: &MockRequest) -> PullRequest {
        PullRequest {
            number: request.number,
            html_url: format!("https://github.com/acme/widgets/pull/{}", request.number),
            base_ref: request.base.clone(),
            head_ref: request.head.clone(),
            title: request.title.clone(),
        }
    }

    /// Apply `head`'s changes onto `base`; `None` when there is nothing to merge
    fn apply_merge(&self, head: &str, base: &str) -> Result<Option<String>> {
        let sha = self.new_sha();
        let mut repo = self.repo.lock().unwrap();
        let source = repo
            .branches
            .get(head)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("no branch {head}")))?;
        let target = repo
            .branches
            .get_mut(base)
            .ok_or_else(|| Error::Internal(format!("no branch {base}")))?;

        let mut changed = false;
        for (path, content) in &source.files {
            if source.forked.get(path) != Some(content) && target.files.get(path) != Some(content) {
                target.files.insert(path.clone(), content.clone());
                changed = true;
            }
        }
        if !changed {
            return Ok(None);
        }
        target.head = sha.clone();
        Ok(Some(sha))
    }
}

#[async_trait]
impl ForgeService for MockForge {
    fn config(&self) -> &PlatformConfig {
        &self.config
    }

    async fn list_branches(&self) -> Result<Vec<String>> {
        self.record("list_branches".to_string());
        self.check_error("list_branches")?;
        Ok(self.branch_names())
    }

    async fn branch_head(&self, branch: &str) -> Result<String> {
        self.record(format!("branch_head {branch}"));
        self.check_error("branch_head")?;
        self.head(branch).ok_or_else(|| Error::ForgeRequest {
            method: "GET".to_string(),
            endpoint: format!("/branches/{branch}"),
            status: 404,
            body: "Branch not found".to_string(),
        })
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<RefCreation> {
        self.record(format!("create_branch {name}"));
        self.check_error("create_branch")?;
        let mut repo = self.repo.lock().unwrap();
        if repo.branches.contains_key(name) {
            return Ok(RefCreation::AlreadyExists);
        }
        let files = repo
            .branches
            .values()
            .find(|b| b.head == sha)
            .map(|b| b.files.clone())
            .unwrap_or_default();
        repo.branches.insert(
            name.to_string(),
            Branch {
                head: sha.to_string(),
                forked: files.clone(),
                files,
            },
        );
        Ok(RefCreation::Created)
    }

    async fn get_file(&self, path: &str, branch: &str) -> Result<Option<FileContent>> {
        self.record(format!("get_file {branch} {path}"));
        self.check_error("get_file")?;
        let raced = {
            let mut races = self.races.lock().unwrap();
            let found = races.iter().position(|p| p == path);
            found.map(|i| races.remove(i)).is_some()
        };
        let sha = self.new_sha();
        let mut repo = self.repo.lock().unwrap();
        let Some(b) = repo.branches.get_mut(branch) else {
            return Ok(None);
        };
        let file = b.files.get(path).map(|content| FileContent {
            path: path.to_string(),
            content: content.clone(),
            token: b.head.clone(),
        });
        if raced {
            b.head = sha;
        }
        Ok(file)
    }

    async fn put_file(&self, update: &FileUpdate) -> Result<()> {
        self.record(format!("put_file {} {}", update.branch, update.path));
        self.check_error("put_file")?;
        let sha = self.new_sha();
        {
            let mut repo = self.repo.lock().unwrap();
            let branch = repo
                .branches
                .get_mut(&update.branch)
                .ok_or_else(|| Error::Internal(format!("no branch {}", update.branch)))?;
            let exists = branch.files.contains_key(&update.path);
            match (&update.token, exists) {
                (Some(token), true) if *token == branch.head => {}
                (None, false) => {}
                _ => {
                    return Err(Error::Conflict {
                        path: update.path.clone(),
                        branch: update.branch.clone(),
                    });
                }
            }
            branch
                .files
                .insert(update.path.clone(), update.content.clone());
            branch.head = sha;
        }
        self.file_writes.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        self.record("list_tags".to_string());
        self.check_error("list_tags")?;
        Ok(self.tags().into_iter().map(|t| t.name).collect())
    }

    async fn create_tag(&self, name: &str, sha: &str, message: &str) -> Result<()> {
        self.record(format!("create_tag {name}"));
        self.check_error("create_tag")?;
        let mut repo = self.repo.lock().unwrap();
        if repo.tags.iter().any(|t| t.name == name) {
            return Err(Error::TagAlreadyExists(name.to_string()));
        }
        repo.tags.push(MockTag {
            name: name.to_string(),
            sha: sha.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn commit_subjects(&self, base: &str, head: &str) -> Result<Vec<String>> {
        self.record(format!("commit_subjects {base} {head}"));
        self.check_error("commit_subjects")?;
        Ok(self
            .repo
            .lock()
            .unwrap()
            .subjects
            .get(&(base.to_string(), head.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn find_open_request(&self, head: &str, base: &str) -> Result<Option<PullRequest>> {
        self.record(format!("find_open_request {head} {base}"));
        self.check_error("find_open_request")?;
        Ok(self
            .requests()
            .iter()
            .find(|r| r.head == head && r.base == base && r.state == RequestState::Open)
            .map(Self::to_pull_request))
    }

    async fn create_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        self.record(format!("create_request {head} {base}"));
        self.check_error("create_request")?;
        let request = MockRequest {
            number: self.next_number.fetch_add(1, Ordering::SeqCst),
            head: head.to_string(),
            base: base.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            state: RequestState::Open,
        };
        let pr = Self::to_pull_request(&request);
        self.repo.lock().unwrap().requests.push(request);
        Ok(pr)
    }

    async fn merge_request(
        &self,
        number: u64,
        method: MergeMethod,
        title: &str,
    ) -> Result<MergeResult> {
        self.record(format!("merge_request {number}"));
        self.merge_calls.lock().unwrap().push(MergeCall {
            number,
            method,
            title: title.to_string(),
        });
        self.check_error("merge_request")?;
        if let Some(result) = self.merge_responses.lock().unwrap().get(&number) {
            return Ok(result.clone());
        }

        let request = self
            .requests()
            .into_iter()
            .find(|r| r.number == number)
            .ok_or_else(|| Error::Internal(format!("no request #{number}")))?;
        let sha = self.apply_merge(&request.head, &request.base)?;
        if let Some(r) = self
            .repo
            .lock()
            .unwrap()
            .requests
            .iter_mut()
            .find(|r| r.number == number)
        {
            r.state = RequestState::Merged;
        }
        Ok(MergeResult {
            merged: true,
            sha,
            message: None,
        })
    }

    async fn close_request(&self, number: u64) -> Result<()> {
        self.record(format!("close_request {number}"));
        self.check_error("close_request")?;
        if let Some(r) = self
            .repo
            .lock()
            .unwrap()
            .requests
            .iter_mut()
            .find(|r| r.number == number)
        {
            r.state = RequestState::Closed;
        }
        Ok(())
    }

    async fn merge_branch(&self, head: &str, base: &str, message: &str) -> Result<MergeResult> {
        self.record(format!("merge_branch {head} {base}"));
        self.check_error("merge_branch")?;
        let sha = self.apply_merge(head, base)?;
        Ok(MergeResult {
            merged: true,
            message: sha.is_none().then(|| format!("{base} already contains {head}: {message}")),
            sha,
        })
    }
}
