//! Reproducible image tags
//!
//! `<hash8|nocommit>[-<branch>]-<YYYYMMDD-HHMMSS>`. Commit lookup failures
//! never abort a build; they only replace the hash with [`NO_COMMIT`].

use crate::source::RepositoryUrl;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_COMMIT: &str = "nocommit";
pub const HASH_LEN: usize = 8;
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

const GITHUB_API: &str = "https://api.github.com";
const DEFAULT_REF: &str = "HEAD";

#[async_trait]
pub trait CommitLookup: Send + Sync {
    /// Full commit SHA at `reference` (a branch name or `HEAD`)
    async fn commit_sha(&self, owner: &str, repo: &str, reference: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}` against the GitHub REST API
pub struct GitHubCommitLookup {
    client: reqwest::Client,
    api_base: String,
}

impl GitHubCommitLookup {
    pub fn new() -> Self {
        Self::with_api_base(GITHUB_API)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for GitHubCommitLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommitLookup for GitHubCommitLookup {
    async fn commit_sha(&self, owner: &str, repo: &str, reference: &str) -> Result<String> {
        let url = format!("{}/repos/{}/{}/commits/{}", self.api_base, owner, repo, reference);
        debug!(url = %url, "Looking up commit");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, concat!("mcpship/", env!("CARGO_PKG_VERSION")))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("GitHub API returned HTTP {} for {}", response.status(), url);
        }

        let body: CommitResponse = response
            .json()
            .await
            .context("Malformed commit response")?;
        Ok(body.sha)
    }
}

/// Lookup returning a fixed answer; `None` behaves like an unreachable API
pub struct StaticCommitLookup {
    sha: Option<String>,
}

impl StaticCommitLookup {
    pub fn new(sha: Option<&str>) -> Self {
        Self {
            sha: sha.map(str::to_string),
        }
    }
}

#[async_trait]
impl CommitLookup for StaticCommitLookup {
    async fn commit_sha(&self, _owner: &str, _repo: &str, _reference: &str) -> Result<String> {
        match &self.sha {
            Some(sha) => Ok(sha.clone()),
            None => bail!("commit lookup unavailable"),
        }
    }
}

pub struct TagDeriver {
    lookup: Arc<dyn CommitLookup>,
}

impl TagDeriver {
    pub fn new(lookup: Arc<dyn CommitLookup>) -> Self {
        Self { lookup }
    }

    /// Tag stamped with the current local time
    pub async fn derive(&self, repository_url: &str, branch: Option<&str>) -> String {
        self.derive_at(repository_url, branch, Local::now().naive_local())
            .await
    }

    pub async fn derive_at(
        &self,
        repository_url: &str,
        branch: Option<&str>,
        at: NaiveDateTime,
    ) -> String {
        let hash = self.hash_segment(repository_url, branch).await;
        let tag = format_tag(&hash, branch, at);
        info!(tag = %tag, "Derived image tag");
        tag
    }

    async fn hash_segment(&self, repository_url: &str, branch: Option<&str>) -> String {
        let repo = match RepositoryUrl::parse(repository_url) {
            Ok(repo) => repo,
            Err(e) => {
                warn!("Cannot look up commit: {}", e);
                return NO_COMMIT.to_string();
            }
        };

        let reference = branch.unwrap_or(DEFAULT_REF);
        match self.lookup.commit_sha(repo.owner(), repo.name(), reference).await {
            Ok(sha) => short_hash(&sha).unwrap_or_else(|| {
                warn!(sha = %sha, "Commit lookup returned an invalid SHA");
                NO_COMMIT.to_string()
            }),
            Err(e) => {
                warn!("Commit lookup failed, tagging as '{}': {:#}", NO_COMMIT, e);
                NO_COMMIT.to_string()
            }
        }
    }
}

/// First [`HASH_LEN`] hex characters, lowercased
fn short_hash(sha: &str) -> Option<String> {
    let sha = sha.trim();
    let prefix = sha.get(..HASH_LEN)?;
    prefix
        .chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| prefix.to_ascii_lowercase())
}

/// Branch names may contain characters a Docker tag cannot
fn tag_safe(branch: &str) -> String {
    branch
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub fn format_tag(hash: &str, branch: Option<&str>, at: NaiveDateTime) -> String {
    let timestamp = at.format(TIMESTAMP_FORMAT);
    match branch.filter(|b| !b.is_empty()) {
        Some(branch) => format!("{}-{}-{}", hash, tag_safe(branch), timestamp),
        None => format!("{}-{}", hash, timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    struct RecordingLookup {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl CommitLookup for RecordingLookup {
        async fn commit_sha(&self, owner: &str, repo: &str, reference: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((owner.into(), repo.into(), reference.into()));
            Ok("0123456789abcdef0123456789abcdef01234567".into())
        }
    }

    #[tokio::test]
    async fn test_tag_with_commit() {
        let deriver = TagDeriver::new(Arc::new(StaticCommitLookup::new(Some(
            "ABCDEF1234567890",
        ))));
        let tag = deriver
            .derive_at("https://github.com/o/r", None, at())
            .await;
        assert_eq!(tag, "abcdef12-20250314-092653");
    }

    #[tokio::test]
    async fn test_tag_with_branch() {
        let deriver = TagDeriver::new(Arc::new(StaticCommitLookup::new(Some("deadbeefcafe"))));
        let tag = deriver
            .derive_at("https://github.com/o/r", Some("develop"), at())
            .await;
        assert_eq!(tag, "deadbeef-develop-20250314-092653");
    }

    #[tokio::test]
    async fn test_failed_lookup_uses_marker() {
        let deriver = TagDeriver::new(Arc::new(StaticCommitLookup::new(None)));
        let tag = deriver
            .derive_at("https://github.com/o/r", None, at())
            .await;
        assert_eq!(tag, "nocommit-20250314-092653");
    }

    #[tokio::test]
    async fn test_garbage_sha_uses_marker() {
        for sha in ["", "abc", "not-a-hash-at-all"] {
            let deriver = TagDeriver::new(Arc::new(StaticCommitLookup::new(Some(sha))));
            let tag = deriver
                .derive_at("https://github.com/o/r", None, at())
                .await;
            assert!(tag.starts_with("nocommit-"), "{} gave {}", sha, tag);
        }
    }

    #[tokio::test]
    async fn test_malformed_url_skips_lookup() {
        let lookup = Arc::new(RecordingLookup {
            calls: Mutex::new(Vec::new()),
        });
        let deriver = TagDeriver::new(lookup.clone());
        let tag = deriver
            .derive_at("https://example.com/o/r", Some("main"), at())
            .await;
        assert_eq!(tag, "nocommit-main-20250314-092653");
        assert!(lookup.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_reference() {
        let lookup = Arc::new(RecordingLookup {
            calls: Mutex::new(Vec::new()),
        });
        let deriver = TagDeriver::new(lookup.clone());
        deriver
            .derive_at("https://github.com/awslabs/mcp.git", None, at())
            .await;
        deriver
            .derive_at("https://github.com/awslabs/mcp", Some("dev"), at())
            .await;

        let calls = lookup.calls.lock().unwrap();
        assert_eq!(calls[0], ("awslabs".into(), "mcp".into(), "HEAD".into()));
        assert_eq!(calls[1].2, "dev");
    }

    #[test]
    fn test_branch_is_made_tag_safe() {
        assert_eq!(
            format_tag("nocommit", Some("feature/login"), at()),
            "nocommit-feature-login-20250314-092653"
        );
    }
}
