//! Source acquisition
//!
//! A [`SourceFetcher`] places an extracted repository inside a workspace
//! directory owned by the caller and returns the server root within it.

mod error;
mod github;

pub use error::FetchError;
pub use github::GitHubArchiveFetcher;

use async_trait::async_trait;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

pub const GITHUB_PREFIX: &str = "https://github.com/";
pub const DEFAULT_BRANCH: &str = "main";

/// `https://github.com/<owner>/<name>` with any `.git` suffix removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryUrl {
    owner: String,
    name: String,
}

impl RepositoryUrl {
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let trimmed = url.trim();
        let without_suffix = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let path = without_suffix
            .strip_prefix(GITHUB_PREFIX)
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;

        let parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(FetchError::InvalidUrl(url.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archive_url(&self, branch: Option<&str>) -> String {
        format!(
            "{}{}/{}/archive/refs/heads/{}.zip",
            GITHUB_PREFIX,
            self.owner,
            self.name,
            branch.unwrap_or(DEFAULT_BRANCH)
        )
    }
}

impl fmt::Display for RepositoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", GITHUB_PREFIX, self.owner, self.name)
    }
}

/// Temporary directory holding one build's fetched source; removed on drop
pub struct SourceWorkspace {
    dir: TempDir,
}

impl SourceWorkspace {
    pub fn new() -> Result<Self, FetchError> {
        let dir = tempfile::Builder::new()
            .prefix("mcpship-")
            .tempdir()
            .map_err(|e| FetchError::Io(format!("cannot create workspace: {}", e)))?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches `repo` into `workspace` and returns the server root
    async fn fetch(
        &self,
        repo: &RepositoryUrl,
        branch: Option<&str>,
        subfolder: Option<&str>,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError>;
}

/// Single extracted top-level directory, ignoring `__pycache__`
pub(crate) fn extracted_root(dir: &Path) -> Result<PathBuf, FetchError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| FetchError::Io(format!("cannot list {}: {}", dir.display(), e)))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| path.file_name().map_or(false, |n| n != "__pycache__"))
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or(FetchError::EmptyArchive)
}

/// Joins a user-supplied subfolder onto the repository root
pub fn resolve_subfolder(repo_root: &Path, subfolder: Option<&str>) -> Result<PathBuf, FetchError> {
    let Some(subfolder) = subfolder.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) else {
        return Ok(repo_root.to_path_buf());
    };

    let relative = Path::new(subfolder);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(FetchError::SubfolderNotFound(subfolder.to_string()));
    }

    let path = repo_root.join(relative);
    if !path.is_dir() {
        return Err(FetchError::SubfolderNotFound(subfolder.to_string()));
    }
    Ok(path)
}
