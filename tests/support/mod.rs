//! Shared helpers for integration tests

use async_trait::async_trait;
use mcpship::source::{resolve_subfolder, FetchError, RepositoryUrl, SourceFetcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// `tests/fixtures/servers/<name>`
#[allow(dead_code)]
pub fn server_fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("servers")
        .join(name)
}

#[allow(dead_code)]
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Serves a fixture tree in place of a downloaded archive
#[allow(dead_code)]
pub struct FixtureFetcher {
    fixture: PathBuf,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

#[allow(dead_code)]
impl FixtureFetcher {
    pub fn new(name: &str) -> Self {
        Self {
            fixture: server_fixture(name),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(repository, branch)` per fetch
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for FixtureFetcher {
    async fn fetch(
        &self,
        repo: &RepositoryUrl,
        branch: Option<&str>,
        subfolder: Option<&str>,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((repo.to_string(), branch.map(str::to_string)));

        let root = workspace.join(format!("{}-main", repo.name()));
        let (src, dst) = (self.fixture.clone(), root.clone());
        tokio::task::spawn_blocking(move || copy_dir(&src, &dst))
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?
            .map_err(|e| FetchError::Io(e.to_string()))?;
        resolve_subfolder(&root, subfolder)
    }
}

#[allow(dead_code)]
pub fn mcpship_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("mcpship")
}
