use super::{extracted_root, resolve_subfolder, FetchError, RepositoryUrl, SourceFetcher};
use async_trait::async_trait;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Downloads `archive/refs/heads/<branch>.zip` and extracts it
pub struct GitHubArchiveFetcher {
    client: reqwest::Client,
}

impl GitHubArchiveFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let download_err = |reason: String| FetchError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Default for GitHubArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for GitHubArchiveFetcher {
    async fn fetch(
        &self,
        repo: &RepositoryUrl,
        branch: Option<&str>,
        subfolder: Option<&str>,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError> {
        let url = repo.archive_url(branch);
        info!(repository = %repo, branch = branch.unwrap_or("main"), "Fetching source archive");

        let data = self.download(&url).await?;
        debug!(bytes = data.len(), "Downloaded archive");

        let extract_dir = workspace.join("source");
        extract_in_background(data, extract_dir.clone()).await?;

        let repo_root = extracted_root(&extract_dir)?;
        let server_root = resolve_subfolder(&repo_root, subfolder)?;
        info!("Server source at {}", server_root.display());
        Ok(server_root)
    }
}

/// Runs [`extract_archive`] on the blocking pool
pub(crate) async fn extract_in_background(data: Vec<u8>, dest: PathBuf) -> Result<(), FetchError> {
    tokio::task::spawn_blocking(move || extract_archive(&data, &dest))
        .await
        .map_err(|e| FetchError::Io(format!("archive extraction task failed: {}", e)))?
}

/// Extracts a zip archive, skipping entries that would escape `dest`
pub(crate) fn extract_archive(data: &[u8], dest: &Path) -> Result<(), FetchError> {
    let io_err = |path: &Path, e: std::io::Error| FetchError::Io(format!("{}: {}", path.display(), e));

    std::fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;

    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| FetchError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FetchError::Archive(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            debug!(entry = entry.name(), "Skipping unsafe archive path");
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| io_err(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let mut buffer = Vec::new();
        entry
            .read_to_end(&mut buffer)
            .map_err(|e| FetchError::Archive(format!("{}: {}", entry.name(), e)))?;

        let mut outfile = std::fs::File::create(&outpath).map_err(|e| io_err(&outpath, e))?;
        outfile.write_all(&buffer).map_err(|e| io_err(&outpath, e))?;
    }

    Ok(())
}
