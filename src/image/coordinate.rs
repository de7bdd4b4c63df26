use super::error::ImageError;
use serde::Serialize;
use std::fmt;

/// Repository prefix for images that are only built locally
pub const LOCAL_PREFIX: &str = "mcp-local";

/// Registry-qualified repository path plus tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCoordinate {
    pub repository_path: String,
    pub tag: String,
}

impl ImageCoordinate {
    pub fn new(repository_path: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository_path: repository_path.into(),
            tag: tag.into(),
        }
    }

    /// `<registry>/<image>` when a registry is given, `mcp-local/<image>` otherwise
    pub fn for_build(registry: Option<&str>, image_name: &str, tag: &str) -> Self {
        let base = registry
            .map(|r| r.trim_end_matches('/'))
            .filter(|r| !r.is_empty())
            .unwrap_or(LOCAL_PREFIX);
        Self::new(format!("{}/{}", base, image_name), tag)
    }

    /// `repository_path:tag`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository_path, self.tag)
    }

    /// Repository path without the registry host segment
    pub fn repository_name(&self) -> &str {
        match self.repository_path.split_once('/') {
            Some((_, rest)) => rest,
            None => &self.repository_path,
        }
    }

    pub fn registry_host(&self) -> Option<&str> {
        self.repository_path.split_once('/').map(|(host, _)| host)
    }

    pub fn is_local(&self) -> bool {
        self.registry_host() == Some(LOCAL_PREFIX)
    }
}

impl fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository_path, self.tag)
    }
}

/// Repository name (minus `.git`), suffixed with the subfolder path
pub fn derive_image_name(repository_url: &str, subfolder: Option<&str>) -> String {
    let trimmed = repository_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let repo_name = trimmed.rsplit('/').next().unwrap_or(trimmed);

    match subfolder.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{}-{}", repo_name, sub.replace('/', "-")),
        None => repo_name.to_string(),
    }
}

/// Splits an image URI into `(image_name, repository_base)`
pub fn parse_image_uri(uri: &str) -> Result<(String, String), ImageError> {
    let (base, last) = uri
        .trim()
        .rsplit_once('/')
        .ok_or_else(|| ImageError::InvalidImageUri(uri.to_string()))?;

    let image_name = last.split(':').next().unwrap_or(last);
    if base.is_empty() || image_name.is_empty() {
        return Err(ImageError::InvalidImageUri(uri.to_string()));
    }
    Ok((image_name.to_string(), base.to_string()))
}
