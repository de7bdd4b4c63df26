use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid GitHub repository URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Archive is not a valid zip file: {0}")]
    Archive(String),

    #[error("No directory found in extracted archive")]
    EmptyArchive,

    #[error("Subfolder '{0}' not found in repository")]
    SubfolderNotFound(String),

    #[error("Workspace I/O error: {0}")]
    Io(String),
}

impl FetchError {
    pub fn help_message(&self) -> String {
        match self {
            FetchError::InvalidUrl(url) => format!(
                "Error: Invalid repository URL\nURL: {}\n\n\
                Help: Use the form https://github.com/<owner>/<repo>",
                url
            ),
            FetchError::Download { url, reason } => format!(
                "Error: Could not download the repository archive\nURL: {}\n\n\
                Help: Check that the repository is public and the branch exists.\n\
                The default branch is 'main'; set build.branch otherwise.\n\n\
                Details: {}",
                url, reason
            ),
            FetchError::SubfolderNotFound(subfolder) => format!(
                "Error: Subfolder '{}' not found in repository\n\n\
                Help: build.subfolder is relative to the repository root.",
                subfolder
            ),
            other => format!("Error: {}", other),
        }
    }
}
