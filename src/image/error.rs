use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid image URI '{0}': expected <registry>/<repository>/<name>[:tag]")]
    InvalidImageUri(String),

    #[error("Cannot reach the Docker daemon: {0}")]
    DaemonUnavailable(String),

    #[error("Failed to prepare build context: {0}")]
    Context(String),

    #[error("Image build failed: {0}")]
    BuildFailed(String),

    #[error("Image push failed: {0}")]
    PushFailed(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Failed to read Dockerfile {path}: {reason}")]
    DockerfileUnreadable { path: String, reason: String },
}

impl ImageError {
    pub fn help_message(&self) -> String {
        match self {
            ImageError::DaemonUnavailable(msg) => format!(
                "Error: Docker daemon unavailable\n\n\
                Help: Start Docker and check that DOCKER_HOST points at it.\n\n\
                Details: {}",
                msg
            ),
            ImageError::Registry(msg) | ImageError::PushFailed(msg) => format!(
                "Error: Could not push to the container registry\n\n\
                Help: Check AWS credentials and that they allow ecr:GetAuthorizationToken,\n\
                ecr:CreateRepository and image uploads.\n\n\
                Details: {}",
                msg
            ),
            other => format!("Error: {}", other),
        }
    }
}
