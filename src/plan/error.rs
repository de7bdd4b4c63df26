use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why the extractor chain produced no usable command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceFailure {
    /// README examples only ever launch the server through `docker`
    DockerOnly,
    /// No strategy found anything usable
    NothingFound,
}

impl fmt::Display for InferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceFailure::DockerOnly => {
                f.write_str("only docker-based commands were found in the README")
            }
            InferenceFailure::NothingFound => f.write_str("no start command could be inferred"),
        }
    }
}

/// Errors that can occur while resolving a build plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Could not determine how to start the server in {root}: {failure}")]
    InferenceExhausted {
        root: PathBuf,
        failure: InferenceFailure,
    },
}

impl PlanError {
    pub fn inference_failure(&self) -> Option<InferenceFailure> {
        match self {
            PlanError::InferenceExhausted { failure, .. } => Some(*failure),
            _ => None,
        }
    }

    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            PlanError::SourceNotFound(path) => format!(
                "Error: Source path not found\nPath: {}\n\n\
                Help: Check that the repository was fetched and that the\n\
                configured subfolder exists.",
                path.display()
            ),
            PlanError::NotADirectory(path) => format!(
                "Error: Source path is not a directory\nPath: {}\n\n\
                Help: Point the build at the server's root directory.",
                path.display()
            ),
            PlanError::ReadFailed { path, reason } => format!(
                "Error: Failed to read {}\n\n\
                Help: Check file permissions and encoding.\n\nDetails: {}",
                path.display(),
                reason
            ),
            PlanError::InferenceExhausted {
                failure: InferenceFailure::DockerOnly,
                ..
            } => "Error: The README only shows docker-based MCP server commands\n\n\
                Help: The server is launched inside the container, so a nested\n\
                docker command cannot be used. Set the command explicitly:\n\n\
                build:\n  command_override: [\"python\", \"-m\", \"my_server\"]"
                .to_string(),
            PlanError::InferenceExhausted {
                failure: InferenceFailure::NothingFound,
                ..
            } => "Error: Could not determine the MCP server start command\n\n\
                Help: No README mcpServers block, pyproject.toml script,\n\
                setup.py console_scripts entry or conventional server file\n\
                was found. Set the command explicitly:\n\n\
                build:\n  command_override: [\"python\", \"server.py\"]\n\n\
                Or opt in to the default guess with allow_guessed_command: true"
                .to_string(),
        }
    }
}
