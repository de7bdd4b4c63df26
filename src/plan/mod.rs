//! Build plan resolution
//!
//! Static inspection of a fetched source tree: which dependency descriptor
//! is present, which package manager installs it, and which command starts
//! the stdio server. Nothing in here executes code from the tree.
//!
//! # Example
//!
//! ```no_run
//! use mcpship::fs::RealFileSystem;
//! use mcpship::plan::{BuildPlanResolver, ResolveOptions};
//! use std::path::Path;
//!
//! let resolver = BuildPlanResolver::new(RealFileSystem::new());
//! let plan = resolver.resolve(Path::new("./weather-server"), &ResolveOptions::default())?;
//! println!("{}", plan.entrypoint_command);
//! # Ok::<(), mcpship::plan::PlanError>(())
//! ```

pub mod descriptor;
pub mod entrypoint;
pub mod error;
pub mod extractors;
pub mod resolver;

pub use descriptor::{
    detect_descriptor, DependencyArtifact, DependencyDescriptor, DescriptorDetection, PackageManager,
};
pub use entrypoint::synthesize_entrypoint;
pub use error::{InferenceFailure, PlanError};
pub use extractors::{CommandExtractor, Extraction};
pub use resolver::{BuildPlanResolver, ResolveOptions};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Non-empty command line: program followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StartCommand(Vec<String>);

impl StartCommand {
    /// Returns `None` for an empty token list
    pub fn new<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Self(tokens))
        }
    }

    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.0
    }
}

impl TryFrom<Vec<String>> for StartCommand {
    type Error = String;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        StartCommand::new(tokens).ok_or_else(|| "command must not be empty".to_string())
    }
}

impl From<StartCommand> for Vec<String> {
    fn from(command: StartCommand) -> Self {
        command.0
    }
}

impl fmt::Display for StartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Where the start command of a plan came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Override,
    Readme,
    ProjectScripts,
    LegacySetupScript,
    ConventionalFile,
    Guessed,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommandSource::Override => "manual override",
            CommandSource::Readme => "README server config",
            CommandSource::ProjectScripts => "pyproject.toml scripts",
            CommandSource::LegacySetupScript => "setup.py console_scripts",
            CommandSource::ConventionalFile => "conventional filename",
            CommandSource::Guessed => "last-resort default",
        };
        f.write_str(label)
    }
}

/// Resolved packaging facts and container entrypoint for one source tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub package_manager: PackageManager,
    pub dependency_artifact: Option<DependencyArtifact>,
    pub start_command: StartCommand,
    pub command_source: CommandSource,
    pub environment_variables: BTreeMap<String, String>,
    /// Always derived from `start_command` by the entrypoint synthesizer
    pub entrypoint_command: StartCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_command_rejects_empty() {
        assert!(StartCommand::new(Vec::<String>::new()).is_none());
        assert!(StartCommand::try_from(Vec::new()).is_err());
    }

    #[test]
    fn test_start_command_parts() {
        let cmd = StartCommand::new(["uvx", "weather-mcp", "--verbose"]).unwrap();
        assert_eq!(cmd.program(), "uvx");
        assert_eq!(cmd.args(), ["weather-mcp", "--verbose"]);
        assert_eq!(cmd.len(), 3);
        assert_eq!(cmd.to_string(), "uvx weather-mcp --verbose");
    }

    #[test]
    fn test_start_command_serde_is_plain_list() {
        let cmd = StartCommand::new(["python", "server.py"]).unwrap();
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"["python","server.py"]"#);

        let back: StartCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
        assert!(serde_json::from_str::<StartCommand>("[]").is_err());
    }

    #[test]
    fn test_command_source_serialization() {
        assert_eq!(
            serde_json::to_string(&CommandSource::LegacySetupScript).unwrap(),
            "\"legacy_setup_script\""
        );
    }
}
