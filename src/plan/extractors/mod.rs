//! Start-command extraction strategies
//!
//! Each strategy inspects one kind of artifact and reports what it found.
//! The resolver evaluates them in the order of [`default_chain`] and stops
//! at the first [`Extraction::Found`].

mod fallback;
mod pyproject;
mod readme;
mod setup_py;

pub use fallback::ConventionalFileExtractor;
pub use pyproject::ProjectScriptsExtractor;
pub use readme::ReadmeExtractor;
pub use setup_py::LegacySetupExtractor;

use super::descriptor::DependencyDescriptor;
use super::{CommandSource, StartCommand};
use crate::fs::FileSystem;
use std::path::Path;

/// Result of a single strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A command backed by an artifact in the tree
    Found(StartCommand),
    /// A default that no artifact backs
    Guessed(StartCommand),
    /// Only commands launching the server through `docker` were seen
    DockerOnly,
    NotFound,
}

impl Extraction {
    pub fn command(&self) -> Option<&StartCommand> {
        match self {
            Extraction::Found(cmd) | Extraction::Guessed(cmd) => Some(cmd),
            Extraction::DockerOnly | Extraction::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }
}

pub trait CommandExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Provenance recorded on the plan when this strategy wins
    fn source(&self) -> CommandSource;

    /// Whether the strategy runs for the detected dependency descriptor
    fn applies(&self, _descriptor: Option<DependencyDescriptor>) -> bool {
        true
    }

    /// Never fails: unreadable or malformed artifacts are `NotFound`
    fn try_extract(&self, fs: &dyn FileSystem, root: &Path) -> Extraction;
}

/// README, then the descriptor's own scripts, then conventional files
pub fn default_chain() -> Vec<Box<dyn CommandExtractor>> {
    vec![
        Box::new(ReadmeExtractor),
        Box::new(ProjectScriptsExtractor),
        Box::new(LegacySetupExtractor),
        Box::new(ConventionalFileExtractor),
    ]
}
