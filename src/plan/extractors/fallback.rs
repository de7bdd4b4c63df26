//! Conventional server filenames
//!
//! The last-resort default names `server.py` whether or not it exists, so
//! a wrong guess only surfaces when the container starts. It is reported
//! as [`Extraction::Guessed`] and the resolver decides whether to accept it.

use super::{CommandExtractor, Extraction};
use crate::fs::FileSystem;
use crate::plan::{CommandSource, StartCommand};
use std::path::Path;
use tracing::{debug, info, warn};

const CONVENTIONAL_FILES: [&str; 3] = ["server.py", "main.py", "app.py"];
const PACKAGE_MAIN: &str = "__main__.py";
const NAME_KEYWORDS: [&str; 2] = ["mcp", "server"];
const GUESSED_COMMAND: [&str; 2] = ["python", "server.py"];

pub struct ConventionalFileExtractor;

impl CommandExtractor for ConventionalFileExtractor {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn source(&self) -> CommandSource {
        CommandSource::ConventionalFile
    }

    fn try_extract(&self, fs: &dyn FileSystem, root: &Path) -> Extraction {
        for filename in CONVENTIONAL_FILES {
            if fs.is_file(&root.join(filename)) {
                info!(file = filename, "Using conventional server file");
                return found(["python", filename]);
            }
        }

        if fs.is_file(&root.join(PACKAGE_MAIN)) {
            if let Some(package) = root.file_name().and_then(|n| n.to_str()) {
                info!(package = package, "Running source root as a package");
                return found(["python", "-m", package]);
            }
        }

        match keyword_file(fs, root) {
            Some(file) => {
                info!(file = %file, "Using Python file named after the server");
                found(["python".to_string(), file])
            }
            None => {
                warn!(
                    "No server entry point found, defaulting to '{}'",
                    GUESSED_COMMAND.join(" ")
                );
                StartCommand::new(GUESSED_COMMAND)
                    .map(Extraction::Guessed)
                    .unwrap_or(Extraction::NotFound)
            }
        }
    }
}

fn found<I, S>(tokens: I) -> Extraction
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    StartCommand::new(tokens)
        .map(Extraction::Found)
        .unwrap_or(Extraction::NotFound)
}

/// First top-level `.py` file, by name, mentioning a keyword
fn keyword_file(fs: &dyn FileSystem, root: &Path) -> Option<String> {
    let entries = match fs.read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", root.display(), e);
            return None;
        }
    };

    entries
        .iter()
        .filter(|entry| entry.is_file())
        .map(|entry| entry.file_name())
        .find(|name| {
            let lower = name.to_lowercase();
            lower.ends_with(".py") && NAME_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(str::to_string)
}
