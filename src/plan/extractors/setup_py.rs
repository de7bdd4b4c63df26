//! `console_scripts` in a legacy `setup.py`, matched textually

use super::{CommandExtractor, Extraction};
use crate::fs::FileSystem;
use crate::plan::descriptor::DependencyDescriptor;
use crate::plan::{CommandSource, StartCommand};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

fn scripts_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)["']?console_scripts["']?\s*[:=]\s*\[(.*?)\]"#).expect("valid regex")
    })
}

fn script_entry() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"["']([^"'=]+)="#).expect("valid regex"))
}

pub struct LegacySetupExtractor;

impl CommandExtractor for LegacySetupExtractor {
    fn name(&self) -> &'static str {
        "setup_py"
    }

    fn source(&self) -> CommandSource {
        CommandSource::LegacySetupScript
    }

    fn applies(&self, descriptor: Option<DependencyDescriptor>) -> bool {
        descriptor == Some(DependencyDescriptor::LegacySetup)
    }

    fn try_extract(&self, fs: &dyn FileSystem, root: &Path) -> Extraction {
        let path = root.join(DependencyDescriptor::LegacySetup.filename());
        let content = match fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read setup.py: {}", e);
                return Extraction::NotFound;
            }
        };

        match first_console_script(&content) {
            Some(script) => {
                info!(script = %script, "Using setup.py console_scripts entry");
                StartCommand::new([script])
                    .map(Extraction::Found)
                    .unwrap_or(Extraction::NotFound)
            }
            None => Extraction::NotFound,
        }
    }
}

pub(crate) fn first_console_script(content: &str) -> Option<String> {
    let block = scripts_block().captures(content)?;
    let entry = script_entry().captures(&block[1])?;
    let name = entry[1].trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_dict_form() {
        let content = r#"
from setuptools import setup

setup(
    name="legacy-server",
    entry_points={
        "console_scripts": [
            "legacy-server=legacy.server:main",
            "legacy-admin = legacy.admin:main",
        ],
    },
)
"#;
        assert_eq!(first_console_script(content).as_deref(), Some("legacy-server"));
    }

    #[test]
    fn test_spaced_entry_is_trimmed() {
        let content = r#"entry_points={'console_scripts': ['setup-server = pkg.main:run']}"#;
        assert_eq!(first_console_script(content).as_deref(), Some("setup-server"));
    }

    #[test]
    fn test_keyword_form() {
        let content = r#"setup(entry_points=dict(console_scripts=["srv=pkg:main"]))"#;
        assert_eq!(first_console_script(content).as_deref(), Some("srv"));
    }

    #[test]
    fn test_missing_block() {
        assert!(first_console_script("setup(name='x', packages=['x'])").is_none());
        assert!(first_console_script("console_scripts = []").is_none());
    }

    #[test]
    fn test_extract_from_tree() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "setup.py",
            "setup(entry_points={'console_scripts': ['my-srv = srv:main']})",
        );
        let result = LegacySetupExtractor.try_extract(&fs, fs.root());
        assert_eq!(result, Extraction::Found(StartCommand::new(["my-srv"]).unwrap()));
    }
}
