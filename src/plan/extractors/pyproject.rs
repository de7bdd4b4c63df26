//! Script declarations in `pyproject.toml`

use super::{CommandExtractor, Extraction};
use crate::fs::FileSystem;
use crate::plan::descriptor::DependencyDescriptor;
use crate::plan::{CommandSource, StartCommand};
use std::path::Path;
use toml::Value;
use tracing::{debug, info};

/// Tables searched for a script name, first non-empty one wins
const SCRIPT_TABLES: [&[&str]; 3] = [
    &["project", "scripts"],
    &["project", "entry-points", "console_scripts"],
    &["tool", "poetry", "scripts"],
];

pub struct ProjectScriptsExtractor;

impl CommandExtractor for ProjectScriptsExtractor {
    fn name(&self) -> &'static str {
        "pyproject"
    }

    fn source(&self) -> CommandSource {
        CommandSource::ProjectScripts
    }

    fn applies(&self, descriptor: Option<DependencyDescriptor>) -> bool {
        descriptor == Some(DependencyDescriptor::ProjectManifest)
    }

    fn try_extract(&self, fs: &dyn FileSystem, root: &Path) -> Extraction {
        let path = root.join(DependencyDescriptor::ProjectManifest.filename());
        let content = match fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read pyproject.toml: {}", e);
                return Extraction::NotFound;
            }
        };

        match first_script(&content) {
            Some(script) => {
                info!(script = %script, "Using pyproject.toml script");
                StartCommand::new([script])
                    .map(Extraction::Found)
                    .unwrap_or(Extraction::NotFound)
            }
            None => Extraction::NotFound,
        }
    }
}

/// First script key in document order, if any script table is present
pub(crate) fn first_script(content: &str) -> Option<String> {
    let parsed: Value = match toml::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            debug!("pyproject.toml does not parse: {}", e);
            return None;
        }
    };

    SCRIPT_TABLES.iter().find_map(|table_path| {
        let table = table_path
            .iter()
            .try_fold(&parsed, |value, key| value.get(*key))?
            .as_table()?;
        table
            .keys()
            .find(|k| !k.trim().is_empty())
            .map(|k| k.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_project_scripts_first_key() {
        let content = r#"
[project]
name = "weather"

[project.scripts]
zeta-server = "weather:main"
alpha-cli = "weather:cli"
"#;
        assert_eq!(first_script(content).as_deref(), Some("zeta-server"));
    }

    #[test]
    fn test_console_scripts_entry_points() {
        let content = r#"
[project]
name = "weather"

[project.entry-points.console_scripts]
weather-mcp = "weather.server:run"
"#;
        assert_eq!(first_script(content).as_deref(), Some("weather-mcp"));
    }

    #[test]
    fn test_poetry_scripts() {
        let content = r#"
[tool.poetry]
name = "srv"

[tool.poetry.scripts]
srv = "srv:main"
"#;
        assert_eq!(first_script(content).as_deref(), Some("srv"));
    }

    #[test]
    fn test_project_scripts_take_precedence() {
        let content = r#"
[project.entry-points.console_scripts]
second = "a:b"

[project.scripts]
first = "a:c"
"#;
        assert_eq!(first_script(content).as_deref(), Some("first"));
    }

    #[test]
    fn test_empty_scripts_table_falls_through() {
        let content = "[project.scripts]\n\n[project.entry-points.console_scripts]\nsrv = \"a:b\"\n";
        assert_eq!(first_script(content).as_deref(), Some("srv"));
    }

    #[test]
    fn test_no_scripts_or_invalid_toml() {
        assert!(first_script("[project]\nname = \"x\"\n").is_none());
        assert!(first_script("[project\nname = ").is_none());
    }

    #[test]
    fn test_applies_only_to_project_manifest() {
        assert!(ProjectScriptsExtractor.applies(Some(DependencyDescriptor::ProjectManifest)));
        assert!(!ProjectScriptsExtractor.applies(Some(DependencyDescriptor::Requirements)));
    }

    #[test]
    fn test_extract_from_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("pyproject.toml", "[project.scripts]\nfoo = \"pkg:main\"\n");

        let result = ProjectScriptsExtractor.try_extract(&fs, fs.root());
        assert_eq!(result, Extraction::Found(StartCommand::new(["foo"]).unwrap()));
    }
}
