//! `mcpServers` blocks embedded in README files

use super::{CommandExtractor, Extraction};
use crate::fs::FileSystem;
use crate::plan::{CommandSource, StartCommand};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Checked in this order; every existing file is scanned
pub const README_FILES: [&str; 5] = [
    "README.md",
    "README.txt",
    "README.rst",
    "readme.md",
    "readme.txt",
];

const CONTAINER_RUNTIME: &str = "docker";

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)```(?:json)?[^\n]*\n(.*?)```").expect("valid regex")
    })
}

pub struct ReadmeExtractor;

impl CommandExtractor for ReadmeExtractor {
    fn name(&self) -> &'static str {
        "readme"
    }

    fn source(&self) -> CommandSource {
        CommandSource::Readme
    }

    fn try_extract(&self, fs: &dyn FileSystem, root: &Path) -> Extraction {
        let mut docker_seen = false;

        for filename in README_FILES {
            let path = root.join(filename);
            if !fs.is_file(&path) {
                continue;
            }
            let content = match fs.read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable {}: {}", filename, e);
                    continue;
                }
            };

            match scan_readme(&content) {
                Extraction::Found(cmd) => {
                    info!(readme = filename, command = %cmd, "Found MCP server command in README");
                    return Extraction::Found(cmd);
                }
                Extraction::DockerOnly => docker_seen = true,
                Extraction::Guessed(_) | Extraction::NotFound => {}
            }
        }

        if docker_seen {
            debug!("README commands all use docker");
            Extraction::DockerOnly
        } else {
            Extraction::NotFound
        }
    }
}

/// Scans one README body fence by fence, server by server
pub(crate) fn scan_readme(content: &str) -> Extraction {
    let mut docker_seen = false;

    for capture in block_pattern().captures_iter(content) {
        let block = capture[1].trim();
        if !block.starts_with('{') {
            continue;
        }
        let config: Value = match serde_json::from_str(block) {
            Ok(value) => value,
            Err(e) => {
                debug!("Ignoring fenced block that is not JSON: {}", e);
                continue;
            }
        };

        let Some(servers) = config.get("mcpServers").and_then(Value::as_object) else {
            continue;
        };

        for (name, descriptor) in servers {
            let Some(command) = server_command(descriptor) else {
                debug!(server = %name, "Server descriptor has no usable command");
                continue;
            };
            if command.program() == CONTAINER_RUNTIME {
                debug!(server = %name, "Skipping docker-based command");
                docker_seen = true;
                continue;
            }
            return Extraction::Found(command);
        }
    }

    if docker_seen {
        Extraction::DockerOnly
    } else {
        Extraction::NotFound
    }
}

fn server_command(descriptor: &Value) -> Option<StartCommand> {
    let program = descriptor.get("command")?.as_str()?.trim();
    if program.is_empty() {
        return None;
    }

    let mut tokens = vec![program.to_string()];
    match descriptor.get("args") {
        None | Some(Value::Null) => {}
        Some(Value::Array(args)) => {
            for arg in args {
                tokens.push(match arg {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                });
            }
        }
        Some(_) => return None,
    }

    StartCommand::new(tokens)
}
