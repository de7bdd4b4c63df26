//! Ordered strategy evaluation producing a [`BuildPlan`]

use super::descriptor::detect_descriptor;
use super::entrypoint::synthesize_entrypoint;
use super::error::{InferenceFailure, PlanError};
use super::extractors::{default_chain, CommandExtractor, Extraction};
use super::{BuildPlan, CommandSource, StartCommand};
use crate::fs::FileSystem;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Caller-supplied inputs that shape resolution
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Skips every extractor when set
    pub command_override: Option<StartCommand>,
    pub environment: BTreeMap<String, String>,
    /// Accept the fallback strategy's default when nothing else matched
    pub allow_guessed_command: bool,
}

impl ResolveOptions {
    pub fn with_override(mut self, command: StartCommand) -> Self {
        self.command_override = Some(command);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn allow_guess(mut self, allow: bool) -> Self {
        self.allow_guessed_command = allow;
        self
    }
}

pub struct BuildPlanResolver<F: FileSystem> {
    fs: F,
    chain: Vec<Box<dyn CommandExtractor>>,
}

impl<F: FileSystem> BuildPlanResolver<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            chain: default_chain(),
        }
    }

    /// Replaces the strategy chain; order is evaluation order
    pub fn with_chain(fs: F, chain: Vec<Box<dyn CommandExtractor>>) -> Self {
        Self { fs, chain }
    }

    pub fn resolve(&self, root: &Path, options: &ResolveOptions) -> Result<BuildPlan, PlanError> {
        if !self.fs.exists(root) {
            return Err(PlanError::SourceNotFound(root.to_path_buf()));
        }
        if !self.fs.is_dir(root) {
            return Err(PlanError::NotADirectory(root.to_path_buf()));
        }

        let detection = detect_descriptor(&self.fs, root)?;
        info!(
            package_manager = %detection.package_manager,
            descriptor = ?detection.descriptor(),
            "Classified dependencies"
        );

        let (start_command, command_source) = match &options.command_override {
            Some(command) => {
                info!(command = %command, "Using command override");
                (command.clone(), CommandSource::Override)
            }
            None => self.infer_command(root, detection.descriptor(), options)?,
        };

        let entrypoint_command = synthesize_entrypoint(Some(&start_command));
        debug!(entrypoint = %entrypoint_command, "Synthesized entrypoint");

        Ok(BuildPlan {
            package_manager: detection.package_manager,
            dependency_artifact: detection.artifact,
            start_command,
            command_source,
            environment_variables: options.environment.clone(),
            entrypoint_command,
        })
    }

    fn infer_command(
        &self,
        root: &Path,
        descriptor: Option<super::DependencyDescriptor>,
        options: &ResolveOptions,
    ) -> Result<(StartCommand, CommandSource), PlanError> {
        let fs: &dyn FileSystem = &self.fs;
        let mut docker_seen = false;
        let mut guess: Option<StartCommand> = None;

        for extractor in self.chain.iter().filter(|e| e.applies(descriptor)) {
            match extractor.try_extract(fs, root) {
                Extraction::Found(command) => {
                    info!(
                        strategy = extractor.name(),
                        command = %command,
                        "Resolved start command"
                    );
                    return Ok((command, extractor.source()));
                }
                Extraction::Guessed(command) => {
                    debug!(strategy = extractor.name(), command = %command, "Strategy guessed");
                    if guess.is_none() {
                        guess = Some(command);
                    }
                }
                Extraction::DockerOnly => {
                    debug!(strategy = extractor.name(), "Only docker commands seen");
                    docker_seen = true;
                }
                Extraction::NotFound => {
                    debug!(strategy = extractor.name(), "No command found");
                }
            }
        }

        let failure = if docker_seen {
            InferenceFailure::DockerOnly
        } else {
            match guess {
                Some(command) if options.allow_guessed_command => {
                    warn!(command = %command, "Deploying with a guessed start command");
                    return Ok((command, CommandSource::Guessed));
                }
                _ => InferenceFailure::NothingFound,
            }
        };

        Err(PlanError::InferenceExhausted {
            root: root.to_path_buf(),
            failure,
        })
    }
}
