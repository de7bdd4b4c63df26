//! Subcommand handlers
//!
//! Each handler returns the process exit code and prints the error's help
//! text to stderr on failure. Results go to stdout.

use super::commands::{PlanArgs, RunArgs, TagArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::AutomationConfig;
use crate::deploy::CloudFormationBackend;
use crate::fs::RealFileSystem;
use crate::image::{DockerImageBuilder, EcrRegistry, GitHubCommitLookup, TagDeriver};
use crate::pipeline::{Pipeline, PipelineError};
use crate::plan::{BuildPlanResolver, ResolveOptions, StartCommand};
use crate::source::GitHubArchiveFetcher;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn handle_run(args: &RunArgs) -> i32 {
    match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("{}", e.help_message());
            1
        }
    }
}

async fn run(args: &RunArgs) -> Result<(), PipelineError> {
    let config = AutomationConfig::load(&args.config)?;
    config.validate()?;

    let build = config
        .build
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No 'build' section found in configuration file"))?;

    let builder = DockerImageBuilder::connect().await?;
    let mut pipeline = Pipeline::new(
        Arc::new(GitHubArchiveFetcher::new()),
        Arc::new(GitHubCommitLookup::new()),
        Arc::new(builder),
    );

    if build.push_to_ecr {
        debug!(region = %build.aws_region, "Using ECR registry");
        pipeline = pipeline.with_registry(Arc::new(EcrRegistry::from_env(&build.aws_region).await));
    }
    if let Some(deploy) = config.active_deploy() {
        debug!(region = %deploy.aws_region, "Using CloudFormation");
        pipeline = pipeline
            .with_stack_backend(Arc::new(CloudFormationBackend::from_env(&deploy.aws_region).await));
    }

    let outcome = pipeline.run(&config).await?;
    let formatter = OutputFormatter::new(args.format.into());
    let rendered = formatter.format_outcome(&outcome)?;
    println!("{}", rendered);
    Ok(())
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    match plan(args) {
        Ok(()) => 0,
        Err(e) => {
            error!("Plan failed: {:#}", e);
            let help = e
                .downcast_ref::<crate::plan::PlanError>()
                .map(|pe| pe.help_message())
                .unwrap_or_else(|| format!("Error: {:#}", e));
            eprintln!("{}", help);
            1
        }
    }
}

fn plan(args: &PlanArgs) -> Result<()> {
    let root = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let options = plan_options(args)?;

    info!("Resolving build plan for {}", root.display());
    let resolver = BuildPlanResolver::new(RealFileSystem::new());
    let plan = resolver.resolve(&root, &options)?;

    let format: OutputFormat = args.format.into();
    let rendered = OutputFormatter::new(format).format_plan(&plan)?;
    write_output(&rendered, args.output.as_deref())
}

fn plan_options(args: &PlanArgs) -> Result<ResolveOptions> {
    let mut options = ResolveOptions::default().allow_guess(args.allow_guess);
    if let Some(command) = &args.command {
        let command = StartCommand::new(command.split_whitespace())
            .context("--command must contain at least one token")?;
        options = options.with_override(command);
    }
    for (key, value) in &args.env {
        options = options.with_env(key, value);
    }
    Ok(options)
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub async fn handle_tag(args: &TagArgs) -> i32 {
    let deriver = TagDeriver::new(Arc::new(GitHubCommitLookup::new()));
    let tag = deriver
        .derive(&args.repository_url, args.branch.as_deref())
        .await;
    println!("{}", tag);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormatArg;
    use tempfile::TempDir;

    fn plan_args(path: &Path) -> PlanArgs {
        PlanArgs {
            path: Some(path.to_path_buf()),
            command: None,
            env: Vec::new(),
            allow_guess: false,
            format: OutputFormatArg::Json,
            output: None,
        }
    }

    #[test]
    fn test_plan_options_from_args() {
        let dir = TempDir::new().unwrap();
        let mut args = plan_args(dir.path());
        args.command = Some("python  -m weather".to_string());
        args.env = vec![("MODE".to_string(), "prod".to_string())];
        args.allow_guess = true;

        let options = plan_options(&args).unwrap();
        assert_eq!(
            options.command_override.unwrap().tokens(),
            &["python", "-m", "weather"]
        );
        assert_eq!(options.environment["MODE"], "prod");
        assert!(options.allow_guessed_command);
    }

    #[test]
    fn test_blank_command_rejected() {
        let dir = TempDir::new().unwrap();
        let mut args = plan_args(dir.path());
        args.command = Some("   ".to_string());
        assert!(plan_options(&args).is_err());
    }

    #[tokio::test]
    async fn test_plan_writes_output_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("server.py"), "print('hi')\n").unwrap();
        let out = dir.path().join("plan.json");

        let mut args = plan_args(dir.path());
        args.output = Some(out.clone());
        assert_eq!(handle_plan(&args).await, 0);

        let written = std::fs::read_to_string(out).unwrap();
        assert!(written.contains("server.py"));
    }

    #[tokio::test]
    async fn test_plan_empty_tree_fails() {
        let dir = TempDir::new().unwrap();
        assert_eq!(handle_plan(&plan_args(dir.path())).await, 1);
    }
}
