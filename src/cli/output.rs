//! Output formatting for plans and pipeline results
//!
//! Structured formats serialize the same types the library returns; the
//! human format is a short summary meant for a terminal.

use anyhow::{bail, Context, Result};
use std::fmt::Write as _;

use crate::image::DockerfileRenderer;
use crate::pipeline::PipelineOutcome;
use crate::plan::BuildPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
    /// Rendered Dockerfile, plans only
    Dockerfile,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_plan(&self, plan: &BuildPlan) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialize build plan to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(plan).context("Failed to serialize build plan to YAML")
            }
            OutputFormat::Human => Ok(self.plan_human(plan)),
            OutputFormat::Dockerfile => Ok(DockerfileRenderer::new().render(plan)),
        }
    }

    pub fn format_outcome(&self, outcome: &PipelineOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome)
                .context("Failed to serialize pipeline result to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(outcome).context("Failed to serialize pipeline result to YAML")
            }
            OutputFormat::Human => Ok(self.outcome_human(outcome)),
            OutputFormat::Dockerfile => bail!("The dockerfile format is only available for plans"),
        }
    }

    fn plan_human(&self, plan: &BuildPlan) -> String {
        let mut out = String::new();
        let descriptor = plan
            .dependency_artifact
            .as_ref()
            .map(|a| a.file.display().to_string())
            .unwrap_or_else(|| "none".to_string());

        let _ = writeln!(out, "Package manager: {}", plan.package_manager.name());
        let _ = writeln!(out, "Dependencies:    {}", descriptor);
        let _ = writeln!(out, "Start command:   {}", plan.start_command);
        let _ = writeln!(out, "  from:          {}", plan.command_source);
        let _ = writeln!(out, "Entrypoint:      {}", plan.entrypoint_command);
        if !plan.environment_variables.is_empty() {
            let _ = writeln!(out, "Environment:");
            for (key, value) in &plan.environment_variables {
                let _ = writeln!(out, "  {}={}", key, value);
            }
        }
        out
    }

    fn outcome_human(&self, outcome: &PipelineOutcome) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Image: {}", outcome.image);
        let _ = writeln!(out, "Start command: {} ({})", outcome.plan.start_command, outcome.plan.command_source);

        match &outcome.deployment {
            Some(deployment) => {
                let _ = writeln!(out, "\nMCP Client Configuration:");
                let _ = writeln!(out, "{}", deployment.setup_instructions);
                let _ = writeln!(out, "Deployment successful! ALB URL: {}", deployment.stack.endpoint);
            }
            None => {
                let _ = writeln!(
                    out,
                    "Build completed successfully! (Deployment skipped - deploy.enabled is false)"
                );
            }
        }
        out
    }
}
