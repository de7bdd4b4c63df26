//! mcpship - ship stdio MCP servers as HTTP services on ECS
//!
//! Takes a repository containing a Model Context Protocol server that speaks
//! over stdio, works out how to start it, wraps it behind `mcp-proxy` in a
//! container image, pushes the image to ECR and optionally deploys it behind
//! an application load balancer.
//!
//! # Example
//!
//! ```no_run
//! use mcpship::fs::RealFileSystem;
//! use mcpship::plan::{BuildPlanResolver, ResolveOptions};
//! use std::path::Path;
//!
//! let resolver = BuildPlanResolver::new(RealFileSystem::new());
//! let plan = resolver.resolve(Path::new("./server"), &ResolveOptions::default())?;
//! println!("{} ({})", plan.start_command, plan.command_source);
//! # Ok::<(), mcpship::plan::PlanError>(())
//! ```
//!
//! # Project Structure
//!
//! - [`plan`]: command extraction, descriptor detection and entrypoint synthesis
//! - [`source`]: repository archive download and extraction
//! - [`image`]: tags, Dockerfile rendering, image build and registry push
//! - [`deploy`]: stack template rendering and reconciliation
//! - [`pipeline`]: the end-to-end run driven by [`config`]

pub mod cli;
pub mod config;
pub mod deploy;
pub mod fs;
pub mod image;
pub mod pipeline;
pub mod plan;
pub mod source;
pub mod util;

pub use config::{AutomationConfig, BuildConfig, ConfigError, DeployConfig};
pub use pipeline::{DeploymentOutcome, Pipeline, PipelineError, PipelineOutcome};
pub use plan::{BuildPlan, BuildPlanResolver, PlanError, ResolveOptions, StartCommand};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_mcpship() {
        assert_eq!(NAME, "mcpship");
    }
}
