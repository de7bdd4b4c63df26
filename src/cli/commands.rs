use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ship stdio MCP servers as HTTP containers on ECS
#[derive(Parser, Debug)]
#[command(
    name = "mcpship",
    about = "Build stdio MCP servers into HTTP container images and deploy them to ECS",
    version,
    long_about = "mcpship fetches an MCP server repository, infers how to start it, wraps it \
                  behind an HTTP proxy in a container image, pushes the image to ECR and \
                  optionally deploys it behind a load balancer with CloudFormation."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build, push and optionally deploy from a configuration file",
        long_about = "Runs the full pipeline described by a YAML configuration file.\n\n\
                      Examples:\n  \
                      mcpship run --config weather.yaml\n  \
                      mcpship run -c weather.yaml --format json"
    )]
    Run(RunArgs),

    #[command(
        about = "Resolve the build plan for a local server tree",
        long_about = "Inspects a local directory and prints how it would be packaged: \
                      package manager, start command and container entrypoint.\n\n\
                      Examples:\n  \
                      mcpship plan\n  \
                      mcpship plan ./weather-server --format dockerfile\n  \
                      mcpship plan . --command \"python -m weather\" --env API_KEY=xyz"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Print the image tag a build of a repository would get",
        long_about = "Examples:\n  \
                      mcpship tag https://github.com/acme/weather-mcp\n  \
                      mcpship tag https://github.com/acme/weather-mcp --branch develop"
    )]
    Tag(TagArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(short = 'c', long, value_name = "FILE", help = "YAML configuration file path")]
    pub config: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the server tree (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        long,
        value_name = "COMMAND",
        help = "Start command override, whitespace-separated"
    )]
    pub command: Option<String>,

    #[arg(
        short = 'e',
        long = "env",
        value_name = "KEY=VALUE",
        value_parser = parse_env_pair,
        help = "Environment variable baked into the image (repeatable)"
    )]
    pub env: Vec<(String, String)>,

    #[arg(long, help = "Accept 'python server.py' when nothing else is found")]
    pub allow_guess: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct TagArgs {
    #[arg(value_name = "REPO_URL", help = "GitHub repository URL")]
    pub repository_url: String,

    #[arg(short = 'b', long, help = "Branch name (defaults to main)")]
    pub branch: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid environment variable '{}': expected KEY=VALUE", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_run_requires_config() {
        assert!(CliArgs::try_parse_from(["mcpship", "run"]).is_err());

        let args = CliArgs::parse_from(["mcpship", "run", "-c", "weather.yaml"]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.config, PathBuf::from("weather.yaml"));
                assert_eq!(run.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_default_plan_args() {
        let args = CliArgs::parse_from(["mcpship", "plan"]);
        match args.command {
            Commands::Plan(plan) => {
                assert!(plan.path.is_none());
                assert!(plan.command.is_none());
                assert!(plan.env.is_empty());
                assert!(!plan.allow_guess);
                assert_eq!(plan.format, OutputFormatArg::Human);
                assert!(plan.output.is_none());
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_plan_with_options() {
        let args = CliArgs::parse_from([
            "mcpship",
            "plan",
            "/tmp/server",
            "--command",
            "python -m weather",
            "--env",
            "API_KEY=a=b",
            "-e",
            "MODE=prod",
            "--allow-guess",
            "--format",
            "dockerfile",
        ]);
        match args.command {
            Commands::Plan(plan) => {
                assert_eq!(plan.path, Some(PathBuf::from("/tmp/server")));
                assert_eq!(plan.command.as_deref(), Some("python -m weather"));
                assert_eq!(
                    plan.env,
                    vec![
                        ("API_KEY".to_string(), "a=b".to_string()),
                        ("MODE".to_string(), "prod".to_string())
                    ]
                );
                assert!(plan.allow_guess);
                assert_eq!(plan.format, OutputFormatArg::Dockerfile);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_invalid_env_pair() {
        assert!(CliArgs::try_parse_from(["mcpship", "plan", "--env", "NOEQUALS"]).is_err());
        assert!(CliArgs::try_parse_from(["mcpship", "plan", "--env", "=value"]).is_err());
    }

    #[test]
    fn test_tag_args() {
        let args = CliArgs::parse_from([
            "mcpship",
            "tag",
            "https://github.com/acme/weather",
            "--branch",
            "develop",
        ]);
        match args.command {
            Commands::Tag(tag) => {
                assert_eq!(tag.repository_url, "https://github.com/acme/weather");
                assert_eq!(tag.branch.as_deref(), Some("develop"));
            }
            _ => panic!("Expected Tag command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["mcpship", "plan", "-v"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["mcpship", "--log-level", "trace", "plan"]);
        assert_eq!(args.log_level.as_deref(), Some("trace"));

        assert!(CliArgs::try_parse_from(["mcpship", "plan", "-v", "-q"]).is_err());
    }
}
