//! YAML automation configuration
//!
//! A configuration file has an optional `build` section and an optional
//! `deploy` section:
//!
//! ```yaml
//! build:
//!   github_url: https://github.com/acme/weather-mcp
//!   subfolder: servers/weather
//!   push_to_ecr: true
//!   environment_variables:
//!     LOG_LEVEL: info
//! deploy:
//!   enabled: true
//!   service_name: weather
//!   cluster_name: mcp
//!   vpc_id: vpc-123
//!   alb_subnet_ids: subnet-a, subnet-b
//!   ecs_subnet_ids: [subnet-c]
//! ```
//!
//! # Region resolution
//! `aws_region` in either section, then `AWS_REGION`, then
//! `AWS_DEFAULT_REGION`, then `us-east-1`.

use crate::deploy::DeploymentTarget;
use crate::image::{derive_image_name, parse_image_uri};
use crate::plan::{ResolveOptions, StartCommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CPU: u32 = 256;
const DEFAULT_MEMORY: u32 = 512;
const MIN_ALB_SUBNETS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid image URI format: {0}")]
    InvalidImageUri(String),

    #[error("build.command_override must contain at least one token")]
    EmptyCommandOverride,

    #[error("Environment variable {0} must be a string, number or boolean")]
    InvalidEnvironmentValue(String),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn help_message(&self) -> String {
        match self {
            ConfigError::NotFound(path) => format!(
                "Error: Configuration file not found\nPath: {}\n\n\
                Help: Pass an existing YAML file with --config.",
                path.display()
            ),
            ConfigError::Parse(reason) => format!(
                "Error: Configuration file is not valid YAML\n\n\
                Help: Check indentation and that build.github_url is set.\n\n\
                Details: {}",
                reason
            ),
            ConfigError::InvalidImageUri(uri) => format!(
                "Error: Invalid image URI '{}'\n\n\
                Help: Use the form <registry>/<repository>/<image>:<tag>.",
                uri
            ),
            other => format!("Error: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationConfig {
    pub build: Option<BuildConfig>,
    pub deploy: Option<DeployConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    pub github_url: String,
    pub image_name: String,
    /// Registry path images are pushed under; resolved from the account when absent
    pub repository_base: Option<String>,
    pub subfolder: Option<String>,
    pub branch: Option<String>,
    pub aws_region: String,
    pub dockerfile_path: Option<PathBuf>,
    pub push_to_ecr: bool,
    pub command_override: Option<StartCommand>,
    pub environment_variables: BTreeMap<String, String>,
    pub allow_guessed_command: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployConfig {
    pub enabled: bool,
    pub service_name: Option<String>,
    pub cluster_name: Option<String>,
    pub vpc_id: Option<String>,
    pub alb_subnet_ids: Vec<String>,
    pub ecs_subnet_ids: Vec<String>,
    pub aws_region: String,
    pub port: u16,
    pub cpu: u32,
    pub memory: u32,
    pub certificate_arn: Option<String>,
    pub save_config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    build: Option<RawBuild>,
    deploy: Option<RawDeploy>,
}

#[derive(Debug, Deserialize)]
struct RawBuild {
    github_url: String,
    image_name: Option<String>,
    image_uri: Option<String>,
    ecr_repository: Option<String>,
    subfolder: Option<String>,
    branch: Option<String>,
    aws_region: Option<String>,
    dockerfile_path: Option<PathBuf>,
    #[serde(default)]
    push_to_ecr: bool,
    command_override: Option<Vec<String>>,
    #[serde(default)]
    environment_variables: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    allow_guessed_command: bool,
}

#[derive(Debug, Deserialize)]
struct RawDeploy {
    #[serde(default)]
    enabled: bool,
    service_name: Option<String>,
    cluster_name: Option<String>,
    vpc_id: Option<String>,
    alb_subnet_ids: Option<SubnetList>,
    ecs_subnet_ids: Option<SubnetList>,
    subnet_ids: Option<SubnetList>,
    aws_region: Option<String>,
    port: Option<u16>,
    cpu: Option<u32>,
    memory: Option<u32>,
    certificate_arn: Option<String>,
    save_config: Option<PathBuf>,
}

/// YAML list or comma-separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubnetList {
    List(Vec<String>),
    Csv(String),
}

impl SubnetList {
    fn into_vec(self) -> Vec<String> {
        let items: Vec<String> = match self {
            SubnetList::List(items) => items,
            SubnetList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// `AWS_REGION`, then `AWS_DEFAULT_REGION`, then `us-east-1`
pub fn default_region() -> String {
    ["AWS_REGION", "AWS_DEFAULT_REGION"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn env_value(key: &str, value: serde_yaml::Value) -> Result<String, ConfigError> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ConfigError::InvalidEnvironmentValue(key.to_string())),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BuildConfig {
    fn from_raw(raw: RawBuild) -> Result<Self, ConfigError> {
        let subfolder = non_blank(raw.subfolder);

        let (image_name, repository_base) = match non_blank(raw.image_uri) {
            Some(uri) => {
                let (name, base) = parse_image_uri(&uri)
                    .map_err(|_| ConfigError::InvalidImageUri(uri.clone()))?;
                (name, Some(base))
            }
            None => {
                let name = non_blank(raw.image_name).unwrap_or_else(|| {
                    derive_image_name(&raw.github_url, subfolder.as_deref())
                });
                (name, non_blank(raw.ecr_repository))
            }
        };

        let command_override = match raw.command_override {
            Some(tokens) => Some(StartCommand::new(tokens).ok_or(ConfigError::EmptyCommandOverride)?),
            None => None,
        };

        let environment_variables = raw
            .environment_variables
            .into_iter()
            .map(|(key, value)| env_value(&key, value).map(|v| (key, v)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            github_url: raw.github_url.trim().to_string(),
            image_name,
            repository_base,
            subfolder,
            branch: non_blank(raw.branch),
            aws_region: non_blank(raw.aws_region).unwrap_or_else(default_region),
            dockerfile_path: raw.dockerfile_path,
            push_to_ecr: raw.push_to_ecr,
            command_override,
            environment_variables,
            allow_guessed_command: raw.allow_guessed_command,
        })
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            command_override: self.command_override.clone(),
            environment: self.environment_variables.clone(),
            allow_guessed_command: self.allow_guessed_command,
        }
    }
}

impl DeployConfig {
    fn from_raw(raw: RawDeploy) -> Self {
        let legacy = raw.subnet_ids.map(SubnetList::into_vec).unwrap_or_default();
        let or_legacy = |list: Option<SubnetList>| {
            let list = list.map(SubnetList::into_vec).unwrap_or_default();
            if list.is_empty() {
                legacy.clone()
            } else {
                list
            }
        };

        Self {
            enabled: raw.enabled,
            service_name: non_blank(raw.service_name),
            cluster_name: non_blank(raw.cluster_name),
            vpc_id: non_blank(raw.vpc_id),
            alb_subnet_ids: or_legacy(raw.alb_subnet_ids),
            ecs_subnet_ids: or_legacy(raw.ecs_subnet_ids),
            aws_region: non_blank(raw.aws_region).unwrap_or_else(default_region),
            port: raw.port.unwrap_or(DEFAULT_PORT),
            cpu: raw.cpu.unwrap_or(DEFAULT_CPU),
            memory: raw.memory.unwrap_or(DEFAULT_MEMORY),
            certificate_arn: non_blank(raw.certificate_arn),
            save_config: raw.save_config,
        }
    }

    /// `None` unless deployment is enabled and every required field is present
    pub fn target(&self) -> Option<DeploymentTarget> {
        if !self.enabled {
            return None;
        }
        Some(DeploymentTarget {
            service_name: self.service_name.clone()?,
            cluster_name: self.cluster_name.clone()?,
            vpc_id: self.vpc_id.clone()?,
            alb_subnet_ids: self.alb_subnet_ids.clone(),
            ecs_subnet_ids: self.ecs_subnet_ids.clone(),
            certificate_arn: self.certificate_arn.clone(),
            port: self.port,
            cpu: self.cpu,
            memory: self.memory,
        })
    }
}

impl AutomationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(Self {
            build: raw.build.map(BuildConfig::from_raw).transpose()?,
            deploy: raw.deploy.map(DeployConfig::from_raw),
        })
    }

    /// Deployment section, only when enabled
    pub fn active_deploy(&self) -> Option<&DeployConfig> {
        self.deploy.as_ref().filter(|d| d.enabled)
    }

    /// Checks run before any side effect, in the order users see them
    pub fn validate(&self) -> Result<(), ConfigError> {
        let build = self.build.as_ref().ok_or_else(|| {
            ConfigError::Invalid("No 'build' section found in configuration file".to_string())
        })?;

        if let Some(deploy) = self.active_deploy() {
            if !build.push_to_ecr {
                return Err(ConfigError::Invalid(
                    "deploy.enabled requires build.push_to_ecr to be true".to_string(),
                ));
            }
            if deploy.service_name.is_none() || deploy.cluster_name.is_none() || deploy.vpc_id.is_none() {
                return Err(ConfigError::Invalid(
                    "deploy.enabled requires service_name, cluster_name, and vpc_id".to_string(),
                ));
            }
            if deploy.alb_subnet_ids.is_empty() || deploy.ecs_subnet_ids.is_empty() {
                return Err(ConfigError::Invalid(
                    "deploy.enabled requires both alb_subnet_ids and ecs_subnet_ids".to_string(),
                ));
            }
            if deploy.alb_subnet_ids.len() < MIN_ALB_SUBNETS {
                return Err(ConfigError::Invalid(
                    "deploy.enabled requires at least 2 ALB subnet IDs for load balancer".to_string(),
                ));
            }
        }

        if build.github_url.is_empty() {
            return Err(ConfigError::Invalid("build.github_url is required".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
build:
  github_url: https://github.com/acme/tools.git
  subfolder: servers/weather
  push_to_ecr: true
  aws_region: eu-west-1
  command_override: ["python", "-m", "weather"]
  environment_variables:
    LOG_LEVEL: debug
    WORKERS: 4
    VERBOSE: true
deploy:
  enabled: true
  service_name: weather
  cluster_name: mcp
  vpc_id: vpc-123
  alb_subnet_ids: "subnet-1, subnet-2"
  ecs_subnet_ids: [subnet-3]
  aws_region: eu-west-1
  save_config: out/weather.md
"#;

    #[test]
    fn test_full_config() {
        let config = AutomationConfig::from_yaml(FULL).unwrap();
        config.validate().unwrap();

        let build = config.build.as_ref().unwrap();
        assert_eq!(build.image_name, "tools-servers-weather");
        assert_eq!(build.repository_base, None);
        assert_eq!(build.aws_region, "eu-west-1");
        assert_eq!(
            build.command_override.as_ref().unwrap().tokens(),
            &["python", "-m", "weather"]
        );
        assert_eq!(build.environment_variables["WORKERS"], "4");
        assert_eq!(build.environment_variables["VERBOSE"], "true");

        let deploy = config.active_deploy().unwrap();
        assert_eq!(deploy.alb_subnet_ids, vec!["subnet-1", "subnet-2"]);
        assert_eq!(deploy.ecs_subnet_ids, vec!["subnet-3"]);
        assert_eq!(deploy.port, 8000);
        assert_eq!(deploy.cpu, 256);
        assert_eq!(deploy.memory, 512);
        assert_eq!(deploy.save_config.as_deref(), Some(Path::new("out/weather.md")));

        let target = deploy.target().unwrap();
        assert_eq!(target.service_name, "weather");
        assert_eq!(target.certificate_arn, None);
    }

    #[test]
    fn test_image_uri_sets_name_and_registry() {
        let yaml = r#"
build:
  github_url: https://github.com/acme/weather
  image_uri: 123456789012.dkr.ecr.us-west-2.amazonaws.com/mcp-servers/custom:v1
  aws_region: us-west-2
"#;
        let build = AutomationConfig::from_yaml(yaml).unwrap().build.unwrap();
        assert_eq!(build.image_name, "custom");
        assert_eq!(
            build.repository_base.as_deref(),
            Some("123456789012.dkr.ecr.us-west-2.amazonaws.com/mcp-servers")
        );
    }

    #[test]
    fn test_invalid_image_uri() {
        let yaml = "build:\n  github_url: https://github.com/acme/weather\n  image_uri: invalid-uri\n  aws_region: us-east-1\n";
        let err = AutomationConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidImageUri(_)));
    }

    #[test]
    fn test_legacy_subnets_fill_both_lists() {
        let yaml = r#"
deploy:
  enabled: false
  subnet_ids: [subnet-1, subnet-2, subnet-3]
  aws_region: us-east-1
"#;
        let deploy = AutomationConfig::from_yaml(yaml).unwrap().deploy.unwrap();
        assert_eq!(deploy.alb_subnet_ids, vec!["subnet-1", "subnet-2", "subnet-3"]);
        assert_eq!(deploy.ecs_subnet_ids, deploy.alb_subnet_ids);
    }

    #[test]
    fn test_specific_subnets_win_over_legacy() {
        let yaml = r#"
deploy:
  alb_subnet_ids: subnet-a,subnet-b
  subnet_ids: subnet-x
  aws_region: us-east-1
"#;
        let deploy = AutomationConfig::from_yaml(yaml).unwrap().deploy.unwrap();
        assert_eq!(deploy.alb_subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(deploy.ecs_subnet_ids, vec!["subnet-x"]);
    }

    #[test]
    fn test_empty_command_override_rejected() {
        let yaml = "build:\n  github_url: https://github.com/acme/weather\n  command_override: []\n  aws_region: us-east-1\n";
        assert!(matches!(
            AutomationConfig::from_yaml(yaml).unwrap_err(),
            ConfigError::EmptyCommandOverride
        ));
    }

    #[test]
    fn test_nested_env_value_rejected() {
        let yaml = "build:\n  github_url: https://github.com/acme/weather\n  aws_region: us-east-1\n  environment_variables:\n    NESTED: {a: 1}\n";
        assert!(matches!(
            AutomationConfig::from_yaml(yaml).unwrap_err(),
            ConfigError::InvalidEnvironmentValue(key) if key == "NESTED"
        ));
    }

    #[test]
    fn test_validate_requires_build_section() {
        let config = AutomationConfig { build: None, deploy: None };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "No 'build' section found in configuration file");
    }

    fn deploy_yaml(push: bool, deploy_body: &str) -> String {
        format!(
            "build:\n  github_url: https://github.com/acme/weather\n  aws_region: us-east-1\n  push_to_ecr: {}\ndeploy:\n  enabled: true\n  aws_region: us-east-1\n{}",
            push, deploy_body
        )
    }

    #[test]
    fn test_validate_deploy_requires_push() {
        let config = AutomationConfig::from_yaml(&deploy_yaml(false, "")).unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deploy.enabled requires build.push_to_ecr to be true"
        );
    }

    #[test]
    fn test_validate_deploy_requires_identity() {
        let config =
            AutomationConfig::from_yaml(&deploy_yaml(true, "  service_name: weather\n")).unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deploy.enabled requires service_name, cluster_name, and vpc_id"
        );
    }

    #[test]
    fn test_validate_deploy_requires_two_alb_subnets() {
        let body = "  service_name: s\n  cluster_name: c\n  vpc_id: v\n  alb_subnet_ids: [subnet-1]\n  ecs_subnet_ids: [subnet-2]\n";
        let config = AutomationConfig::from_yaml(&deploy_yaml(true, body)).unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deploy.enabled requires at least 2 ALB subnet IDs for load balancer"
        );
    }

    #[test]
    fn test_validate_deploy_requires_both_subnet_lists() {
        let body = "  service_name: s\n  cluster_name: c\n  vpc_id: v\n  alb_subnet_ids: [subnet-1, subnet-2]\n";
        let config = AutomationConfig::from_yaml(&deploy_yaml(true, body)).unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "deploy.enabled requires both alb_subnet_ids and ecs_subnet_ids"
        );
    }

    #[test]
    fn test_disabled_deploy_is_not_validated() {
        let yaml = "build:\n  github_url: https://github.com/acme/weather\n  aws_region: us-east-1\ndeploy:\n  enabled: false\n  aws_region: us-east-1\n";
        let config = AutomationConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert!(config.active_deploy().is_none());
        assert!(config.deploy.unwrap().target().is_none());
    }

    #[test]
    #[serial]
    fn test_region_from_environment() {
        env::set_var("AWS_REGION", "ap-southeast-2");
        env::remove_var("AWS_DEFAULT_REGION");
        let yaml = "build:\n  github_url: https://github.com/acme/weather\n";
        let build = AutomationConfig::from_yaml(yaml).unwrap().build.unwrap();
        env::remove_var("AWS_REGION");
        assert_eq!(build.aws_region, "ap-southeast-2");
    }

    #[test]
    #[serial]
    fn test_region_defaults_to_us_east_1() {
        env::remove_var("AWS_REGION");
        env::remove_var("AWS_DEFAULT_REGION");
        assert_eq!(default_region(), "us-east-1");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AutomationConfig::load(Path::new("/nonexistent/mcpship.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.help_message().contains("--config"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = AutomationConfig::load(file.path()).unwrap();
        assert!(config.build.is_some());
    }
}
