//! Embedded ECS/ALB CloudFormation template
//!
//! Placeholders are `{{ name }}`; CloudFormation's own `{{resolve:...}}`
//! references do not match the placeholder syntax and pass through.

use super::stack::DeploymentTarget;
use crate::image::ImageCoordinate;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const ECS_SERVICE_TEMPLATE: &str = include_str!("../../templates/ecs-service.yaml");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template placeholder '{{{{ {0} }}}}' has no value")]
    UnknownPlaceholder(String),
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
    })
}

/// Substitutes every placeholder; any name missing from `values` is an error
pub fn render(template: &str, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
    if let Some(missing) = placeholder()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .find(|name| !values.contains_key(name.as_str()))
    {
        return Err(TemplateError::UnknownPlaceholder(missing));
    }

    Ok(placeholder()
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

pub fn service_values(target: &DeploymentTarget, image: &ImageCoordinate) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("service_name", target.service_name.clone()),
        ("cluster_name", target.cluster_name.clone()),
        ("image_uri", image.reference()),
        ("port", target.port.to_string()),
        ("cpu", target.cpu.to_string()),
        ("memory", target.memory.to_string()),
    ])
}

/// Renders the embedded ECS service template for one deployment
pub fn render_service_template(
    target: &DeploymentTarget,
    image: &ImageCoordinate,
) -> Result<String, TemplateError> {
    render(ECS_SERVICE_TEMPLATE, &service_values(target, image))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DeploymentTarget {
        DeploymentTarget {
            service_name: "weather".into(),
            cluster_name: "mcp-cluster".into(),
            vpc_id: "vpc-1".into(),
            alb_subnet_ids: vec!["a".into(), "b".into()],
            ecs_subnet_ids: vec!["c".into()],
            certificate_arn: None,
            port: 8000,
            cpu: 512,
            memory: 1024,
        }
    }

    #[test]
    fn test_render_substitutes_with_and_without_spaces() {
        let values = BTreeMap::from([("a", "1".to_string()), ("b", "2".to_string())]);
        assert_eq!(render("x={{ a }} y={{b}}", &values).unwrap(), "x=1 y=2");
    }

    #[test]
    fn test_unknown_placeholder() {
        let values = BTreeMap::from([("a", "1".to_string())]);
        assert_eq!(
            render("{{ a }} {{ nope }}", &values),
            Err(TemplateError::UnknownPlaceholder("nope".into()))
        );
    }

    #[test]
    fn test_dynamic_references_pass_through() {
        let values = BTreeMap::new();
        let body = "Password: '{{resolve:secretsmanager:db:SecretString:pw}}'";
        assert_eq!(render(body, &values).unwrap(), body);
    }

    #[test]
    fn test_service_template_renders_completely() {
        let image = ImageCoordinate::new("123.dkr.ecr.us-east-1.amazonaws.com/mcp-servers/weather", "abc12345-20250101-000000");
        let body = render_service_template(&target(), &image).unwrap();

        assert!(!placeholder().is_match(&body));
        assert!(body.contains(
            "Image: 123.dkr.ecr.us-east-1.amazonaws.com/mcp-servers/weather:abc12345-20250101-000000"
        ));
        assert!(body.contains("ClusterName: mcp-cluster"));
        assert!(body.contains("Cpu: '512'"));
        assert!(body.contains("ALBUrl:"));
    }
}
