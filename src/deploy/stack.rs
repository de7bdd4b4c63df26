use serde::Serialize;

pub const STACK_PREFIX: &str = "mcp-server-";

/// Everything the ECS/ALB stack needs besides the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTarget {
    pub service_name: String,
    pub cluster_name: String,
    pub vpc_id: String,
    pub alb_subnet_ids: Vec<String>,
    pub ecs_subnet_ids: Vec<String>,
    pub certificate_arn: Option<String>,
    pub port: u16,
    pub cpu: u32,
    pub memory: u32,
}

/// Desired state sent to the stack backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub stack_name: String,
    pub template_body: String,
    /// Ordered `(ParameterKey, ParameterValue)` pairs
    pub parameters: Vec<(String, String)>,
}

impl StackRequest {
    pub fn stack_name_for(service_name: &str) -> String {
        format!("{}{}", STACK_PREFIX, service_name)
    }

    pub fn for_service(target: &DeploymentTarget, template_body: String) -> Self {
        let mut parameters = vec![
            ("ServiceName".to_string(), target.service_name.clone()),
            ("VpcId".to_string(), target.vpc_id.clone()),
            ("ALBSubnetIds".to_string(), target.alb_subnet_ids.join(",")),
            ("ECSSubnetIds".to_string(), target.ecs_subnet_ids.join(",")),
        ];
        if let Some(arn) = target.certificate_arn.as_deref().filter(|a| !a.is_empty()) {
            parameters.push(("CertificateArn".to_string(), arn.to_string()));
        }

        Self {
            stack_name: Self::stack_name_for(&target.service_name),
            template_body,
            parameters,
        }
    }
}
