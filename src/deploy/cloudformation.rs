use super::backend::{StackBackend, StackBackendError, StackSnapshot};
use super::stack::StackRequest;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types::{Capability, Parameter};
use aws_sdk_cloudformation::Client;
use std::collections::BTreeMap;
use tracing::debug;

const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";
const MISSING_STACK_MESSAGE: &str = "does not exist";

pub struct CloudFormationBackend {
    client: Client,
}

impl CloudFormationBackend {
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn parameters(request: &StackRequest) -> Vec<Parameter> {
    request
        .parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

#[async_trait]
impl StackBackend for CloudFormationBackend {
    async fn describe(&self, stack_name: &str) -> Result<Option<StackSnapshot>, StackBackendError> {
        let output = match self.client.describe_stacks().stack_name(stack_name).send().await {
            Ok(output) => output,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .and_then(|se| se.message())
                    .map_or(false, |m| m.contains(MISSING_STACK_MESSAGE));
                if missing {
                    debug!(stack = stack_name, "Stack does not exist");
                    return Ok(None);
                }
                return Err(StackBackendError::service(
                    "DescribeStacks",
                    DisplayErrorContext(&e).to_string(),
                ));
            }
        };

        let Some(stack) = output.stacks().first() else {
            return Ok(None);
        };

        let outputs: BTreeMap<String, String> = stack
            .outputs()
            .iter()
            .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
            .collect();

        Ok(Some(StackSnapshot {
            status: stack
                .stack_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            status_reason: stack.stack_status_reason().map(str::to_string),
            outputs,
        }))
    }

    async fn create(&self, request: &StackRequest) -> Result<(), StackBackendError> {
        self.client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(parameters(request)))
            .capabilities(Capability::CapabilityNamedIam)
            .send()
            .await
            .map_err(|e| StackBackendError::service("CreateStack", DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn update(&self, request: &StackRequest) -> Result<(), StackBackendError> {
        let result = self
            .client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(parameters(request)))
            .capabilities(Capability::CapabilityNamedIam)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let no_updates = e
                    .as_service_error()
                    .and_then(|se| se.message())
                    .map_or(false, |m| m.contains(NO_UPDATES_MESSAGE));
                if no_updates {
                    Err(StackBackendError::NoUpdatesToPerform)
                } else {
                    Err(StackBackendError::service(
                        "UpdateStack",
                        DisplayErrorContext(&e).to_string(),
                    ))
                }
            }
        }
    }
}
