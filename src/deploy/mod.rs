//! Deployment of built images as load-balanced container services.
//!
//! The service is described by a declarative template and reconciled against
//! whatever stack already exists: absent stacks are created, existing ones
//! updated, and an update with no changes is treated as success without waiting.

mod backend;
mod client_config;
mod cloudformation;
mod mock;
mod reconciler;
mod stack;
mod template;

pub use backend::{StackBackend, StackBackendError, StackSnapshot};
pub use client_config::{ClientConfig, SSE_PATH, STREAMABLE_HTTP_PATH};
pub use cloudformation::CloudFormationBackend;
pub use mock::MockStackBackend;
pub use reconciler::{
    PollPolicy, ReconcileError, ReconcileOutcome, StackAction, StackReconciler, ENDPOINT_OUTPUT,
};
pub use stack::{DeploymentTarget, StackRequest, STACK_PREFIX};
pub use template::{render, render_service_template, service_values, TemplateError, ECS_SERVICE_TEMPLATE};
