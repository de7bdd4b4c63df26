//! Create-or-update reconciliation with a bounded wait
//!
//! | state    | action | waits for                     |
//! |----------|--------|-------------------------------|
//! | absent   | create | `CREATE_COMPLETE`             |
//! | existing | update | `UPDATE_COMPLETE` unless the backend reports no updates |
//!
//! Remote state is re-described on every call and never cached.

use super::backend::{StackBackend, StackBackendError, StackSnapshot};
use super::stack::StackRequest;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Stack output holding the service base URL
pub const ENDPOINT_OUTPUT: &str = "ALBUrl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    /// 30 s × 120 attempts, one hour in total
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 120,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Upper bound on time spent waiting for one operation
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub stack_name: String,
    pub action: StackAction,
    pub endpoint: String,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Backend(#[from] StackBackendError),

    #[error("Stack {stack_name} reached {status}{}", reason_suffix(.reason))]
    OperationFailed {
        stack_name: String,
        status: String,
        reason: Option<String>,
    },

    #[error("Timed out after {attempts} checks waiting for stack {stack_name} (last status {last_status})")]
    Timeout {
        stack_name: String,
        attempts: u32,
        last_status: String,
    },

    #[error("Stack {stack_name} disappeared while waiting for it")]
    Vanished { stack_name: String },

    #[error("Stack {stack_name} succeeded but exposes no usable endpoint (missing output {output})")]
    MissingOutput { stack_name: String, output: String },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl ReconcileError {
    pub fn help_message(&self) -> String {
        match self {
            ReconcileError::OperationFailed { stack_name, .. } => format!(
                "Error: {}\n\n\
                Help: Inspect the stack events in the CloudFormation console:\n\
                aws cloudformation describe-stack-events --stack-name {}",
                self, stack_name
            ),
            ReconcileError::Timeout { stack_name, .. } => format!(
                "Error: {}\n\n\
                Help: The operation may still finish. Check its status with:\n\
                aws cloudformation describe-stacks --stack-name {}",
                self, stack_name
            ),
            other => format!("Error: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitTarget {
    CreateComplete,
    UpdateComplete,
}

#[derive(Debug, PartialEq, Eq)]
enum Progress {
    Done,
    Pending,
    Failed,
}

impl WaitTarget {
    fn classify(self, status: &str) -> Progress {
        match self {
            WaitTarget::CreateComplete => match status {
                "CREATE_COMPLETE" => Progress::Done,
                "CREATE_FAILED" => Progress::Failed,
                s if s.starts_with("ROLLBACK_") || s.starts_with("DELETE_") => Progress::Failed,
                _ => Progress::Pending,
            },
            WaitTarget::UpdateComplete => match status {
                "UPDATE_COMPLETE" => Progress::Done,
                "UPDATE_FAILED" => Progress::Failed,
                s if s.starts_with("UPDATE_ROLLBACK_") || s.starts_with("DELETE_") => {
                    Progress::Failed
                }
                _ => Progress::Pending,
            },
        }
    }
}

pub struct StackReconciler {
    backend: Arc<dyn StackBackend>,
    policy: PollPolicy,
}

impl StackReconciler {
    pub fn new(backend: Arc<dyn StackBackend>) -> Self {
        Self::with_policy(backend, PollPolicy::default())
    }

    pub fn with_policy(backend: Arc<dyn StackBackend>, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn reconcile(&self, request: &StackRequest) -> Result<ReconcileOutcome, ReconcileError> {
        let stack_name = request.stack_name.as_str();

        let action = match self.backend.describe(stack_name).await? {
            None => {
                info!(stack = stack_name, "Creating stack");
                self.backend.create(request).await?;
                self.wait(stack_name, WaitTarget::CreateComplete).await?;
                StackAction::Created
            }
            Some(existing) => {
                info!(stack = stack_name, status = %existing.status, "Updating existing stack");
                match self.backend.update(request).await {
                    Ok(()) => {
                        self.wait(stack_name, WaitTarget::UpdateComplete).await?;
                        StackAction::Updated
                    }
                    Err(StackBackendError::NoUpdatesToPerform) => {
                        info!(stack = stack_name, "Stack is already up to date");
                        StackAction::Unchanged
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let snapshot = self
            .backend
            .describe(stack_name)
            .await?
            .ok_or_else(|| ReconcileError::Vanished {
                stack_name: stack_name.to_string(),
            })?;

        let endpoint = snapshot
            .outputs
            .get(ENDPOINT_OUTPUT)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| ReconcileError::MissingOutput {
                stack_name: stack_name.to_string(),
                output: ENDPOINT_OUTPUT.to_string(),
            })?;

        info!(stack = stack_name, action = ?action, endpoint = %endpoint, "Stack reconciled");
        Ok(ReconcileOutcome {
            stack_name: stack_name.to_string(),
            action,
            endpoint,
        })
    }

    async fn wait(&self, stack_name: &str, target: WaitTarget) -> Result<StackSnapshot, ReconcileError> {
        let mut last_status = String::from("UNKNOWN");

        for attempt in 1..=self.policy.max_attempts {
            let snapshot = self
                .backend
                .describe(stack_name)
                .await?
                .ok_or_else(|| ReconcileError::Vanished {
                    stack_name: stack_name.to_string(),
                })?;

            debug!(
                stack = stack_name,
                attempt,
                max_attempts = self.policy.max_attempts,
                status = %snapshot.status,
                "Polled stack"
            );

            match target.classify(&snapshot.status) {
                Progress::Done => return Ok(snapshot),
                Progress::Failed => {
                    return Err(ReconcileError::OperationFailed {
                        stack_name: stack_name.to_string(),
                        status: snapshot.status,
                        reason: snapshot.status_reason,
                    })
                }
                Progress::Pending => last_status = snapshot.status,
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(ReconcileError::Timeout {
            stack_name: stack_name.to_string(),
            attempts: self.policy.max_attempts,
            last_status,
        })
    }
}
