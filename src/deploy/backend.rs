use super::stack::StackRequest;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Remote stack as last described
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSnapshot {
    pub status: String,
    pub status_reason: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

impl StackSnapshot {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            status_reason: None,
            outputs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StackBackendError {
    /// Update submitted with a template and parameters identical to the live stack
    #[error("No updates are to be performed")]
    NoUpdatesToPerform,

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

impl StackBackendError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        StackBackendError::Service {
            operation,
            message: message.into(),
        }
    }
}

/// Declarative infrastructure API the reconciler drives
#[async_trait]
pub trait StackBackend: Send + Sync {
    /// `Ok(None)` when the stack does not exist
    async fn describe(&self, stack_name: &str) -> Result<Option<StackSnapshot>, StackBackendError>;

    async fn create(&self, request: &StackRequest) -> Result<(), StackBackendError>;

    /// Fails with [`StackBackendError::NoUpdatesToPerform`] when nothing changed
    async fn update(&self, request: &StackRequest) -> Result<(), StackBackendError>;
}
