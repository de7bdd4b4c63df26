use super::backend::{StackBackend, StackBackendError, StackSnapshot};
use super::stack::StackRequest;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// In-memory stack backend.
///
/// Each create/update queues the configured status sequence; every
/// `describe` advances the stack one status along it.
pub struct MockStackBackend {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    stack: Option<StackSnapshot>,
    pending: VecDeque<String>,
    outputs: BTreeMap<String, String>,
    create_statuses: Vec<String>,
    update_statuses: Vec<String>,
    no_updates: bool,
    vanish_on_wait: bool,
    describe_error: Option<String>,
    requests: Vec<StackRequest>,
    describe_calls: usize,
    create_calls: usize,
    update_calls: usize,
}

impl MockStackBackend {
    pub fn absent() -> Self {
        Self {
            state: Mutex::new(MockState {
                create_statuses: vec!["CREATE_COMPLETE".to_string()],
                update_statuses: vec!["UPDATE_COMPLETE".to_string()],
                ..Default::default()
            }),
        }
    }

    pub fn existing(status: &str) -> Self {
        let backend = Self::absent();
        backend.lock().stack = Some(StackSnapshot::new(status));
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn with_output(self, key: &str, value: &str) -> Self {
        {
            let mut state = self.lock();
            state.outputs.insert(key.to_string(), value.to_string());
            if let Some(stack) = state.stack.as_mut() {
                stack.outputs.insert(key.to_string(), value.to_string());
            }
        }
        self
    }

    pub fn with_create_statuses(self, statuses: &[&str]) -> Self {
        self.lock().create_statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_update_statuses(self, statuses: &[&str]) -> Self {
        self.lock().update_statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Updates fail with `NoUpdatesToPerform`
    pub fn reporting_no_updates(self) -> Self {
        self.lock().no_updates = true;
        self
    }

    /// The stack disappears on the first describe after create/update
    pub fn vanishing_during_wait(self) -> Self {
        self.lock().vanish_on_wait = true;
        self
    }

    pub fn failing_describe(self, message: &str) -> Self {
        self.lock().describe_error = Some(message.to_string());
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.lock().describe_calls
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    pub fn requests(&self) -> Vec<StackRequest> {
        self.lock().requests.clone()
    }

    fn start(state: &mut MockState, first: &str, statuses: Vec<String>) {
        let outputs = state.outputs.clone();
        let stack = state.stack.get_or_insert_with(|| StackSnapshot::new(first));
        stack.status = first.to_string();
        stack.outputs = outputs;
        state.pending = statuses.into();
    }
}

#[async_trait]
impl StackBackend for MockStackBackend {
    async fn describe(&self, _stack_name: &str) -> Result<Option<StackSnapshot>, StackBackendError> {
        let mut state = self.lock();
        state.describe_calls += 1;

        if let Some(message) = &state.describe_error {
            return Err(StackBackendError::service("DescribeStacks", message.clone()));
        }

        if state.vanish_on_wait && !state.pending.is_empty() {
            state.pending.clear();
            state.stack = None;
        }

        if let Some(next) = state.pending.pop_front() {
            if let Some(stack) = state.stack.as_mut() {
                stack.status = next;
            }
        }
        Ok(state.stack.clone())
    }

    async fn create(&self, request: &StackRequest) -> Result<(), StackBackendError> {
        let mut state = self.lock();
        state.create_calls += 1;
        state.requests.push(request.clone());
        let statuses = state.create_statuses.clone();
        Self::start(&mut state, "CREATE_IN_PROGRESS", statuses);
        Ok(())
    }

    async fn update(&self, request: &StackRequest) -> Result<(), StackBackendError> {
        let mut state = self.lock();
        state.update_calls += 1;
        state.requests.push(request.clone());
        if state.no_updates {
            return Err(StackBackendError::NoUpdatesToPerform);
        }
        let statuses = state.update_statuses.clone();
        Self::start(&mut state, "UPDATE_IN_PROGRESS", statuses);
        Ok(())
    }
}
