//! Scripted providers for exercising the orchestrator without a network.

use crate::traits::{ChatMessage, CompletionProvider, ProviderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Pops queued responses in order; errors once the script runs out.
pub struct MockProvider {
    responses: Mutex<VecDeque<String>>,
}

impl MockProvider {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    pub fn queue(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(response.into());
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _system: &str,
    ) -> Result<String, ProviderError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::Api("mock script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

/// Never resolves. Stands in for a hung network call in cancellation tests.
pub struct PendingProvider;

#[async_trait]
impl CompletionProvider for PendingProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _system: &str,
    ) -> Result<String, ProviderError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "Pending"
    }
}
