//! Canned-response backend for demos and deterministic tests

use crate::llm::{LlmBackend, LlmError, LlmMode};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A prompt the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub mode: LlmMode,
}

/// Mock backend that returns predefined responses in order
///
/// Every call is recorded so tests can check the exact rendered prompt.
/// Once the responses run out each further call fails.
#[derive(Debug, Clone)]
pub struct MockBackend {
    responses: Arc<Vec<String>>,
    index: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    /// Create a new mock backend with predefined responses
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Arc::new(responses.into_iter().map(Into::into).collect()),
            index: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get number of responses remaining
    pub fn remaining(&self) -> usize {
        self.responses
            .len()
            .saturating_sub(self.index.load(Ordering::SeqCst))
    }

    /// Rewind to the first response and forget recorded calls
    pub async fn reset(&self) {
        self.index.store(0, Ordering::SeqCst);
        self.calls.lock().await.clear();
    }

    /// Calls received so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Prompts received so far, in order
    pub async fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|call| call.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn invoke(&self, prompt: &str, mode: LlmMode) -> Result<String, LlmError> {
        self.calls.lock().await.push(RecordedCall {
            prompt: prompt.to_string(),
            mode,
        });

        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.responses.get(idx).cloned().ok_or_else(|| {
            LlmError::Internal(format!(
                "MockBackend: No response available for request {}",
                idx + 1
            ))
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
