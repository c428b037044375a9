//! Language-model backends a step can invoke

pub mod client;
pub mod command;
pub mod error;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::LlmClientConfig;
pub use command::CommandBackend;
pub use error::LlmError;
pub use mock::{MockBackend, RecordedCall};
pub use openai::OpenAiBackend;

/// How the backend should treat a rendered prompt
///
/// The pipeline never interprets the mode, it only forwards it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// Single-turn text completion
    #[default]
    Completion,
    /// Chat-style exchange with the prompt as the user message
    Chat,
}

impl fmt::Display for LlmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmMode::Completion => write!(f, "completion"),
            LlmMode::Chat => write!(f, "chat"),
        }
    }
}

/// Trait for model invocation - allows for different implementations
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send a rendered prompt and return the raw model output
    async fn invoke(&self, prompt: &str, mode: LlmMode) -> Result<String, LlmError>;

    /// Short backend name used in logs
    fn name(&self) -> &str;
}
