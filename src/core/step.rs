//! Step domain model

use crate::core::{
    decoder::{DecodeTarget, Decoder},
    error::PipelineError,
    state::StepState,
    template::PromptTemplate,
};
use crate::llm::{LlmBackend, LlmMode};
use std::fmt;
use std::sync::Arc;

/// A single prompt → invoke → decode → store unit in a pipeline
#[derive(Clone)]
pub struct Step {
    /// Step name, also its key in memory
    pub name: String,

    /// Shared model backend
    pub backend: Arc<dyn LlmBackend>,

    /// Invocation mode forwarded to the backend
    pub mode: LlmMode,

    /// Prompt template with step-local bindings
    pub prompt: PromptTemplate,

    /// Output decoding strategy
    pub decoder: Arc<dyn Decoder>,

    /// Destination shape handed to the decoder
    pub target: DecodeTarget,

    /// Runtime state of the latest run
    pub state: StepState,
}

impl Step {
    /// Create a step; the name must be non-empty
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn LlmBackend>,
        mode: LlmMode,
        prompt: PromptTemplate,
        decoder: Arc<dyn Decoder>,
        target: DecodeTarget,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "step name must not be empty".to_string(),
            ));
        }

        Ok(Step {
            name,
            backend,
            mode,
            prompt,
            decoder,
            target,
            state: StepState::Pending,
        })
    }

    pub fn is_stored(&self) -> bool {
        matches!(self.state, StepState::Stored)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, StepState::Failed { .. })
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("backend", &self.backend.name())
            .field("mode", &self.mode)
            .field("prompt", &self.prompt.source())
            .field("decoder", &self.decoder.name())
            .field("target", &self.target)
            .field("state", &self.state)
            .finish()
    }
}
