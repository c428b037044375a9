//! Step executor - drives one step through resolve, invoke, decode and store

use crate::core::{
    Decoded, Memory, MemoryEntry, PipelineError, Step, StepState,
};
use crate::execution::ExecutionEvent;
use tracing::{debug, error, info};

/// Result of a step that reached `Stored`
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Raw text returned by the backend
    pub raw: String,

    /// Value produced by the step's decoder
    pub decoded: Decoded,
}

/// Callback receiving step lifecycle events
pub type Notify<'a> = &'a (dyn Fn(ExecutionEvent) + Send + Sync);

/// Executes a single step
#[derive(Debug, Clone, Copy, Default)]
pub struct StepExecutor;

impl StepExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a step and write its result into `memory`
    ///
    /// `input` is the entry piped into the step (see [`crate::core::PromptTemplate::render`]).
    /// Nothing is written to memory unless every earlier transition succeeded.
    pub async fn execute(
        &self,
        step: &mut Step,
        input: Option<&MemoryEntry>,
        memory: &mut dyn Memory,
        notify: Notify<'_>,
    ) -> Result<StepOutput, PipelineError> {
        info!("Executing step: {}", step.name);

        // Pending -> Resolved
        let prompt = match step.prompt.render(input, &*memory) {
            Ok(prompt) => prompt,
            Err(source) => {
                let err = PipelineError::Resolve {
                    step: step.name.clone(),
                    source,
                };
                return Err(Self::fail(step, err, notify));
            }
        };
        Self::transition(step, StepState::Resolved, notify);
        debug!("Rendered prompt for step {}: {}", step.name, prompt);

        // Resolved -> Invoked
        let raw = match step.backend.invoke(&prompt, step.mode).await {
            Ok(raw) => raw,
            Err(source) => {
                let err = PipelineError::Backend {
                    step: step.name.clone(),
                    source,
                };
                return Err(Self::fail(step, err, notify));
            }
        };
        Self::transition(step, StepState::Invoked, notify);
        debug!("Backend {} output for step {}: {}", step.backend.name(), step.name, raw);

        // Invoked -> Decoded
        let decoded = match step.decoder.decode(&raw, &step.target) {
            Ok(decoded) => decoded,
            Err(source) => {
                let err = PipelineError::Decode {
                    step: step.name.clone(),
                    source,
                };
                return Err(Self::fail(step, err, notify));
            }
        };
        Self::transition(step, StepState::Decoded, notify);

        // Decoded -> Stored
        memory.put(&step.name, MemoryEntry::from_decoded(&raw, &decoded));
        Self::transition(step, StepState::Stored, notify);
        info!("Step {} stored its result", step.name);

        Ok(StepOutput { raw, decoded })
    }

    fn transition(step: &mut Step, state: StepState, notify: Notify<'_>) {
        debug!("Step {}: {} -> {}", step.name, step.state.label(), state.label());
        step.state = state;
        notify(ExecutionEvent::StepTransition {
            step_name: step.name.clone(),
            state: step.state.clone(),
        });
    }

    fn fail(step: &mut Step, err: PipelineError, notify: Notify<'_>) -> PipelineError {
        error!("Step {} failed: {}", step.name, err);
        Self::transition(
            step,
            StepState::Failed {
                error: err.to_string(),
            },
            notify,
        );
        err
    }
}
