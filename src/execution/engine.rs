//! Main execution engine - runs a pipeline's steps in order

use crate::{
    core::{Decoded, ExecutionStatus, MemoryEntry, Pipeline, PipelineError, StepState, INPUT_KEY},
    execution::StepExecutor,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_name: String,
        index: usize,
    },
    StepTransition {
        step_name: String,
        state: StepState,
    },
    StepCompleted {
        step_name: String,
        output: String,
    },
    StepFailed {
        step_name: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Sequential pipeline execution engine
///
/// Steps run strictly one after another. The first failure aborts the run;
/// entries already written to memory are kept.
#[derive(Clone, Default)]
pub struct ExecutionEngine {
    executor: StepExecutor,
    event_handlers: Vec<EventHandler>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.add_event_handler(handler);
        self
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline and return the last step's decoded output
    ///
    /// A non-empty `input` is exposed to the first step under [`INPUT_KEY`].
    pub async fn run(
        &self,
        pipeline: &mut Pipeline,
        input: Option<&str>,
    ) -> Result<Decoded, PipelineError> {
        let pipeline_name = pipeline.name.clone();
        let (steps, memory, state) = pipeline.parts_mut();

        state.start(steps.len());
        let execution_id = state.execution_id;
        for step in steps.iter_mut() {
            step.state = StepState::Pending;
        }

        info!("Starting pipeline execution: {} ({})", pipeline_name, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline_name.clone(),
            total_steps: steps.len(),
        });

        let mut piped = input.filter(|text| !text.is_empty()).map(|text| {
            let mut fields = IndexMap::new();
            fields.insert(INPUT_KEY.to_string(), Value::String(text.to_string()));
            MemoryEntry::from_fields(fields)
        });

        let notify = |event: ExecutionEvent| self.emit_event(event);
        let mut last = None;

        for (index, step) in steps.iter_mut().enumerate() {
            self.emit_event(ExecutionEvent::StepStarted {
                step_name: step.name.clone(),
                index,
            });

            match self
                .executor
                .execute(step, piped.as_ref(), memory, &notify)
                .await
            {
                Ok(output) => {
                    state.step_completed();
                    self.emit_event(ExecutionEvent::StepCompleted {
                        step_name: step.name.clone(),
                        output: output.raw,
                    });
                    piped = memory.get(&step.name);
                    last = Some(output.decoded);
                }
                Err(err) => {
                    error!("Pipeline {} aborted at step {}: {}", pipeline_name, step.name, err);
                    state.fail(Some(step.name.as_str()));
                    self.emit_event(ExecutionEvent::StepFailed {
                        step_name: step.name.clone(),
                        error: err.to_string(),
                    });
                    self.emit_event(ExecutionEvent::PipelineCompleted {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(err);
                }
            }
        }

        let output = match last {
            Some(output) => output,
            None => {
                state.fail(None);
                return Err(PipelineError::Configuration(
                    "pipeline must contain at least one step".to_string(),
                ));
            }
        };

        state.complete();
        info!(
            "Pipeline execution finished: {} - {:?}",
            pipeline_name, state.status
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });

        Ok(output)
    }
}
