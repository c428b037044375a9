//! Pipeline domain model

use crate::core::{
    decoder::Decoded,
    error::PipelineError,
    memory::{Memory, RamMemory},
    state::{ExecutionStatus, PipelineState},
    step::Step,
    template::is_referenceable_name,
};
use crate::execution::ExecutionEngine;
use std::collections::HashSet;
use std::fmt;

/// Key under which the external input is exposed to the first step
pub const INPUT_KEY: &str = "input";

/// An ordered sequence of steps sharing one memory store
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Steps in execution order
    steps: Vec<Step>,

    /// Shared memory store
    memory: Box<dyn Memory>,

    /// Execution state of the latest run
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline with a fresh in-process memory store
    ///
    /// Fails when there are no steps or when step names are not unique.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, PipelineError> {
        if steps.is_empty() {
            return Err(PipelineError::Configuration(
                "pipeline must contain at least one step".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if step.name.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "step name must not be empty".to_string(),
                ));
            }
            if !is_referenceable_name(&step.name) {
                return Err(PipelineError::Configuration(format!(
                    "step name '{}' may only contain letters, digits, '_' and '-'",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "duplicate step name: {}",
                    step.name
                )));
            }
        }

        Ok(Pipeline {
            name: name.into(),
            steps,
            memory: Box::new(RamMemory::new()),
            state: PipelineState::new(),
        })
    }

    /// Use a caller-supplied memory store, e.g. one seeded from a previous run
    pub fn with_memory(mut self, memory: impl Memory + 'static) -> Self {
        self.memory = Box::new(memory);
        self
    }

    /// Swap the memory store, returning the previous one
    pub fn replace_memory(&mut self, memory: Box<dyn Memory>) -> Box<dyn Memory> {
        std::mem::replace(&mut self.memory, memory)
    }

    pub fn memory(&self) -> &dyn Memory {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> &mut dyn Memory {
        self.memory.as_mut()
    }

    pub fn into_memory(self) -> Box<dyn Memory> {
        self.memory
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Split borrow used by the engine: steps, the store they write to, run state
    pub(crate) fn parts_mut(&mut self) -> (&mut [Step], &mut dyn Memory, &mut PipelineState) {
        (&mut self.steps, self.memory.as_mut(), &mut self.state)
    }

    /// Names of steps, in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Check if every step stored its result
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(Step::is_stored)
    }

    /// Check if the latest run failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Run every step in order and return the last step's decoded output
    ///
    /// `input`, when non-empty, is bound under [`INPUT_KEY`] for the first step.
    pub async fn run(&mut self, input: Option<&str>) -> Result<Decoded, PipelineError> {
        ExecutionEngine::new().run(self, input).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("memory_entries", &self.memory.len())
            .field("state", &self.state)
            .finish()
    }
}
