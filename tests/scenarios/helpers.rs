//! Test utility functions for prompt-pipeline

use prompt_pipeline::core::config::PipelineConfig;
use prompt_pipeline::core::{
    Decoded, ExecutionStatus, Memory, Pipeline, PipelineError, RamMemory, StepState,
};
use prompt_pipeline::execution::ExecutionEngine;
use prompt_pipeline::llm::MockBackend;
use std::sync::Arc;

/// Test result from running a pipeline
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub backend: MockBackend,
    pub result: Result<Decoded, PipelineError>,
}

impl PipelineTestResult {
    /// Check if the pipeline completed successfully
    pub fn is_success(&self) -> bool {
        self.pipeline.state.status == ExecutionStatus::Completed
    }

    /// Check if the pipeline failed
    pub fn is_failed(&self) -> bool {
        self.pipeline.state.status == ExecutionStatus::Failed
    }

    /// Raw output a step stored in memory
    pub fn get_step_output(&self, step_name: &str) -> Option<String> {
        self.pipeline
            .memory()
            .get(step_name)
            .and_then(|entry| entry.output().map(str::to_string))
    }

    /// Get the state of a specific step
    pub fn get_step_state(&self, step_name: &str) -> Option<&StepState> {
        self.pipeline.step(step_name).map(|s| &s.state)
    }

    /// Memory keys in insertion order
    pub fn memory_keys(&self) -> Vec<String> {
        self.pipeline.memory().all().keys().cloned().collect()
    }

    /// Prompts the backend received, in order
    pub async fn prompts(&self) -> Vec<String> {
        self.backend.prompts().await
    }

    /// Decoded output of a successful run
    pub fn output(&self) -> &Decoded {
        match &self.result {
            Ok(output) => output,
            Err(e) => panic!("Expected pipeline to succeed, got: {}", e),
        }
    }

    /// Error of a failed run
    pub fn error(&self) -> &PipelineError {
        match &self.result {
            Ok(output) => panic!("Expected pipeline to fail, got output: {:?}", output),
            Err(e) => e,
        }
    }
}

/// Build a pipeline from YAML with every step wired to one mock backend
pub fn pipeline_from_yaml(yaml: &str, backend: &MockBackend) -> Pipeline {
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    config
        .to_pipeline_with_backend(Arc::new(backend.clone()))
        .unwrap()
}

/// Run a pipeline defined in YAML with a mock backend returning `responses` in order
pub async fn run_yaml_with_mock(
    yaml: &str,
    responses: &[&str],
    input: Option<&str>,
) -> PipelineTestResult {
    let backend = MockBackend::new(responses.iter().copied());
    let pipeline = pipeline_from_yaml(yaml, &backend);
    run_pipeline(pipeline, backend, input).await
}

/// Run a pipeline seeded with an existing memory store
pub async fn run_yaml_with_memory(
    yaml: &str,
    responses: &[&str],
    memory: RamMemory,
) -> PipelineTestResult {
    let backend = MockBackend::new(responses.iter().copied());
    let pipeline = pipeline_from_yaml(yaml, &backend).with_memory(memory);
    run_pipeline(pipeline, backend, None).await
}

async fn run_pipeline(
    mut pipeline: Pipeline,
    backend: MockBackend,
    input: Option<&str>,
) -> PipelineTestResult {
    let result = ExecutionEngine::new().run(&mut pipeline, input).await;
    PipelineTestResult {
        pipeline,
        backend,
        result,
    }
}

/// Assert that pipeline completed successfully
pub fn assert_pipeline_completed(result: &PipelineTestResult) {
    assert!(
        result.is_success(),
        "Expected pipeline to complete, but status was {:?} (error: {:?})",
        result.pipeline.state.status,
        result.result.as_ref().err()
    );
}

/// Assert that pipeline failed at `step_name`
pub fn assert_pipeline_failed_at(result: &PipelineTestResult, step_name: &str) {
    assert!(
        result.is_failed(),
        "Expected pipeline to fail, but status was {:?}",
        result.pipeline.state.status
    );
    assert_eq!(result.pipeline.state.failed_step.as_deref(), Some(step_name));
    assert_eq!(result.error().step_name(), Some(step_name));
}

/// Assert that a step stored the given raw output
pub fn assert_step_stored(result: &PipelineTestResult, step_name: &str, output: &str) {
    assert_eq!(
        result.get_step_state(step_name),
        Some(&StepState::Stored),
        "Step '{}' was not stored",
        step_name
    );
    assert_eq!(result.get_step_output(step_name).as_deref(), Some(output));
}

/// Assert that a step failed with an error containing `needle`
pub fn assert_step_failed(result: &PipelineTestResult, step_name: &str, needle: &str) {
    match result.get_step_state(step_name) {
        Some(StepState::Failed { error }) => assert!(
            error.contains(needle),
            "Step '{}' error '{}' does not contain '{}'",
            step_name,
            error,
            needle
        ),
        other => panic!("Expected step '{}' to fail, got {:?}", step_name, other),
    }
}

/// Assert that a step never started
pub fn assert_step_pending(result: &PipelineTestResult, step_name: &str) {
    assert_eq!(result.get_step_state(step_name), Some(&StepState::Pending));
}

/// Assert the memory store holds exactly these keys, in order
pub fn assert_memory_keys(result: &PipelineTestResult, keys: &[&str]) {
    assert_eq!(result.memory_keys(), keys);
}
