//! Test: Success Chain - steps run in order and see earlier results

use crate::helpers::*;
use prompt_pipeline::core::{Decoded, Memory};
use prompt_pipeline::llm::LlmMode;

const CHAIN: &str = r#"
name: "Test: Success Chain"

steps:
  - name: "plan"
    prompt: "Create a plan"

  - name: "implement"
    prompt: "Implement this plan: {{ plan.output }}"

  - name: "review"
    prompt: "Review {{ implement.output }} against {{ plan.output }}"
    mode: chat
"#;

#[tokio::test]
async fn test_success_chain() {
    let result = run_yaml_with_mock(CHAIN, &["the plan", "the code", "approved"], None).await;

    assert_pipeline_completed(&result);
    assert_step_stored(&result, "plan", "the plan");
    assert_step_stored(&result, "implement", "the code");
    assert_step_stored(&result, "review", "approved");
    assert_eq!(result.output(), &Decoded::Text("approved".to_string()));

    assert_eq!(
        result.prompts().await,
        vec![
            "Create a plan",
            "Implement this plan: the plan",
            "Review the code against the plan",
        ]
    );
}

#[tokio::test]
async fn test_mode_forwarded_per_step() {
    let result = run_yaml_with_mock(CHAIN, &["a", "b", "c"], None).await;

    let modes: Vec<LlmMode> = result.backend.calls().await.into_iter().map(|c| c.mode).collect();
    assert_eq!(modes, vec![LlmMode::Completion, LlmMode::Completion, LlmMode::Chat]);
}

#[tokio::test]
async fn test_state_counts_and_memory() {
    let result = run_yaml_with_mock(CHAIN, &["a", "b", "c"], None).await;

    assert_eq!(result.pipeline.state.completed_steps, 3);
    assert_eq!(result.pipeline.state.total_steps, 3);
    assert_eq!(result.pipeline.state.progress(), 1.0);
    assert!(result.pipeline.state.completed_at.is_some());
    assert!(result.pipeline.state.failed_step.is_none());
    assert_memory_keys(&result, &["plan", "implement", "review"]);
    assert!(result.pipeline.is_complete());
}

#[tokio::test]
async fn test_initial_input_reaches_first_step() {
    let yaml = r#"
name: "Input"
steps:
  - name: "answer"
    prompt: "Question: {{ input }}"
"#;

    let result = run_yaml_with_mock(yaml, &["42"], Some("what is six times seven?")).await;

    assert_pipeline_completed(&result);
    assert_eq!(result.prompts().await, vec!["Question: what is six times seven?"]);
    // The input itself is not a memory entry
    assert_memory_keys(&result, &["answer"]);
    assert!(!result.pipeline.memory().contains("input"));
}

#[tokio::test]
async fn test_rerun_reuses_store_with_new_execution_id() {
    let backend = prompt_pipeline::llm::MockBackend::new(["first", "second"]);
    let yaml = r#"
name: "Twice"
steps:
  - name: "only"
    prompt: "go"
"#;
    let mut pipeline = pipeline_from_yaml(yaml, &backend);

    pipeline.run(None).await.unwrap();
    let first_id = pipeline.state.execution_id;
    let output = pipeline.run(None).await.unwrap();

    assert_eq!(output, Decoded::Text("second".to_string()));
    assert_ne!(pipeline.state.execution_id, first_id);
    assert_eq!(pipeline.memory().len(), 1);
    assert_eq!(pipeline.memory().get("only").unwrap().output(), Some("second"));
}
