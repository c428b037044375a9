//! Test: Determinism - identical inputs give identical runs

use crate::helpers::*;
use prompt_pipeline::core::Memory;

const PIPELINE: &str = r#"
name: "Test: Determinism"

variables:
  topic: "rust"

steps:
  - name: "ideas"
    prompt: "Ideas about {{ topic }} for {{ input }}"
    decoder:
      type: json
    target:
      type: sequence

  - name: "pick"
    prompt: "Pick one of {{ ideas.values }}"
"#;

const RESPONSES: [&str; 2] = [r#"["ownership", "traits"]"#, "traits"];

#[tokio::test]
async fn test_repeated_runs_match() {
    let first = run_yaml_with_mock(PIPELINE, &RESPONSES, Some("beginners")).await;
    let second = run_yaml_with_mock(PIPELINE, &RESPONSES, Some("beginners")).await;

    assert_pipeline_completed(&first);
    assert_eq!(first.output(), second.output());
    assert_eq!(first.prompts().await, second.prompts().await);
    assert_eq!(
        first.pipeline.memory().to_json_pretty().unwrap(),
        second.pipeline.memory().to_json_pretty().unwrap()
    );
    assert_ne!(
        first.pipeline.state.execution_id,
        second.pipeline.state.execution_id
    );
    assert_eq!(
        first.prompts().await[1],
        r#"Pick one of ["ownership","traits"]"#
    );
}
