//! Test: Failure Handling - first failure aborts, nothing is rolled back

use crate::helpers::*;
use prompt_pipeline::core::{DecodeError, PipelineError, ResolveError};

const FOUR_STEPS: &str = r#"
name: "Test: No Rollback"

steps:
  - name: "one"
    prompt: "1"
  - name: "two"
    prompt: "2 after {{ one.output }}"
  - name: "three"
    prompt: "3"
    decoder:
      type: json
    target:
      type: record
      fields:
        - name: answer
  - name: "four"
    prompt: "4"
"#;

#[tokio::test]
async fn test_decode_failure_keeps_earlier_entries() {
    let result = run_yaml_with_mock(FOUR_STEPS, &["a", "b", "not json", "d"], None).await;

    assert_pipeline_failed_at(&result, "three");
    assert!(matches!(
        result.error(),
        PipelineError::Decode {
            source: DecodeError::Malformed(_),
            ..
        }
    ));

    assert_step_stored(&result, "one", "a");
    assert_step_stored(&result, "two", "b");
    assert_step_failed(&result, "three", "malformed output");
    assert_step_pending(&result, "four");

    // Memory holds exactly the steps before the failure
    assert_memory_keys(&result, &["one", "two"]);
    assert_eq!(result.pipeline.state.completed_steps, 2);
    assert_eq!(result.prompts().await.len(), 3);
}

#[tokio::test]
async fn test_backend_failure_is_tagged_with_step() {
    // Two responses for four steps: step three has nothing to return
    let result = run_yaml_with_mock(FOUR_STEPS, &["a", "b"], None).await;

    assert_pipeline_failed_at(&result, "three");
    assert!(matches!(result.error(), PipelineError::Backend { .. }));
    assert!(result.error().to_string().contains("backend failed"));
    assert_memory_keys(&result, &["one", "two"]);
}

#[tokio::test]
async fn test_undefined_step_reference_stops_run() {
    let yaml = r#"
name: "Test: Missing Reference"

steps:
  - name: "one"
    prompt: "1"
  - name: "two"
    prompt: "{{ nowhere.output }}"
  - name: "three"
    prompt: "3"
"#;

    let result = run_yaml_with_mock(yaml, &["a", "b", "c"], None).await;

    assert_pipeline_failed_at(&result, "two");
    match result.error() {
        PipelineError::Resolve {
            source: ResolveError::MissingBinding { reference },
            ..
        } => assert_eq!(reference, "nowhere.output"),
        other => panic!("Expected missing binding, got {:?}", other),
    }

    // The backend was never called for the failing step
    assert_eq!(result.prompts().await, vec!["1"]);
    assert_step_pending(&result, "three");
    assert_memory_keys(&result, &["one"]);
}

#[tokio::test]
async fn test_forward_reference_is_missing_not_empty() {
    let yaml = r#"
name: "Test: Forward Reference"

steps:
  - name: "early"
    prompt: "I need {{ late.output }}"
  - name: "late"
    prompt: "too late"
"#;

    let result = run_yaml_with_mock(yaml, &["x", "y"], None).await;

    assert_pipeline_failed_at(&result, "early");
    assert!(result.error().to_string().contains("late.output"));
    assert!(result.prompts().await.is_empty());
    assert_memory_keys(&result, &[]);
}

#[tokio::test]
async fn test_missing_field_of_existing_step() {
    let yaml = r#"
name: "Test: Missing Field"

steps:
  - name: "one"
    prompt: "1"
  - name: "two"
    prompt: "{{ one.summary }}"
"#;

    let result = run_yaml_with_mock(yaml, &["a", "b"], None).await;

    assert_pipeline_failed_at(&result, "two");
    assert_step_failed(&result, "two", "one.summary");
}
