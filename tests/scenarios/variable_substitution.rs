//! Test: Variable Substitution - global variables, step bindings and piped input

use crate::helpers::*;
use prompt_pipeline::core::{PipelineError, ResolveError};

#[tokio::test]
async fn test_global_variables_and_step_bindings() {
    let yaml = r#"
name: "Test: Variables"

variables:
  value: "thanks"
  tone: "formal"

steps:
  - name: "step1"
    prompt: "Hello how are you?"

  - name: "step2"
    prompt: "You said '{{ step1.output }}'. I'm fine {{ value }}! Be {{ tone }}."
    bindings:
      tone: "casual"
"#;

    let result = run_yaml_with_mock(yaml, &["Hi!", "Great"], None).await;

    assert_pipeline_completed(&result);
    assert_eq!(
        result.prompts().await,
        vec![
            "Hello how are you?",
            "You said 'Hi!'. I'm fine thanks! Be casual.",
        ]
    );
}

#[tokio::test]
async fn test_unqualified_reference_reads_previous_entry() {
    let yaml = r#"
name: "Test: Piped Fields"

steps:
  - name: "extract"
    prompt: "Extract"
    decoder:
      type: json
    target:
      type: record
      fields:
        - name: city
        - name: country

  - name: "describe"
    prompt: "Describe {{ city }}, {{ country }}"
"#;

    let result = run_yaml_with_mock(
        yaml,
        &[r#"{"city": "Lyon", "country": "France"}"#, "A city"],
        None,
    )
    .await;

    assert_pipeline_completed(&result);
    assert_eq!(result.prompts().await[1], "Describe Lyon, France");
}

#[tokio::test]
async fn test_binding_shadows_piped_field() {
    let yaml = r#"
name: "Test: Shadowing"

steps:
  - name: "first"
    prompt: "{{ input }}"
  - name: "second"
    prompt: "{{ output }}"
    bindings:
      output: "fixed"
"#;

    let result = run_yaml_with_mock(yaml, &["from model", "done"], Some("start")).await;

    assert_pipeline_completed(&result);
    assert_eq!(result.prompts().await, vec!["start", "fixed"]);
}

#[tokio::test]
async fn test_unbound_variable_fails() {
    let yaml = r#"
name: "Test: Unbound"

steps:
  - name: "only"
    prompt: "Hello {{ who }}"
"#;

    let result = run_yaml_with_mock(yaml, &["never"], None).await;

    assert_pipeline_failed_at(&result, "only");
    assert!(matches!(
        result.error(),
        PipelineError::Resolve {
            source: ResolveError::MissingBinding { .. },
            ..
        }
    ));
    assert!(result.prompts().await.is_empty());
}

#[tokio::test]
async fn test_file_variable_contents_are_bound() {
    let path = std::env::temp_dir().join("prompt_pipeline_scenario_context.txt");
    std::fs::write(&path, "The sky is green.").unwrap();

    let yaml = format!(
        r#"
name: "Test: File Variable"

variables:
  context:
    path: "{}"

steps:
  - name: "ask"
    prompt: "Given: {{{{ context }}}} What colour is the sky?"
"#,
        path.display()
    );

    let result = run_yaml_with_mock(&yaml, &["green"], None).await;

    assert_pipeline_completed(&result);
    assert_eq!(
        result.prompts().await,
        vec!["Given: The sky is green. What colour is the sky?"]
    );

    std::fs::remove_file(&path).ok();
}
