//! Test: Memory Trace - the three-step passthrough/JSON/regex scenario

use crate::helpers::*;
use prompt_pipeline::core::{Decoded, Memory, RamMemory};
use serde_json::json;

const THREE_STEPS: &str = r#"
name: "Test: Three Steps"

steps:
  - name: "step1"
    prompt: "Hello"

  - name: "step2"
    prompt: "You said '{{ step1.output }}'. Reply with JSON holding First and Second."
    decoder:
      type: json
    target:
      type: record
      fields:
        - name: First
        - name: Second

  - name: "step3"
    prompt: "{{ step1.output }} {{ First }}/{{ Second }} and {{ step2.First }}"
    decoder:
      type: regex
      pattern: '(\w+)\s(\w+)\s(.*)'
    target:
      type: sequence
"#;

const RESPONSES: [&str; 3] = [
    "Hi!",
    r#"{"First": "hello", "Second": "world"}"#,
    "hello world foo bar",
];

#[tokio::test]
async fn test_three_step_scenario() {
    let result = run_yaml_with_mock(THREE_STEPS, &RESPONSES, None).await;

    assert_pipeline_completed(&result);
    assert_eq!(
        result.output(),
        &Decoded::Sequence(vec![
            "hello".to_string(),
            "world".to_string(),
            "foo bar".to_string()
        ])
    );

    assert_eq!(
        result.prompts().await,
        vec![
            "Hello",
            "You said 'Hi!'. Reply with JSON holding First and Second.",
            "Hi! hello/world and hello",
        ]
    );

    assert_memory_keys(&result, &["step1", "step2", "step3"]);
}

#[tokio::test]
async fn test_memory_entries_keep_raw_and_decoded() {
    let result = run_yaml_with_mock(THREE_STEPS, &RESPONSES, None).await;
    let all = result.pipeline.memory().all();

    assert_eq!(all["step1"].output(), Some("Hi!"));
    assert_eq!(all["step1"].field("value"), Some(&json!("Hi!")));
    assert_eq!(all["step1"].fields().len(), 2);

    assert_eq!(all["step2"].output(), Some(RESPONSES[1]));
    assert_eq!(all["step2"].field("First"), Some(&json!("hello")));
    assert_eq!(all["step2"].field("Second"), Some(&json!("world")));

    assert_eq!(all["step3"].output(), Some("hello world foo bar"));
    assert_eq!(
        all["step3"].field("values"),
        Some(&json!(["hello", "world", "foo bar"]))
    );
}

#[tokio::test]
async fn test_dump_seeds_a_later_run() {
    let first = run_yaml_with_mock(THREE_STEPS, &RESPONSES, None).await;
    let dump = first.pipeline.memory().to_json_pretty().unwrap();

    let follow_up = r#"
name: "Test: Follow Up"

steps:
  - name: "recap"
    prompt: "Earlier you greeted with {{ step1.output }} and listed {{ step3.values }}"
"#;

    let seeded = RamMemory::from_json(&dump).unwrap();
    let result = run_yaml_with_memory(follow_up, &["noted"], seeded).await;

    assert_pipeline_completed(&result);
    assert_eq!(
        result.prompts().await,
        vec![r#"Earlier you greeted with Hi! and listed ["hello","world","foo bar"]"#]
    );
    assert_memory_keys(&result, &["step1", "step2", "step3", "recap"]);
}

#[tokio::test]
async fn test_demo_pipeline_runs_offline() {
    use prompt_pipeline::core::config::PipelineConfig;

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/greeting.yaml");
    let config = PipelineConfig::from_file(path).unwrap();
    let mut pipeline = config.to_pipeline(|_| None).unwrap();

    let output = pipeline.run(None).await.unwrap();

    assert_eq!(output.as_sequence().unwrap(), ["hello", "world", "foo bar"]);
    assert_eq!(pipeline.memory().len(), 3);
}
