//! Test: History - run records capture status and memory

use crate::helpers::*;
use prompt_pipeline::core::ExecutionStatus;
use prompt_pipeline::persistence::{create_record, InMemoryPersistence, PersistenceBackend};

const PIPELINE: &str = r#"
name: "Test: History"

steps:
  - name: "one"
    prompt: "1"
  - name: "two"
    prompt: "2"
    decoder:
      type: regex
      pattern: 'answer: (\d+)'
"#;

#[tokio::test]
async fn test_failed_run_recorded_with_partial_memory() {
    let result = run_yaml_with_mock(PIPELINE, &["a", "no digits"], None).await;
    let record = create_record(&result.pipeline, result.result.as_ref().err());

    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.failed_step.as_deref(), Some("two"));
    assert!(record.error.as_deref().unwrap().contains("did not match"));
    assert_eq!(record.completed_steps, 1);
    assert_eq!(record.total_steps, 2);
    assert_eq!(record.memory.keys().collect::<Vec<_>>(), vec!["one"]);

    let store = InMemoryPersistence::new();
    store.save_run(&record).await.unwrap();
    let loaded = store.load_run(record.run_id).await.unwrap().unwrap();
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn test_successful_runs_listed_per_pipeline() {
    let store = InMemoryPersistence::new();
    for _ in 0..2 {
        let result = run_yaml_with_mock(PIPELINE, &["a", "answer: 7"], None).await;
        assert_pipeline_completed(&result);
        store
            .save_run(&create_record(&result.pipeline, None))
            .await
            .unwrap();
    }

    let runs = store.list_runs("Test: History").await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == ExecutionStatus::Completed && r.error.is_none()));
    assert_eq!(store.list_pipelines().await.unwrap(), vec!["Test: History"]);
}
