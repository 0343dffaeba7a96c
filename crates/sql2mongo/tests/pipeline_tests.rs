//! End-to-end runs against the in-memory source and sink.

use std::sync::Arc;

use sql2mongo::drivers::{MemorySink, MemorySource};
use sql2mongo::{
    Config, JobDescriptor, Orchestrator, Row, RowNormalizer, SqlValue, TransferConfig,
};
use tokio_util::sync::CancellationToken;

fn job(write_operation: &str) -> JobDescriptor {
    let yaml = format!(
        r#"
jobs:
  - name: accounts
    description: Accounts into mongo
    enabled: true
    write_operation: "{}"
    source_type: mysql
    source: {{ host: db, database: app, table: accounts }}
    destination: {{ host: mongo, database: app, collection: accounts }}
"#,
        write_operation
    );
    Config::from_yaml(&yaml).unwrap().job("accounts").unwrap()
}

fn scenario_rows() -> Vec<Row> {
    vec![
        [("id", SqlValue::Int(1)), ("name", SqlValue::from("a"))]
            .into_iter()
            .collect(),
        [("id", SqlValue::Int(2)), ("data", SqlValue::Blob(b"b".to_vec()))]
            .into_iter()
            .collect(),
        [("id", SqlValue::Int(3)), ("name", SqlValue::from("c"))]
            .into_iter()
            .collect(),
    ]
}

async fn run(job: JobDescriptor, rows: Vec<Row>, sink: Arc<MemorySink>) -> sql2mongo::RunOutcome {
    Orchestrator::with_endpoints(job, Box::new(MemorySource::new(rows)), sink)
        .run(CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_three_rows_upserted() {
    let sink = Arc::new(MemorySink::new());
    let outcome = run(job(""), scenario_rows(), sink.clone()).await;

    assert_eq!(outcome.to_string(), "3/3");
    let docs = sink.documents().await;
    assert_eq!(docs.len(), 3);
    for id in 1..=3 {
        assert!(sink.find_by_id(&SqlValue::Int(id)).await.is_some());
    }

    let doc2 = sink.find_by_id(&SqlValue::Int(2)).await.unwrap();
    assert_eq!(doc2.get("data"), Some(&SqlValue::Text("b".into())));
    assert!(!doc2.contains_key("id"));
}

#[tokio::test]
async fn test_injected_failure_on_second_row() {
    let sink = Arc::new(MemorySink::new().reject_id(2i64));
    let outcome = run(job("upsert"), scenario_rows(), sink.clone()).await;

    assert_eq!(outcome.to_string(), "2/3");
    assert_eq!((outcome.written, outcome.failed), (2, 1));
    assert!(sink.find_by_id(&SqlValue::Int(1)).await.is_some());
    assert!(sink.find_by_id(&SqlValue::Int(2)).await.is_none());
    assert!(sink.find_by_id(&SqlValue::Int(3)).await.is_some());
}

#[tokio::test]
async fn test_update_only_touches_existing_documents() {
    let existing: Row = [("id", SqlValue::Int(1)), ("name", SqlValue::from("old"))]
        .into_iter()
        .collect();
    let sink = Arc::new(MemorySink::with_documents(vec![
        RowNormalizer::default().normalize(existing),
    ]));

    let outcome = run(job("update"), scenario_rows(), sink.clone()).await;

    assert_eq!(outcome.to_string(), "1/3");
    assert_eq!(sink.documents().await.len(), 1);
    let doc = sink.find_by_id(&SqlValue::Int(1)).await.unwrap();
    assert_eq!(doc.get("name"), Some(&SqlValue::from("a")));
}

#[tokio::test]
async fn test_insert_mode_rejects_duplicates_per_row() {
    let mut rows = scenario_rows();
    rows.push(rows[0].clone());
    let sink = Arc::new(MemorySink::new());

    let outcome = run(job("insert"), rows, sink.clone()).await;

    assert_eq!(outcome.to_string(), "3/4");
    assert_eq!(sink.documents().await.len(), 3);
}

#[tokio::test]
async fn test_flags_off_keep_raw_shape() {
    let sink = Arc::new(MemorySink::new());
    let outcome = Orchestrator::with_endpoints(
        job("insert"),
        Box::new(MemorySource::new(scenario_rows())),
        sink.clone(),
    )
    .with_conversions(false, false)
    .run(CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(outcome.to_string(), "3/3");
    let docs = sink.documents().await;
    assert!(docs.iter().all(|d| d.contains_key("id") && !d.contains_key("_id")));
    assert_eq!(docs[1].get("data"), Some(&SqlValue::Blob(b"b".to_vec())));
}

#[tokio::test]
async fn test_scan_failures_are_counted() {
    let mut rows: Vec<Result<Row, String>> = scenario_rows().into_iter().map(Ok).collect();
    rows.insert(1, Err("malformed packet".into()));
    let sink = Arc::new(MemorySink::new());

    let outcome = Orchestrator::with_endpoints(
        job("upsert"),
        Box::new(MemorySource::with_results(rows)),
        sink.clone(),
    )
    .run(CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(outcome.to_string(), "3/4");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_matches_sequential_tally() {
    let rows: Vec<Row> = (1..=500)
        .map(|i| {
            [("id", SqlValue::Int(i)), ("payload", SqlValue::Blob(vec![b'x'; 16]))]
                .into_iter()
                .collect()
        })
        .collect();
    let sink = Arc::new(MemorySink::new().reject_id(7i64).reject_id(300i64));

    let outcome = Orchestrator::with_endpoints(
        job("upsert"),
        Box::new(MemorySource::new(rows)),
        sink.clone(),
    )
    .with_transfer_config(TransferConfig {
        workers: 8,
        channel_capacity: 16,
        ..TransferConfig::default()
    })
    .run(CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(outcome.to_string(), "498/500");
    assert_eq!(sink.documents().await.len(), 498);
}

#[tokio::test]
async fn test_cancelled_run_is_an_error() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = Arc::new(MemorySink::new());

    let result = Orchestrator::with_endpoints(
        job("upsert"),
        Box::new(MemorySource::new(scenario_rows())),
        sink.clone(),
    )
    .run(cancel)
    .await;

    assert!(matches!(result, Err(sql2mongo::LoadError::Cancelled)));
    assert!(sink.documents().await.is_empty());
    assert!(sink.is_closed());
}
