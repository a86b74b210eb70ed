use std::sync::Arc;

use aceload_core::AppError;
use aceload_domain::RecordCount;

use crate::test_support::FakeLoadStore;
use crate::timing::LogScope;
use crate::workload_service::WorkloadService;

use super::{TeardownReport, TeardownService};

async fn loaded_store(counts: RecordCount) -> Arc<FakeLoadStore> {
    let store = Arc::new(FakeLoadStore::default());
    let loaded = WorkloadService::new(store.clone(), store.clone())
        .execute(LogScope::root(), &counts)
        .await;
    assert!(loaded.is_ok());
    store
}

#[tokio::test]
async fn removes_every_generated_row() {
    let store = loaded_store(RecordCount::new(2, 1, 1, 1, 1)).await;
    let service = TeardownService::new(store.clone());

    let report = service.remove_all(LogScope::root()).await;
    assert_eq!(
        report.ok(),
        Some(TeardownReport {
            users: 2,
            groups: 1,
            resources: 2,
        })
    );

    let counts = service.ensure_empty().await;
    assert!(counts.is_ok());
    assert!(counts.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn removes_users_then_groups_then_resources() {
    let store = loaded_store(RecordCount::new(1, 1, 0, 0, 1)).await;
    let service = TeardownService::new(store.clone());
    assert!(service.remove_all(LogScope::root()).await.is_ok());

    let calls = store.calls().await;
    let teardown: Vec<&str> = calls
        .iter()
        .map(String::as_str)
        .filter(|call| call.starts_with("list") || call.starts_with("remove"))
        .collect();
    assert_eq!(
        teardown,
        vec![
            "list user",
            "remove user 0",
            "list group",
            "remove group 0",
            "list resource",
            "remove resource group-resource-0",
        ]
    );
}

#[tokio::test]
async fn teardown_of_empty_store_is_a_no_op() {
    let store = Arc::new(FakeLoadStore::default());
    let service = TeardownService::new(store.clone());

    let report = service.remove_all(LogScope::root()).await;
    assert_eq!(report.ok(), Some(TeardownReport::default()));
}

#[tokio::test]
async fn ensure_empty_reports_leftover_rows() {
    let store = loaded_store(RecordCount::new(1, 0, 0, 0, 0)).await;
    let service = TeardownService::new(store);

    let result = service.ensure_empty().await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn removal_errors_stop_the_pass() {
    let store = loaded_store(RecordCount::new(2, 1, 0, 0, 0)).await;
    store
        .state
        .lock()
        .await
        .fail_on
        .insert("remove user 0".to_owned());
    let service = TeardownService::new(store.clone());

    let result = service.remove_all(LogScope::root()).await;
    assert!(result.is_err());
    assert!(!store.calls().await.iter().any(|call| call == "list group"));
}
