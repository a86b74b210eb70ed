use std::sync::Arc;

use aceload_core::{AppError, BusinessKey};
use aceload_domain::{Action, Principal, RecordCount};

use crate::test_support::FakeLoadStore;
use crate::timing::LogScope;

use super::WorkloadService;

fn service(store: &Arc<FakeLoadStore>) -> WorkloadService {
    WorkloadService::new(store.clone(), store.clone())
}

fn key(value: &str) -> BusinessKey {
    BusinessKey::new(value).unwrap_or_else(|_| BusinessKey::from_ordinal(0))
}

#[tokio::test]
async fn users_only_tuple_creates_ordinal_users() {
    let store = Arc::new(FakeLoadStore::default());
    let report = service(&store)
        .execute(LogScope::root(), &RecordCount::new(3, 0, 0, 0, 0))
        .await;
    assert!(report.is_ok());

    let state = store.state.lock().await;
    let users: Vec<&str> = state.users.iter().map(BusinessKey::as_str).collect();
    assert_eq!(users, vec!["0", "1", "2"]);
    assert!(state.groups.is_empty());
    assert!(state.aces.is_empty());
}

#[tokio::test]
async fn steps_run_in_dependency_order() {
    let store = Arc::new(FakeLoadStore::default());
    let report = service(&store)
        .execute(LogScope::root(), &RecordCount::new(1, 1, 1, 1, 1))
        .await;
    assert!(report.is_ok());

    let calls = store.calls().await;
    let position = |label: &str| calls.iter().position(|call| call == label);
    assert!(position("add user 0") < position("add group 0"));
    assert!(position("add group 0") < position("add membership 0->0"));
    assert!(position("add membership 0->0") < position("add resource user-resource-0"));
    assert!(position("add resource user-resource-0") < position("add resource group-resource-0"));
    assert!(position("add resource group-resource-0").is_some());
}

#[tokio::test]
async fn memberships_rotate_through_one_shared_user_counter() {
    let store = Arc::new(FakeLoadStore::default());
    let report = service(&store)
        .execute(LogScope::root(), &RecordCount::new(3, 3, 2, 0, 0))
        .await;
    assert_eq!(report.map(|report| report.memberships).ok(), Some(6));

    let state = store.state.lock().await;
    let assignments: Vec<(&str, &str)> = state
        .memberships
        .iter()
        .map(|(user, group)| (user.as_str(), group.as_str()))
        .collect();
    assert_eq!(
        assignments,
        vec![
            ("0", "0"),
            ("1", "0"),
            ("2", "1"),
            ("0", "1"),
            ("1", "2"),
            ("2", "2"),
        ]
    );
}

#[tokio::test]
async fn each_action_is_granted_in_its_own_call() {
    let store = Arc::new(FakeLoadStore::default());
    let report = service(&store)
        .execute(LogScope::root(), &RecordCount::new(2, 0, 0, 1, 0))
        .await;
    assert_eq!(report.map(|report| report.grants).ok(), Some(8));

    let calls = store.calls().await;
    let grants: Vec<&String> = calls
        .iter()
        .filter(|call| call.starts_with("grant user 1"))
        .collect();
    assert_eq!(
        grants,
        vec![
            "grant user 1 user-resource-0 create",
            "grant user 1 user-resource-0 read",
            "grant user 1 user-resource-0 update",
            "grant user 1 user-resource-0 delete",
        ]
    );

    let state = store.state.lock().await;
    let entry = state
        .aces
        .get(&(Principal::User(key("1")), key("user-resource-0")))
        .cloned()
        .unwrap_or_default();
    assert_eq!(entry.actions(), Action::all());
}

#[tokio::test]
async fn group_permissions_target_groups() {
    let store = Arc::new(FakeLoadStore::default());
    let report = service(&store)
        .execute(LogScope::root(), &RecordCount::new(0, 2, 0, 0, 1))
        .await;
    assert!(report.is_ok());

    let state = store.state.lock().await;
    assert!(state.resources.contains(&key("group-resource-0")));
    assert!(
        state
            .aces
            .contains_key(&(Principal::Group(key("1")), key("group-resource-0")))
    );
    assert_eq!(state.aces.len(), 2);
}

#[tokio::test]
async fn insane_counts_are_rejected_before_any_write() {
    let store = Arc::new(FakeLoadStore::default());
    let result = service(&store)
        .execute(LogScope::root(), &RecordCount::new(0, 0, 1, 0, 0))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn store_errors_abort_remaining_steps() {
    let store = Arc::new(FakeLoadStore::failing_on(&["add group 0"]).await);
    let result = service(&store)
        .execute(LogScope::root(), &RecordCount::new(2, 2, 1, 0, 0))
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    let calls = store.calls().await;
    assert_eq!(calls.last().map(String::as_str), Some("add group 0"));
    assert!(!calls.iter().any(|call| call.starts_with("add membership")));
}
