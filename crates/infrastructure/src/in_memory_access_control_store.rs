//! In-memory access-control store.
//!
//! Port calls write straight into the committed tables, which are indexed by
//! business key. Table methods validate before they write, so a failed body
//! leaves nothing behind. Serialization failures can be injected at commit
//! time to exercise the retrying executor; only those attempts run against a
//! throwaway copy.

use std::sync::atomic::{AtomicU32, Ordering};

use aceload_application::{
    AceRepository, EntityRepository, QueryProbeRepository, ResourceGrant, RetryPolicy,
    TableCounts, TeardownRepository, retry_transaction,
};
use aceload_core::{AppError, AppResult, BusinessKey};
use aceload_domain::{AceGrant, ActionList, EntityKind, NewGroup, NewResource, NewUser};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

mod tables;

use tables::Tables;

/// In-memory implementation of every load port.
#[derive(Debug, Default)]
pub struct InMemoryAccessControlStore {
    tables: Mutex<Tables>,
    injected_failures: AtomicU32,
    retry: RetryPolicy,
}

impl InMemoryAccessControlStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            injected_failures: AtomicU32::new(0),
            retry,
        }
    }

    /// Makes the next `count` commits fail with a serialization conflict after
    /// their body has run.
    pub fn inject_serialization_failures(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    async fn transact<T, F>(&self, operation: &str, body: F) -> AppResult<T>
    where
        F: Fn(&mut Tables) -> AppResult<T>,
    {
        let body = &body;
        retry_transaction(self.retry, operation, move || self.attempt(operation, body)).await
    }

    async fn attempt<T, F>(&self, operation: &str, body: &F) -> AppResult<T>
    where
        F: Fn(&mut Tables) -> AppResult<T>,
    {
        let mut committed = self.tables.lock().await;

        if self.take_injected_failure() {
            let mut discarded = committed.clone();
            body(&mut discarded)?;
            debug!(operation, "aborting commit with injected serialization failure");
            return Err(AppError::Serialization(format!(
                "injected serialization failure during {operation}"
            )));
        }

        body(&mut committed)
    }

    async fn read<T>(&self, body: impl FnOnce(&Tables) -> AppResult<T>) -> AppResult<T> {
        let tables = self.tables.lock().await;
        body(&tables)
    }

    fn take_injected_failure(&self) -> bool {
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl EntityRepository for InMemoryAccessControlStore {
    async fn add_user(&self, user: &NewUser) -> AppResult<()> {
        self.transact("add user", |tables| tables.insert_user(user))
            .await
    }

    async fn add_group(&self, group: &NewGroup) -> AppResult<()> {
        self.transact("add group", |tables| tables.insert_group(group))
            .await
    }

    async fn add_resource(&self, resource: &NewResource) -> AppResult<()> {
        self.transact("add resource", |tables| tables.insert_resource(resource))
            .await
    }

    async fn add_membership(&self, user: &BusinessKey, group: &BusinessKey) -> AppResult<()> {
        self.transact("add membership", |tables| {
            tables.insert_membership(user, group)
        })
        .await
    }
}

#[async_trait]
impl AceRepository for InMemoryAccessControlStore {
    async fn grant_action(&self, grant: &AceGrant) -> AppResult<ActionList> {
        self.transact("grant action", |tables| tables.merge_action(grant))
            .await
    }
}

#[async_trait]
impl TeardownRepository for InMemoryAccessControlStore {
    async fn list_keys(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>> {
        self.transact("list keys", |tables| Ok(tables.keys(kind)))
            .await
    }

    async fn remove_entity(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()> {
        self.transact("remove entity", |tables| {
            tables.delete(kind, key);
            Ok(())
        })
        .await
    }

    async fn count_rows(&self) -> AppResult<TableCounts> {
        self.transact("count rows", |tables| Ok(tables.counts()))
            .await
    }
}

#[async_trait]
impl QueryProbeRepository for InMemoryAccessControlStore {
    async fn list_user_keys(&self) -> AppResult<Vec<BusinessKey>> {
        self.read(|tables| Ok(tables.keys(EntityKind::User))).await
    }

    async fn resource_grants_for_user(&self, user: &BusinessKey) -> AppResult<Vec<ResourceGrant>> {
        self.read(|tables| Ok(tables.grants_for_user(user))).await
    }
}
