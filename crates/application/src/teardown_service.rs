//! Teardown orchestrator.
//!
//! Removes every stored user, then every group, then every resource. Each
//! phase first lists the business keys currently stored, so rows left behind
//! by earlier runs are removed as well.

use std::sync::Arc;

use aceload_core::{AppError, AppResult};
use aceload_domain::EntityKind;

use crate::load_ports::{TableCounts, TeardownRepository};
use crate::timing::LogScope;

/// Number of entities removed by one teardown pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Users removed.
    pub users: usize,
    /// Groups removed.
    pub groups: usize,
    /// Resources removed.
    pub resources: usize,
}

/// Application service removing generated data.
#[derive(Clone)]
pub struct TeardownService {
    repository: Arc<dyn TeardownRepository>,
}

impl TeardownService {
    /// Creates a teardown service.
    #[must_use]
    pub fn new(repository: Arc<dyn TeardownRepository>) -> Self {
        Self { repository }
    }

    /// Removes all users, groups and resources, in that order.
    pub async fn remove_all(&self, scope: LogScope) -> AppResult<TeardownReport> {
        let users = scope
            .timed_detail("Remove users", |scope| {
                self.remove_kind(scope, EntityKind::User)
            })
            .await?;
        let groups = scope
            .timed_detail("Remove groups", |scope| {
                self.remove_kind(scope, EntityKind::Group)
            })
            .await?;
        let resources = scope
            .timed_detail("Remove resources", |scope| {
                self.remove_kind(scope, EntityKind::Resource)
            })
            .await?;

        Ok(TeardownReport {
            users,
            groups,
            resources,
        })
    }

    /// Fails unless every generated table is empty.
    pub async fn ensure_empty(&self) -> AppResult<TableCounts> {
        let counts = self.repository.count_rows().await?;
        if !counts.is_empty() {
            return Err(AppError::Internal(format!(
                "teardown left rows behind: {counts}"
            )));
        }

        Ok(counts)
    }

    async fn remove_kind(&self, scope: LogScope, kind: EntityKind) -> AppResult<usize> {
        let keys = self.repository.list_keys(kind).await?;
        for key in &keys {
            scope
                .timed_detail(&format!("Remove {kind} {key}"), |_| {
                    self.repository.remove_entity(kind, key)
                })
                .await?;
        }

        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests;
