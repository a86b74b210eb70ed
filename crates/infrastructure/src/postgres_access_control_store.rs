//! PostgreSQL-backed access-control store.
//!
//! Every port method runs as one serializable transaction, re-executed from
//! scratch through the retrying executor when the store reports a
//! serialization conflict.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use aceload_application::{
    AceRepository, EntityRepository, QueryProbeRepository, ResourceGrant, RetryPolicy,
    TableCounts, TeardownRepository,
};
use aceload_core::{AppError, AppResult, BusinessKey};
use aceload_domain::{AceGrant, ActionList, EntityKind, NewGroup, NewResource, NewUser};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::store_error::store_error;

mod aces;
mod entities;
mod probe;
mod teardown;

/// How an action is merged into an access control entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AceUpsertStrategy {
    /// Look up the entry, then update or insert it, inside one transaction.
    #[default]
    ReadModifyWrite,
    /// One `INSERT ... ON CONFLICT ... DO UPDATE` statement.
    Native,
}

impl AceUpsertStrategy {
    /// Returns the configuration name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadModifyWrite => "read-modify-write",
            Self::Native => "native",
        }
    }
}

impl Display for AceUpsertStrategy {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for AceUpsertStrategy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read-modify-write" => Ok(Self::ReadModifyWrite),
            "native" => Ok(Self::Native),
            _ => Err(AppError::Validation(format!(
                "unknown ace upsert strategy '{value}', expected 'read-modify-write' or 'native'"
            ))),
        }
    }
}

/// PostgreSQL implementation of every load port.
#[derive(Clone)]
pub struct PostgresAccessControlStore {
    pool: PgPool,
    retry: RetryPolicy,
    ace_upsert: AceUpsertStrategy,
}

impl PostgresAccessControlStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool, retry: RetryPolicy, ace_upsert: AceUpsertStrategy) -> Self {
        Self {
            pool,
            retry,
            ace_upsert,
        }
    }

    async fn begin_serializable(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| store_error("failed to begin transaction", error))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to set isolation level", error))?;

        Ok(transaction)
    }
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| store_error("failed to commit transaction", error))
}

fn key_column_query(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "SELECT id FROM users WHERE uid = $1",
        EntityKind::Group => "SELECT id FROM groups WHERE gid = $1",
        EntityKind::Resource => "SELECT id FROM resources WHERE rid = $1",
    }
}

/// Resolves a business key to its surrogate key by exact match.
async fn find_surrogate(
    transaction: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    key: &BusinessKey,
) -> AppResult<Option<i64>> {
    sqlx::query_scalar::<_, i64>(key_column_query(kind))
        .bind(key.as_str())
        .fetch_optional(&mut **transaction)
        .await
        .map_err(|error| store_error(&format!("failed to look up {kind} '{key}'"), error))
}

async fn resolve_surrogate(
    transaction: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    key: &BusinessKey,
) -> AppResult<i64> {
    find_surrogate(transaction, kind, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{kind} '{key}' does not exist")))
}

#[async_trait]
impl EntityRepository for PostgresAccessControlStore {
    async fn add_user(&self, user: &NewUser) -> AppResult<()> {
        self.add_user_impl(user).await
    }

    async fn add_group(&self, group: &NewGroup) -> AppResult<()> {
        self.add_group_impl(group).await
    }

    async fn add_resource(&self, resource: &NewResource) -> AppResult<()> {
        self.add_resource_impl(resource).await
    }

    async fn add_membership(&self, user: &BusinessKey, group: &BusinessKey) -> AppResult<()> {
        self.add_membership_impl(user, group).await
    }
}

#[async_trait]
impl AceRepository for PostgresAccessControlStore {
    async fn grant_action(&self, grant: &AceGrant) -> AppResult<ActionList> {
        self.grant_action_impl(grant).await
    }
}

#[async_trait]
impl TeardownRepository for PostgresAccessControlStore {
    async fn list_keys(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>> {
        self.list_keys_impl(kind).await
    }

    async fn remove_entity(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()> {
        self.remove_entity_impl(kind, key).await
    }

    async fn count_rows(&self) -> AppResult<TableCounts> {
        self.count_rows_impl().await
    }
}

#[async_trait]
impl QueryProbeRepository for PostgresAccessControlStore {
    async fn list_user_keys(&self) -> AppResult<Vec<BusinessKey>> {
        self.list_user_keys_impl().await
    }

    async fn resource_grants_for_user(&self, user: &BusinessKey) -> AppResult<Vec<ResourceGrant>> {
        self.resource_grants_for_user_impl(user).await
    }
}

#[cfg(test)]
mod tests;
