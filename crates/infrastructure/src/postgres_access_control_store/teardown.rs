use aceload_application::retry_transaction;
use tracing::warn;

use super::*;

#[derive(Debug, sqlx::FromRow)]
struct KeyRow {
    id: i64,
    key: Option<String>,
}

impl PostgresAccessControlStore {
    pub(super) async fn list_keys_impl(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>> {
        retry_transaction(self.retry, "list keys", move || self.select_keys(kind)).await
    }

    /// Lists valid business keys. Rows whose stored key is missing or not a
    /// valid business key cannot be named later, so they are deleted by
    /// surrogate key in the same transaction.
    async fn select_keys(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>> {
        let query = match kind {
            EntityKind::User => "SELECT id, uid AS key FROM users ORDER BY uid",
            EntityKind::Group => "SELECT id, gid AS key FROM groups ORDER BY gid",
            EntityKind::Resource => "SELECT id, rid AS key FROM resources ORDER BY rid",
        };

        let mut transaction = self.begin_serializable().await?;
        let rows = sqlx::query_as::<_, KeyRow>(query)
            .fetch_all(&mut *transaction)
            .await
            .map_err(|error| store_error(&format!("failed to list {kind} keys"), error))?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            match row.key.map(BusinessKey::new) {
                Some(Ok(key)) => keys.push(key),
                _ => {
                    warn!(kind = %kind, id = row.id, "removing row without a valid business key");
                    delete_by_surrogate(&mut transaction, kind, row.id).await?;
                }
            }
        }
        commit(transaction).await?;

        Ok(keys)
    }

    pub(super) async fn remove_entity_impl(
        &self,
        kind: EntityKind,
        key: &BusinessKey,
    ) -> AppResult<()> {
        retry_transaction(self.retry, "remove entity", move || {
            self.delete_entity(kind, key)
        })
        .await
    }

    /// Deletes dependent membership and access rows before the entity row
    /// itself. An entity that is already gone is not an error.
    async fn delete_entity(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()> {
        let mut transaction = self.begin_serializable().await?;
        if let Some(id) = find_surrogate(&mut transaction, kind, key).await? {
            delete_by_surrogate(&mut transaction, kind, id).await?;
        }

        commit(transaction).await
    }

    pub(super) async fn count_rows_impl(&self) -> AppResult<TableCounts> {
        retry_transaction(self.retry, "count rows", move || self.select_counts()).await
    }

    async fn select_counts(&self) -> AppResult<TableCounts> {
        let mut transaction = self.begin_serializable().await?;
        let mut counts = [0_u64; 5];
        let tables = ["users", "groups", "user_groups", "resources", "aces"];
        for (count, table) in counts.iter_mut().zip(tables) {
            let rows = sqlx::query_scalar::<_, i64>(&format!("SELECT count(*) FROM {table}"))
                .fetch_one(&mut *transaction)
                .await
                .map_err(|error| store_error(&format!("failed to count {table}"), error))?;
            *count = u64::try_from(rows).unwrap_or_default();
        }
        commit(transaction).await?;

        let [users, groups, memberships, resources, aces] = counts;
        Ok(TableCounts {
            users,
            groups,
            memberships,
            resources,
            aces,
        })
    }
}

async fn delete_by_surrogate(
    transaction: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    id: i64,
) -> AppResult<()> {
    let statements: &[&str] = match kind {
        EntityKind::User => &[
            "DELETE FROM user_groups WHERE user_id = $1",
            "DELETE FROM aces WHERE user_id = $1",
            "DELETE FROM users WHERE id = $1",
        ],
        EntityKind::Group => &[
            "DELETE FROM user_groups WHERE group_id = $1",
            "DELETE FROM aces WHERE group_id = $1",
            "DELETE FROM groups WHERE id = $1",
        ],
        EntityKind::Resource => &[
            "DELETE FROM aces WHERE resource_id = $1",
            "DELETE FROM resources WHERE id = $1",
        ],
    };

    for statement in statements {
        sqlx::query(statement)
            .bind(id)
            .execute(&mut **transaction)
            .await
            .map_err(|error| store_error(&format!("failed to remove {kind} row {id}"), error))?;
    }

    Ok(())
}
