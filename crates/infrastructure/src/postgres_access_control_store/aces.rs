use aceload_application::retry_transaction;
use aceload_domain::Principal;

use super::*;

#[derive(Debug, sqlx::FromRow)]
struct AceRow {
    id: i64,
    actions: Option<String>,
}

impl PostgresAccessControlStore {
    pub(super) async fn grant_action_impl(&self, grant: &AceGrant) -> AppResult<ActionList> {
        match self.ace_upsert {
            AceUpsertStrategy::ReadModifyWrite => {
                retry_transaction(self.retry, "grant action", move || {
                    self.merge_action_read_modify_write(grant)
                })
                .await
            }
            AceUpsertStrategy::Native => {
                retry_transaction(self.retry, "grant action", move || {
                    self.merge_action_native(grant)
                })
                .await
            }
        }
    }

    /// Reads the existing entry and appends to it, or inserts a fresh one.
    /// Relies on serializable isolation so that two attempts never both
    /// observe a missing entry and insert twice.
    async fn merge_action_read_modify_write(&self, grant: &AceGrant) -> AppResult<ActionList> {
        let mut transaction = self.begin_serializable().await?;
        let resource_id =
            resolve_surrogate(&mut transaction, EntityKind::Resource, &grant.resource).await?;
        let principal_id = resolve_surrogate(
            &mut transaction,
            grant.principal.kind(),
            grant.principal.key(),
        )
        .await?;

        let lookup = match grant.principal {
            Principal::User(_) => {
                "SELECT id, actions FROM aces WHERE user_id = $1 AND resource_id = $2"
            }
            Principal::Group(_) => {
                "SELECT id, actions FROM aces WHERE group_id = $1 AND resource_id = $2"
            }
        };
        let existing = sqlx::query_as::<_, AceRow>(lookup)
            .bind(principal_id)
            .bind(resource_id)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                store_error(
                    &format!(
                        "failed to look up access for {} on '{}'",
                        grant.principal, grant.resource
                    ),
                    error,
                )
            })?;

        let merged = match existing {
            Some(row) => {
                let merged =
                    ActionList::parse(row.actions.as_deref().unwrap_or_default())?.merged(grant.action);
                sqlx::query("UPDATE aces SET actions = $1 WHERE id = $2")
                    .bind(merged.to_storage())
                    .bind(row.id)
                    .execute(&mut *transaction)
                    .await
                    .map_err(|error| store_error("failed to update access control entry", error))?;
                merged
            }
            None => {
                let merged = ActionList::single(grant.action);
                let insert = match grant.principal {
                    Principal::User(_) => {
                        "INSERT INTO aces (user_id, resource_id, actions) VALUES ($1, $2, $3)"
                    }
                    Principal::Group(_) => {
                        "INSERT INTO aces (group_id, resource_id, actions) VALUES ($1, $2, $3)"
                    }
                };
                sqlx::query(insert)
                    .bind(principal_id)
                    .bind(resource_id)
                    .bind(merged.to_storage())
                    .execute(&mut *transaction)
                    .await
                    .map_err(|error| store_error("failed to insert access control entry", error))?;
                merged
            }
        };

        commit(transaction).await?;
        Ok(merged)
    }

    async fn merge_action_native(&self, grant: &AceGrant) -> AppResult<ActionList> {
        let mut transaction = self.begin_serializable().await?;
        let resource_id =
            resolve_surrogate(&mut transaction, EntityKind::Resource, &grant.resource).await?;
        let principal_id = resolve_surrogate(
            &mut transaction,
            grant.principal.kind(),
            grant.principal.key(),
        )
        .await?;

        let upsert = match grant.principal {
            Principal::User(_) => {
                r#"
                INSERT INTO aces (user_id, resource_id, actions)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, resource_id) DO UPDATE
                SET actions = CASE
                    WHEN aces.actions IS NULL OR aces.actions = '' THEN EXCLUDED.actions
                    ELSE aces.actions || ',' || EXCLUDED.actions
                END
                RETURNING actions
                "#
            }
            Principal::Group(_) => {
                r#"
                INSERT INTO aces (group_id, resource_id, actions)
                VALUES ($1, $2, $3)
                ON CONFLICT (group_id, resource_id) DO UPDATE
                SET actions = CASE
                    WHEN aces.actions IS NULL OR aces.actions = '' THEN EXCLUDED.actions
                    ELSE aces.actions || ',' || EXCLUDED.actions
                END
                RETURNING actions
                "#
            }
        };

        let stored = sqlx::query_scalar::<_, Option<String>>(upsert)
            .bind(principal_id)
            .bind(resource_id)
            .bind(grant.action.as_str())
            .fetch_one(&mut *transaction)
            .await
            .map_err(|error| store_error("failed to upsert access control entry", error))?;

        commit(transaction).await?;
        ActionList::parse(stored.as_deref().unwrap_or_default())
    }
}
