use aceload_application::retry_transaction;

use super::*;

impl PostgresAccessControlStore {
    pub(super) async fn add_user_impl(&self, user: &NewUser) -> AppResult<()> {
        retry_transaction(self.retry, "add user", move || self.insert_user(user)).await
    }

    async fn insert_user(&self, user: &NewUser) -> AppResult<()> {
        let mut transaction = self.begin_serializable().await?;

        sqlx::query(
            r#"
            INSERT INTO users (uid, passwordhash, utype, description, is_remote)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.key.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.user_type.as_str())
        .bind(user.description.as_str())
        .bind(user.is_remote)
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error(&format!("failed to insert user '{}'", user.key), error))?;

        commit(transaction).await
    }

    pub(super) async fn add_group_impl(&self, group: &NewGroup) -> AppResult<()> {
        retry_transaction(self.retry, "add group", move || self.insert_group(group)).await
    }

    async fn insert_group(&self, group: &NewGroup) -> AppResult<()> {
        let mut transaction = self.begin_serializable().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (gid, description)
            VALUES ($1, $2)
            "#,
        )
        .bind(group.key.as_str())
        .bind(group.description.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| store_error(&format!("failed to insert group '{}'", group.key), error))?;

        commit(transaction).await
    }

    pub(super) async fn add_resource_impl(&self, resource: &NewResource) -> AppResult<()> {
        retry_transaction(self.retry, "add resource", move || {
            self.insert_resource(resource)
        })
        .await
    }

    async fn insert_resource(&self, resource: &NewResource) -> AppResult<()> {
        let mut transaction = self.begin_serializable().await?;

        sqlx::query(
            r#"
            INSERT INTO resources (rid, description)
            VALUES ($1, $2)
            "#,
        )
        .bind(resource.key.as_str())
        .bind(resource.description.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            store_error(
                &format!("failed to insert resource '{}'", resource.key),
                error,
            )
        })?;

        commit(transaction).await
    }

    pub(super) async fn add_membership_impl(
        &self,
        user: &BusinessKey,
        group: &BusinessKey,
    ) -> AppResult<()> {
        retry_transaction(self.retry, "add membership", move || {
            self.insert_membership(user, group)
        })
        .await
    }

    async fn insert_membership(&self, user: &BusinessKey, group: &BusinessKey) -> AppResult<()> {
        let mut transaction = self.begin_serializable().await?;
        let user_id = resolve_surrogate(&mut transaction, EntityKind::User, user).await?;
        let group_id = resolve_surrogate(&mut transaction, EntityKind::Group, group).await?;

        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            store_error(
                &format!("failed to add user '{user}' to group '{group}'"),
                error,
            )
        })?;

        commit(transaction).await
    }
}
