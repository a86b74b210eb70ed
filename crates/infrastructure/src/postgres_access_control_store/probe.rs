use super::*;

#[derive(Debug, sqlx::FromRow)]
struct ResourceGrantRow {
    rid: Option<String>,
    description: Option<String>,
    actions: Option<String>,
}

impl TryFrom<ResourceGrantRow> for ResourceGrant {
    type Error = AppError;

    fn try_from(row: ResourceGrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            resource: BusinessKey::new(row.rid.unwrap_or_default())?,
            description: row.description.unwrap_or_default(),
            actions: ActionList::parse(row.actions.as_deref().unwrap_or_default())?,
        })
    }
}

impl PostgresAccessControlStore {
    pub(super) async fn list_user_keys_impl(&self) -> AppResult<Vec<BusinessKey>> {
        let keys = sqlx::query_scalar::<_, Option<String>>("SELECT uid FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to list user keys", error))?;

        keys.into_iter().flatten().map(BusinessKey::new).collect()
    }

    pub(super) async fn resource_grants_for_user_impl(
        &self,
        user: &BusinessKey,
    ) -> AppResult<Vec<ResourceGrant>> {
        let rows = sqlx::query_as::<_, ResourceGrantRow>(
            r#"
            SELECT resources.rid, resources.description, aces.actions
            FROM aces
            JOIN users ON users.id = aces.user_id
            JOIN resources ON resources.id = aces.resource_id
            WHERE users.uid = $1
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error(&format!("failed to query grants of user '{user}'"), error))?;

        rows.into_iter().map(ResourceGrant::try_from).collect()
    }
}
