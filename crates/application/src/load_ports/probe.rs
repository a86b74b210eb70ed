use aceload_core::{AppResult, BusinessKey};
use aceload_domain::ActionList;
use async_trait::async_trait;

/// Resource reachable by a user through a direct access control entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrant {
    /// Resource business key.
    pub resource: BusinessKey,
    /// Resource description.
    pub description: String,
    /// Actions granted on the resource.
    pub actions: ActionList,
}

/// Repository port for the read-side probe workload.
#[async_trait]
pub trait QueryProbeRepository: Send + Sync {
    /// Lists every stored user business key.
    async fn list_user_keys(&self) -> AppResult<Vec<BusinessKey>>;

    /// Joins a user's access control entries with their resources.
    async fn resource_grants_for_user(&self, user: &BusinessKey) -> AppResult<Vec<ResourceGrant>>;
}
