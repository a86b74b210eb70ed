use aceload_core::{AppResult, BusinessKey};
use aceload_domain::{NewGroup, NewResource, NewUser};
use async_trait::async_trait;

/// Repository port for single-record entity inserts.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Inserts one user row.
    async fn add_user(&self, user: &NewUser) -> AppResult<()>;

    /// Inserts one group row.
    async fn add_group(&self, group: &NewGroup) -> AppResult<()>;

    /// Inserts one resource row.
    async fn add_resource(&self, resource: &NewResource) -> AppResult<()>;

    /// Resolves both business keys and inserts one membership row.
    async fn add_membership(&self, user: &BusinessKey, group: &BusinessKey) -> AppResult<()>;
}
