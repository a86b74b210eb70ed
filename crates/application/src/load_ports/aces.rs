use aceload_core::AppResult;
use aceload_domain::{AceGrant, ActionList};
use async_trait::async_trait;

/// Repository port for access control entry upserts.
#[async_trait]
pub trait AceRepository: Send + Sync {
    /// Merges one action into the entry for the grant's principal and resource.
    ///
    /// Resolves both business keys, reads any existing entry, then appends the
    /// action to it or inserts a new entry holding only that action. The whole
    /// sequence must run in one serializable transaction so that a re-executed
    /// attempt never observes its own rolled-back insert and no two entries
    /// exist for the same principal and resource. Returns the stored action
    /// list after the merge.
    async fn grant_action(&self, grant: &AceGrant) -> AppResult<ActionList>;
}
