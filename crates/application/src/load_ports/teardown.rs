use std::fmt::{Display, Formatter};

use aceload_core::{AppResult, BusinessKey};
use aceload_domain::EntityKind;
use async_trait::async_trait;

/// Row counts of every generated table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Rows in `users`.
    pub users: u64,
    /// Rows in `groups`.
    pub groups: u64,
    /// Rows in `user_groups`.
    pub memberships: u64,
    /// Rows in `resources`.
    pub resources: u64,
    /// Rows in `aces`.
    pub aces: u64,
}

impl TableCounts {
    /// Returns the number of rows across all tables.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.users
            .saturating_add(self.groups)
            .saturating_add(self.memberships)
            .saturating_add(self.resources)
            .saturating_add(self.aces)
    }

    /// Returns whether every table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Display for TableCounts {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{{users: {}, groups: {}, memberships: {}, resources: {}, aces: {}}}",
            self.users, self.groups, self.memberships, self.resources, self.aces
        )
    }
}

/// Repository port for discovering and deleting generated rows.
#[async_trait]
pub trait TeardownRepository: Send + Sync {
    /// Lists every stored business key of one entity kind.
    async fn list_keys(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>>;

    /// Deletes one entity together with the membership and ACE rows
    /// referencing it.
    async fn remove_entity(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()>;

    /// Counts rows in every generated table.
    async fn count_rows(&self) -> AppResult<TableCounts>;
}
