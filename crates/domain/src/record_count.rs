use std::fmt::{Display, Formatter};

use aceload_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Number of distinct record types generated per iteration.
pub const RECORD_TYPE_COUNT: usize = 5;

/// Record types whose counts make up one iteration's dataset shape.
///
/// The declaration order defines the selector bit of each type in the
/// iteration schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Users created with ordinal business keys.
    Users,
    /// Groups created with ordinal business keys.
    Groups,
    /// Member slots filled per group.
    Members,
    /// Resources granted to every user.
    UserPermissions,
    /// Resources granted to every group.
    GroupPermissions,
}

impl RecordType {
    /// Returns all record types in selector-bit order.
    #[must_use]
    pub fn all() -> &'static [Self; RECORD_TYPE_COUNT] {
        const ALL: &[RecordType; RECORD_TYPE_COUNT] = &[
            RecordType::Users,
            RecordType::Groups,
            RecordType::Members,
            RecordType::UserPermissions,
            RecordType::GroupPermissions,
        ];

        ALL
    }

    /// Returns the selector bit position of this record type.
    #[must_use]
    pub fn bit(self) -> u32 {
        match self {
            Self::Users => 0,
            Self::Groups => 1,
            Self::Members => 2,
            Self::UserPermissions => 3,
            Self::GroupPermissions => 4,
        }
    }

    /// Returns a stable display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Members => "members",
            Self::UserPermissions => "user-permissions",
            Self::GroupPermissions => "group-permissions",
        }
    }
}

/// Record counts describing one iteration's dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordCount {
    /// Number of users.
    pub users: usize,
    /// Number of groups.
    pub groups: usize,
    /// Number of member slots per group.
    pub members: usize,
    /// Number of resources granted to every user.
    pub user_permissions: usize,
    /// Number of resources granted to every group.
    pub group_permissions: usize,
}

impl RecordCount {
    /// Creates a record count tuple.
    #[must_use]
    pub fn new(
        users: usize,
        groups: usize,
        members: usize,
        user_permissions: usize,
        group_permissions: usize,
    ) -> Self {
        Self {
            users,
            groups,
            members,
            user_permissions,
            group_permissions,
        }
    }

    /// Returns the count for one record type.
    #[must_use]
    pub fn get(&self, record_type: RecordType) -> usize {
        match record_type {
            RecordType::Users => self.users,
            RecordType::Groups => self.groups,
            RecordType::Members => self.members,
            RecordType::UserPermissions => self.user_permissions,
            RecordType::GroupPermissions => self.group_permissions,
        }
    }

    /// Returns a mutable reference to the count for one record type.
    pub fn get_mut(&mut self, record_type: RecordType) -> &mut usize {
        match record_type {
            RecordType::Users => &mut self.users,
            RecordType::Groups => &mut self.groups,
            RecordType::Members => &mut self.members,
            RecordType::UserPermissions => &mut self.user_permissions,
            RecordType::GroupPermissions => &mut self.group_permissions,
        }
    }

    /// Returns whether every count is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        RecordType::all()
            .iter()
            .all(|record_type| self.get(*record_type) == 0)
    }

    /// Checks that the tuple describes a dataset that can actually be built.
    pub fn validate(&self) -> AppResult<()> {
        if self.members > 0 && self.groups == 0 {
            return Err(AppError::Validation(
                "members per group require at least one group".to_owned(),
            ));
        }

        if self.members > 0 && self.users == 0 {
            return Err(AppError::Validation(
                "members per group require at least one user".to_owned(),
            ));
        }

        if self.members > self.users {
            return Err(AppError::Validation(format!(
                "members per group ({}) must not exceed users ({})",
                self.members, self.users
            )));
        }

        if self.user_permissions > 0 && self.users == 0 {
            return Err(AppError::Validation(
                "user permissions require at least one user".to_owned(),
            ));
        }

        if self.group_permissions > 0 && self.groups == 0 {
            return Err(AppError::Validation(
                "group permissions require at least one group".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns whether the tuple passes [`RecordCount::validate`].
    #[must_use]
    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Display for RecordCount {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{{users: {}, groups: {}, members: {}, user-permissions: {}, group-permissions: {}}}",
            self.users, self.groups, self.members, self.user_permissions, self.group_permissions
        )
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{RecordCount, RecordType};

    #[test]
    fn empty_tuple_is_sane() {
        assert!(RecordCount::default().is_sane());
    }

    #[test]
    fn members_without_groups_are_rejected() {
        assert!(!RecordCount::new(5, 0, 1, 0, 0).is_sane());
    }

    #[test]
    fn members_without_users_are_rejected() {
        assert!(!RecordCount::new(0, 3, 1, 0, 0).is_sane());
    }

    #[test]
    fn members_beyond_users_are_rejected() {
        let result = RecordCount::new(2, 1, 3, 0, 0).validate();
        assert!(result.is_err());
    }

    #[test]
    fn permissions_require_their_principals() {
        assert!(!RecordCount::new(0, 1, 0, 1, 0).is_sane());
        assert!(!RecordCount::new(1, 0, 0, 0, 1).is_sane());
        assert!(RecordCount::new(2, 1, 1, 1, 1).is_sane());
    }

    #[test]
    fn display_lists_every_record_type() {
        assert_eq!(
            RecordCount::new(1, 2, 3, 4, 5).to_string(),
            "{users: 1, groups: 2, members: 3, user-permissions: 4, group-permissions: 5}"
        );
    }

    #[test]
    fn accessors_follow_field_layout() {
        let mut counts = RecordCount::default();
        for (offset, record_type) in RecordType::all().iter().enumerate() {
            *counts.get_mut(*record_type) = offset + 1;
        }

        assert_eq!(counts, RecordCount::new(1, 2, 3, 4, 5));
        assert!(!counts.is_empty());
    }

    proptest! {
        #[test]
        fn members_without_groups_never_validate(
            users in 0_usize..100,
            members in 1_usize..100,
            user_permissions in 0_usize..100,
        ) {
            let counts = RecordCount::new(users, 0, members, user_permissions, 0);
            prop_assert!(!counts.is_sane());
        }
    }
}
