//! Generated entity records and their placeholder attribute values.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use aceload_core::{AppError, BusinessKey};
use serde::{Deserialize, Serialize};

use crate::access::Principal;

/// Description stored on every generated entity.
pub const PLACEHOLDER_DESCRIPTION: &str = "some description";

/// Credential hash stored on every generated user.
pub const PLACEHOLDER_PASSWORD_HASH: &str = "$6$rounds=656000$WZdTPdpxUZsDG5PG$6om6ApIm5l5639JNAUmtFD87cIXdWCAVKeJ4zNlhmPKWT3PARF6Ai.HpcjR8SPQSQnqoefBiLaZmPuMFhGhpm0";

/// Stored user account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Interactive account.
    Regular,
    /// Machine account.
    Service,
}

impl UserType {
    /// Returns the stable storage value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Service => "service",
        }
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "regular" => Ok(Self::Regular),
            "service" => Ok(Self::Service),
            _ => Err(AppError::Validation(format!("unknown user type '{value}'"))),
        }
    }
}

/// Entity kinds discovered and removed by teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Users.
    User,
    /// Groups.
    Group,
    /// Resources.
    Resource,
}

impl EntityKind {
    /// Returns a stable display label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Resource => "resource",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// User row to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Business key.
    pub key: BusinessKey,
    /// Stored credential hash.
    pub password_hash: String,
    /// Account type.
    pub user_type: UserType,
    /// Free-form description.
    pub description: String,
    /// Whether the account is managed by a remote directory.
    pub is_remote: bool,
}

impl NewUser {
    /// Builds the generated user for an ordinal.
    #[must_use]
    pub fn placeholder(ordinal: usize) -> Self {
        Self {
            key: BusinessKey::from_ordinal(ordinal),
            password_hash: PLACEHOLDER_PASSWORD_HASH.to_owned(),
            user_type: UserType::Regular,
            description: PLACEHOLDER_DESCRIPTION.to_owned(),
            is_remote: false,
        }
    }
}

/// Group row to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    /// Business key.
    pub key: BusinessKey,
    /// Free-form description.
    pub description: String,
}

impl NewGroup {
    /// Builds the generated group for an ordinal.
    #[must_use]
    pub fn placeholder(ordinal: usize) -> Self {
        Self {
            key: BusinessKey::from_ordinal(ordinal),
            description: PLACEHOLDER_DESCRIPTION.to_owned(),
        }
    }
}

/// Which permission-assignment path created a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOrigin {
    /// Granted to users.
    User,
    /// Granted to groups.
    Group,
}

impl ResourceOrigin {
    /// Returns the generated resource name for an ordinal.
    #[must_use]
    pub fn resource_key(&self, ordinal: usize) -> BusinessKey {
        let prefix = match self {
            Self::User => "user-resource",
            Self::Group => "group-resource",
        };

        BusinessKey::from_ordinal(ordinal).prefixed(prefix)
    }

    /// Returns the principal with the given ordinal on this assignment path.
    #[must_use]
    pub fn principal(&self, ordinal: usize) -> Principal {
        let key = BusinessKey::from_ordinal(ordinal);
        match self {
            Self::User => Principal::User(key),
            Self::Group => Principal::Group(key),
        }
    }
}

/// Resource row to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResource {
    /// Business key.
    pub key: BusinessKey,
    /// Free-form description.
    pub description: String,
}

impl NewResource {
    /// Builds the generated resource for an origin and ordinal.
    #[must_use]
    pub fn placeholder(origin: ResourceOrigin, ordinal: usize) -> Self {
        Self {
            key: origin.resource_key(ordinal),
            description: PLACEHOLDER_DESCRIPTION.to_owned(),
        }
    }
}
