use std::fmt::{Display, Formatter};
use std::str::FromStr;

use aceload_core::{AppError, AppResult, BusinessKey};
use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// Actions an access control entry can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create records in the resource.
    Create,
    /// Read the resource.
    Read,
    /// Update the resource.
    Update,
    /// Delete the resource.
    Delete,
}

impl Action {
    /// Returns the stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns all actions in grant order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Action] = &[Action::Create, Action::Read, Action::Update, Action::Delete];

        ALL
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown action value '{value}'"
            ))),
        }
    }
}

/// Ordered action list stored comma-joined in one access control entry.
///
/// Merging appends in grant order and keeps repeated actions, so granting the
/// same action twice stores it twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionList(Vec<Action>);

impl ActionList {
    /// Creates a list holding a single action.
    #[must_use]
    pub fn single(action: Action) -> Self {
        Self(vec![action])
    }

    /// Parses a stored comma-joined action string. Empty input is an empty list.
    pub fn parse(value: &str) -> AppResult<Self> {
        if value.is_empty() {
            return Ok(Self::default());
        }

        value
            .split(',')
            .map(Action::from_str)
            .collect::<AppResult<Vec<_>>>()
            .map(Self)
    }

    /// Returns the list with `action` appended.
    #[must_use]
    pub fn merged(mut self, action: Action) -> Self {
        self.0.push(action);
        self
    }

    /// Returns whether the list holds no action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether `action` is granted.
    #[must_use]
    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    /// Returns the actions in stored order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        self.0.as_slice()
    }

    /// Returns the comma-joined storage representation.
    #[must_use]
    pub fn to_storage(&self) -> String {
        self.0
            .iter()
            .map(Action::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Display for ActionList {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.to_storage().as_str())
    }
}

/// Subject of an access control entry: exactly one user or one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum Principal {
    /// A user identified by business key.
    User(BusinessKey),
    /// A group identified by business key.
    Group(BusinessKey),
}

impl Principal {
    /// Returns the principal's business key.
    #[must_use]
    pub fn key(&self) -> &BusinessKey {
        match self {
            Self::User(key) | Self::Group(key) => key,
        }
    }

    /// Returns the entity kind the principal is stored as.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Group(_) => EntityKind::Group,
        }
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(key) => write!(formatter, "user {key}"),
            Self::Group(key) => write!(formatter, "group {key}"),
        }
    }
}

/// One action granted from a principal to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AceGrant {
    /// Principal receiving the action.
    pub principal: Principal,
    /// Resource business key.
    pub resource: BusinessKey,
    /// Granted action.
    pub action: Action,
}

impl AceGrant {
    /// Creates a grant.
    #[must_use]
    pub fn new(principal: Principal, resource: BusinessKey, action: Action) -> Self {
        Self {
            principal,
            resource,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use aceload_core::BusinessKey;

    use crate::entity::EntityKind;

    use super::{Action, ActionList, Principal};

    #[test]
    fn principals_report_their_stored_kind() {
        let user = Principal::User(BusinessKey::from_ordinal(4));
        let group = Principal::Group(BusinessKey::from_ordinal(4));

        assert_eq!(user.kind(), EntityKind::User);
        assert_eq!(group.kind(), EntityKind::Group);
        assert_eq!(user.key(), group.key());
        assert_eq!(group.to_string(), "group 4");
    }

    #[test]
    fn actions_round_trip_through_storage_values() {
        for action in Action::all() {
            assert_eq!(Action::from_str(action.as_str()).ok(), Some(*action));
        }
        assert!(Action::from_str("execute").is_err());
    }

    #[test]
    fn merge_appends_in_grant_order() {
        let actions = ActionList::single(Action::Create)
            .merged(Action::Read)
            .merged(Action::Update);

        assert_eq!(actions.to_storage(), "create,read,update");
    }

    #[test]
    fn merge_keeps_repeated_actions() {
        let actions = ActionList::single(Action::Read).merged(Action::Read);
        assert_eq!(actions.to_storage(), "read,read");
    }

    #[test]
    fn parse_reads_stored_lists() {
        let parsed = ActionList::parse("create,delete");
        assert!(parsed.is_ok());

        let parsed = parsed.unwrap_or_default();
        assert!(parsed.contains(Action::Delete));
        assert!(!parsed.contains(Action::Read));
        assert!(ActionList::parse("").unwrap_or_default().is_empty());
        assert!(ActionList::parse("create,,read").is_err());
    }
}
