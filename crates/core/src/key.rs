use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Human-readable identifier used for lookups, distinct from the
/// store-assigned surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessKey(String);

impl BusinessKey {
    /// Creates a validated business key.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "business key must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Creates the business key for a generated ordinal, e.g. `"7"`.
    #[must_use]
    pub fn from_ordinal(ordinal: usize) -> Self {
        Self(ordinal.to_string())
    }

    /// Returns a new key of the form `{prefix}-{self}`.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self(format!("{prefix}-{}", self.0))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BusinessKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<BusinessKey> for String {
    fn from(value: BusinessKey) -> Self {
        value.0
    }
}
