use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    str::FromStr,
};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// A server-assigned record identifier.
///
/// Identifiers are opaque, non-empty strings. The backend occasionally emits
/// numeric identifiers; these are accepted and stored in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "String")]
pub struct RecordId(NonEmptyString);

impl RecordId {
    /// Creates a new identifier.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdError`] if the identifier is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidIdError> {
        let id = id.into();
        let trimmed = id.trim();
        NonEmptyString::new(trimmed.to_string())
            .map(Self)
            .map_err(|_| InvalidIdError(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Error returned when an identifier is empty or not a string/number.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid record id '{0}': must be a non-empty string")]
pub struct InvalidIdError(String);

impl TryFrom<serde_json::Value> for RecordId {
    type Error = InvalidIdError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(id) => Self::new(id),
            serde_json::Value::Number(number) => Self::new(number.to_string()),
            other => Err(InvalidIdError(other.to_string())),
        }
    }
}

impl TryFrom<&str> for RecordId {
    type Error = InvalidIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for RecordId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.as_str().to_owned()
    }
}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for RecordId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
