//! Proof types for validated content.
//!
//! These types enforce invariants at construction time. Once you hold a
//! value, you know it satisfies all required constraints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that is never empty (or whitespace-only) after trimming.
///
/// Validation occurs at construction time, so all operations on an existing
/// `NonEmptyString` can assume the content is valid. Conversation messages
/// carry their content as this type: an empty system prompt or an empty
/// user turn is a caller bug, not a runtime state.
///
/// # Serde
///
/// Serializes as a plain JSON string. Deserialization validates
/// non-emptiness and fails if the string is empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("message content must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::ops::Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::NonEmptyString;

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(NonEmptyString::new("").is_err());
        assert!(NonEmptyString::new("   \n\t").is_err());
    }

    #[test]
    fn preserves_content_verbatim() {
        let s = NonEmptyString::new("  padded  ").expect("non-empty");
        assert_eq!(s.as_str(), "  padded  ");
    }

    #[test]
    fn serde_round_trip() {
        let s = NonEmptyString::new("hello").expect("non-empty");
        let json = serde_json::to_string(&s).expect("serialize");
        assert_eq!(json, "\"hello\"");
        let back: NonEmptyString = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, s);
    }

    #[test]
    fn serde_rejects_empty() {
        let result: Result<NonEmptyString, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }
}
