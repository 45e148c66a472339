//! User identity primitives.
//!
//! Authentication brokering is an external collaborator; the domain only
//! deals in the opaque identity the session layer hands it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque user identifier backed by a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Validation errors raised when parsing a [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserIdValidationError {
    /// The supplied string was not a valid UUID.
    #[error("user id must be a valid UUID")]
    InvalidUuid,
}

impl UserId {
    /// Parse a user id from its canonical string form.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserIdValidationError> {
        Uuid::parse_str(raw.as_ref())
            .map(Self)
            .map_err(|_| UserIdValidationError::InvalidUuid)
    }

    /// Wrap an already-validated UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Mint a fresh random identity.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user as the persistence layer stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The user's identity.
    pub id: UserId,
    /// Human-readable display name.
    pub display_name: String,
}

impl User {
    /// Construct a user, rejecting blank display names.
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(UserValidationError::BlankDisplayName);
        }
        if display_name.chars().count() > 64 {
            return Err(UserValidationError::DisplayNameTooLong);
        }
        Ok(Self { id, display_name })
    }
}

/// Validation errors raised when constructing a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    /// Display names must contain at least one non-whitespace character.
    #[error("display name must not be blank")]
    BlankDisplayName,
    /// Display names are capped at 64 characters.
    #[error("display name must not exceed 64 characters")]
    DisplayNameTooLong,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn parses_canonical_uuid() {
        let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    fn rejects_malformed_ids(#[case] raw: &str) {
        assert_eq!(
            UserId::new(raw).expect_err("rejected"),
            UserIdValidationError::InvalidUuid
        );
    }

    #[rstest]
    fn rejects_blank_display_name() {
        let err = User::new(UserId::mint(), "   ").expect_err("blank rejected");
        assert_eq!(err, UserValidationError::BlankDisplayName);
    }

    #[rstest]
    fn rejects_oversized_display_name() {
        let err = User::new(UserId::mint(), "x".repeat(65)).expect_err("too long");
        assert_eq!(err, UserValidationError::DisplayNameTooLong);
    }
}
