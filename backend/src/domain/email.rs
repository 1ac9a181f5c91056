//! Email addresses owned by a user.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::user::{TEXT_COLUMN_MAX, UserId, UserValidationError};

/// Sequence-generated email identifier drawn from `email_seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EmailId(i64);

impl EmailId {
    /// Validate and wrap a raw identifier.
    pub fn new(value: i64) -> Result<Self, UserValidationError> {
        if value <= 0 {
            return Err(UserValidationError::NonPositiveId { value });
        }
        Ok(Self(value))
    }

    /// Raw identifier as stored in the `emails.id` column.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EmailId> for i64 {
    fn from(value: EmailId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for EmailId {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Non-blank email address text.
///
/// The address is stored verbatim; no syntax check beyond non-blankness and
/// column length is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`] from owned input.
    pub fn new(address: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(address.into())
    }

    fn from_owned(address: String) -> Result<Self, UserValidationError> {
        if address.trim().is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if address.chars().count() > TEXT_COLUMN_MAX {
            return Err(UserValidationError::EmailTooLong {
                max: TEXT_COLUMN_MAX,
            });
        }
        Ok(Self(address))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// One email address belonging to exactly one user.
///
/// ## Invariants
/// - `id` and `user_id` are both `None` while transient and both `Some` once
///   the row is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EmailDto", into = "EmailDto")]
pub struct Email {
    id: Option<EmailId>,
    email: EmailAddress,
    user_id: Option<UserId>,
}

impl Email {
    /// Build a transient email ready to be attached to a user.
    pub fn new(email: EmailAddress) -> Self {
        Self {
            id: None,
            email,
            user_id: None,
        }
    }

    /// Fallible constructor validating the address.
    pub fn try_from_str(email: impl Into<String>) -> Result<Self, UserValidationError> {
        Ok(Self::new(EmailAddress::new(email)?))
    }

    /// Rebuild a persisted email from stored columns.
    pub(crate) fn from_row(id: EmailId, email: EmailAddress, user_id: UserId) -> Self {
        Self {
            id: Some(id),
            email,
            user_id: Some(user_id),
        }
    }

    /// Generated identifier, `None` while transient.
    pub fn id(&self) -> Option<EmailId> {
        self.id
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Owning user, `None` while transient.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn set_email(&mut self, email: EmailAddress) {
        self.email = email;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EmailDto {
    #[serde(default)]
    id: Option<i64>,
    email: String,
    #[serde(default, alias = "user_id")]
    user_id: Option<i64>,
}

impl From<Email> for EmailDto {
    fn from(value: Email) -> Self {
        let Email { id, email, user_id } = value;
        Self {
            id: id.map(i64::from),
            email: email.into(),
            user_id: user_id.map(i64::from),
        }
    }
}

impl TryFrom<EmailDto> for Email {
    type Error = UserValidationError;

    fn try_from(value: EmailDto) -> Result<Self, Self::Error> {
        if value.id.is_some() != value.user_id.is_some() {
            return Err(UserValidationError::EmailOwnershipMismatch);
        }
        Ok(Self {
            id: value.id.map(EmailId::new).transpose()?,
            email: EmailAddress::new(value.email)?,
            user_id: value.user_id.map(UserId::new).transpose()?,
        })
    }
}
