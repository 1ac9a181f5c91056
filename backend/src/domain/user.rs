//! User aggregate: identity, names and the owned email collection.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::email::{Email, EmailDto};

/// Maximum number of characters accepted for names and email addresses.
///
/// Mirrors the `VARCHAR(255)` columns created by the schema migrations.
pub const TEXT_COLUMN_MAX: usize = 255;

/// Validation errors returned while building users and emails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    NonPositiveId { value: i64 },
    NameTooLong { max: usize },
    EmptyEmail,
    EmailTooLong { max: usize },
    /// A decoded email carried an id without an owner, or an owner without an id.
    EmailOwnershipMismatch,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveId { value } => {
                write!(f, "identifier must be positive, got {value}")
            }
            Self::NameTooLong { max } => write!(f, "name must be at most {max} characters"),
            Self::EmptyEmail => write!(f, "email address must not be empty"),
            Self::EmailTooLong { max } => {
                write!(f, "email address must be at most {max} characters")
            }
            Self::EmailOwnershipMismatch => {
                write!(f, "email id and owning user id must be set together")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Sequence-generated user identifier.
///
/// Values come from the `user_seq` sequence and start at 1, so zero and
/// negative values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Validate and wrap a raw identifier.
    pub fn new(value: i64) -> Result<Self, UserValidationError> {
        if value <= 0 {
            return Err(UserValidationError::NonPositiveId { value });
        }
        Ok(Self(value))
    }

    /// Raw identifier as stored in the `users.id` column.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// First or last name of a user.
///
/// Any text is accepted (including the empty string) as long as it fits the
/// backing column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonName(String);

impl PersonName {
    /// Validate and construct a [`PersonName`] from owned input.
    pub fn new(name: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(name.into())
    }

    fn from_owned(name: String) -> Result<Self, UserValidationError> {
        if name.chars().count() > TEXT_COLUMN_MAX {
            return Err(UserValidationError::NameTooLong {
                max: TEXT_COLUMN_MAX,
            });
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<PersonName> for String {
    fn from(value: PersonName) -> Self {
        value.0
    }
}

impl TryFrom<String> for PersonName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// A person owning zero or more email addresses.
///
/// ## Invariants
/// - `id` is `None` until the user is first saved and is never chosen by the
///   caller afterwards.
/// - `emails` keeps the order in which addresses were attached.
/// - Users returned by lookups carry no emails; load them explicitly through
///   [`UserRepository::list_emails_for_user`](crate::domain::ports::UserRepository::list_emails_for_user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    id: Option<UserId>,
    first_name: PersonName,
    last_name: PersonName,
    emails: Vec<Email>,
}

impl User {
    /// Build a transient user without emails.
    pub fn new(first_name: PersonName, last_name: PersonName) -> Self {
        Self {
            id: None,
            first_name,
            last_name,
            emails: Vec::new(),
        }
    }

    /// Fallible constructor validating both names.
    pub fn try_from_strings(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::new(
            PersonName::new(first_name)?,
            PersonName::new(last_name)?,
        ))
    }

    /// Rebuild a persistent user from stored columns.
    pub(crate) fn from_row(id: UserId, first_name: PersonName, last_name: PersonName) -> Self {
        Self {
            id: Some(id),
            first_name,
            last_name,
            emails: Vec::new(),
        }
    }

    /// Replace the attached email collection.
    #[must_use]
    pub fn with_emails(mut self, emails: Vec<Email>) -> Self {
        self.emails = emails;
        self
    }

    /// Append an email to the attached collection.
    pub fn add_email(&mut self, email: Email) {
        self.emails.push(email);
    }

    /// Generated identifier, `None` while transient.
    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    /// Whether the user has been saved at least once.
    pub fn is_persistent(&self) -> bool {
        self.id.is_some()
    }

    pub fn first_name(&self) -> &PersonName {
        &self.first_name
    }

    pub fn last_name(&self) -> &PersonName {
        &self.last_name
    }

    /// Emails attached to this value, in insertion order.
    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    /// Mutable access to the attached emails, e.g. to change an address
    /// before re-saving.
    pub fn emails_mut(&mut self) -> &mut Vec<Email> {
        &mut self.emails
    }

    pub fn set_first_name(&mut self, first_name: PersonName) {
        self.first_name = first_name;
    }

    pub fn set_last_name(&mut self, last_name: PersonName) {
        self.last_name = last_name;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    #[serde(default)]
    id: Option<i64>,
    #[serde(alias = "first_name")]
    first_name: String,
    #[serde(alias = "last_name")]
    last_name: String,
    #[serde(default)]
    emails: Vec<EmailDto>,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        let User {
            id,
            first_name,
            last_name,
            emails,
        } = value;
        Self {
            id: id.map(i64::from),
            first_name: first_name.into(),
            last_name: last_name.into(),
            emails: emails.into_iter().map(EmailDto::from).collect(),
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        let id = value.id.map(UserId::new).transpose()?;
        let emails = value
            .emails
            .into_iter()
            .map(Email::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            first_name: PersonName::new(value.first_name)?,
            last_name: PersonName::new(value.last_name)?,
            emails,
        })
    }
}
