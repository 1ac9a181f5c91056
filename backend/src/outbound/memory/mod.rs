//! Process-local `UserRepository` for tests and database-less runs.
//!
//! Mirrors the PostgreSQL adapter's contract: two independent monotonic
//! sequences, cascade delete, insertion-ordered emails and whole-operation
//! atomicity (all validation happens before any state is touched).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Email, EmailAddress, EmailId, PersonName, User, UserId};

#[derive(Debug, Clone)]
struct StoredUser {
    first_name: PersonName,
    last_name: PersonName,
}

#[derive(Debug, Clone)]
struct StoredEmail {
    email: EmailAddress,
    user_id: UserId,
}

#[derive(Debug, Default)]
struct Tables {
    user_seq: i64,
    email_seq: i64,
    users: BTreeMap<UserId, StoredUser>,
    emails: BTreeMap<EmailId, StoredEmail>,
}

impl Tables {
    fn next_user_id(&mut self) -> Result<UserId, UserPersistenceError> {
        self.user_seq += 1;
        UserId::new(self.user_seq).map_err(|err| UserPersistenceError::query(err.to_string()))
    }

    fn next_email_id(&mut self) -> Result<EmailId, UserPersistenceError> {
        self.email_seq += 1;
        EmailId::new(self.email_seq).map_err(|err| UserPersistenceError::query(err.to_string()))
    }

    fn user(&self, id: UserId) -> Option<User> {
        self.users
            .get(&id)
            .map(|row| User::from_row(id, row.first_name.clone(), row.last_name.clone()))
    }

    /// Reject the save before mutating anything, so a failure leaves the
    /// tables exactly as they were.
    fn check_save(&self, user: &User) -> Result<(), UserPersistenceError> {
        if let Some(id) = user.id() {
            if !self.users.contains_key(&id) {
                return Err(UserPersistenceError::missing(id.as_i64()));
            }
        }
        for email in user.emails() {
            if let Some(id) = email.id() {
                if !self.emails.contains_key(&id) {
                    return Err(UserPersistenceError::email_missing(id.as_i64()));
                }
            }
        }
        Ok(())
    }
}

/// In-memory implementation of the `UserRepository` port.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    tables: Mutex<Tables>,
}

impl InMemoryUserRepository {
    /// Create an empty repository; both sequences start at 1.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<User, UserPersistenceError> {
        let mut tables = self.lock();
        tables.check_save(user)?;

        let id = match user.id() {
            Some(id) => id,
            None => tables.next_user_id()?,
        };
        tables.users.insert(
            id,
            StoredUser {
                first_name: user.first_name().clone(),
                last_name: user.last_name().clone(),
            },
        );

        let mut saved = Vec::with_capacity(user.emails().len());
        for email in user.emails() {
            let email_id = match email.id() {
                Some(email_id) => email_id,
                None => tables.next_email_id()?,
            };
            tables.emails.insert(
                email_id,
                StoredEmail {
                    email: email.email().clone(),
                    user_id: id,
                },
            );
            saved.push(Email::from_row(email_id, email.email().clone(), id));
        }

        Ok(
            User::from_row(id, user.first_name().clone(), user.last_name().clone())
                .with_emails(saved),
        )
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.lock().user(*id))
    }

    async fn find_all(&self) -> Result<Vec<User>, UserPersistenceError> {
        let tables = self.lock();
        Ok(tables
            .users
            .keys()
            .filter_map(|id| tables.user(*id))
            .collect())
    }

    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        Ok(self.lock().users.contains_key(id))
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        let total = self.lock().users.len();
        u64::try_from(total).map_err(|err| UserPersistenceError::query(err.to_string()))
    }

    async fn delete_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        let mut tables = self.lock();
        tables.emails.retain(|_, row| row.user_id != *id);
        Ok(tables.users.remove(id).is_some())
    }

    async fn list_emails_for_user(&self, id: &UserId) -> Result<Vec<Email>, UserPersistenceError> {
        let tables = self.lock();
        Ok(tables
            .emails
            .iter()
            .filter(|(_, row)| row.user_id == *id)
            .map(|(email_id, row)| Email::from_row(*email_id, row.email.clone(), row.user_id))
            .collect())
    }
}
