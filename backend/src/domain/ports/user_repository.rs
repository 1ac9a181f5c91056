//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{Email, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established or was lost.
        Connection { message: String } => "user repository connection failed: {message}",
        /// A NOT NULL, foreign key, unique or check constraint rejected the write.
        Constraint { message: String } => "user repository constraint violated: {message}",
        /// An update targeted a user row that no longer exists.
        Missing { id: i64 } => "user {id} does not exist",
        /// A re-saved email refers to a row that no longer exists.
        EmailMissing { id: i64 } => "email {id} does not exist",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
    }
}

/// Identity-keyed CRUD over users, cascading to their emails.
///
/// Every operation runs as one atomic unit: a user write and the writes of
/// its attached emails commit or fail together.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a transient user or update a persistent one, together with
    /// every attached email.
    ///
    /// Transient emails are inserted and linked to the user; persistent ones
    /// are updated in place. Stored emails that are not attached are left
    /// untouched. Returns the user with every generated id populated and the
    /// attached emails in their original order.
    async fn save(&self, user: &User) -> Result<User, UserPersistenceError>;

    /// Fetch a user by identifier without loading its emails.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch every user ordered by identifier, without emails.
    async fn find_all(&self) -> Result<Vec<User>, UserPersistenceError>;

    /// Report whether a user row exists.
    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError>;

    /// Number of stored users.
    async fn count(&self) -> Result<u64, UserPersistenceError>;

    /// Delete a user row and every email it owns.
    ///
    /// Returns `true` when a row was removed; deleting an absent id is a
    /// no-op that returns `false`.
    async fn delete_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError>;

    /// Delete a user and its emails.
    ///
    /// Transient users and users whose row is already gone are ignored.
    async fn delete(&self, user: &User) -> Result<(), UserPersistenceError> {
        match user.id() {
            Some(id) => self.delete_by_id(&id).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Load the emails owned by a user in insertion order.
    ///
    /// Returns an empty list for users without emails and for unknown ids.
    async fn list_emails_for_user(&self, id: &UserId) -> Result<Vec<Email>, UserPersistenceError>;
}
