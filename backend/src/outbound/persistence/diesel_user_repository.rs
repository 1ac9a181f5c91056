//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Every write runs in one transaction: a user row and its email rows commit
//! or roll back together. Deleting a user removes its emails first inside the
//! same transaction; the `emails.user_id` foreign key rejects anything that
//! would be left orphaned.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{Email, EmailAddress, EmailId, PersonName, User, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error, map_row_error};
use super::models::{EmailRow, EmailUpdate, NewEmailRow, NewUserRow, UserRow, UserUpdate};
use super::pool::DbPool;
use super::schema::{emails, users};

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Convert a database row to a domain user without emails.
fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let id = UserId::new(row.id).map_err(map_row_error)?;
    let first_name = PersonName::new(row.first_name).map_err(map_row_error)?;
    let last_name = PersonName::new(row.last_name).map_err(map_row_error)?;
    Ok(User::from_row(id, first_name, last_name))
}

/// Convert a database row to a persisted domain email.
fn row_to_email(row: EmailRow) -> Result<Email, UserPersistenceError> {
    let id = EmailId::new(row.id).map_err(map_row_error)?;
    let email = EmailAddress::new(row.email).map_err(map_row_error)?;
    let user_id = UserId::new(row.user_id).map_err(map_row_error)?;
    Ok(Email::from_row(id, email, user_id))
}

/// Insert or update the user row and return its identifier.
async fn write_user_row(
    conn: &mut AsyncPgConnection,
    user: &User,
) -> Result<i64, UserPersistenceError> {
    let first_name = user.first_name().as_ref();
    let last_name = user.last_name().as_ref();

    let Some(id) = user.id() else {
        let new_row = NewUserRow {
            first_name,
            last_name,
        };
        let id = diesel::insert_into(users::table)
            .values(&new_row)
            .returning(users::id)
            .get_result::<i64>(conn)
            .await?;
        return Ok(id);
    };

    let update = UserUpdate {
        first_name,
        last_name,
    };
    let updated_rows = diesel::update(users::table.find(id.as_i64()))
        .set(&update)
        .execute(conn)
        .await?;
    if updated_rows == 0 {
        return Err(UserPersistenceError::missing(id.as_i64()));
    }
    Ok(id.as_i64())
}

/// Insert or update one attached email, linking it to `user_id`.
async fn write_email_row(
    conn: &mut AsyncPgConnection,
    email: &Email,
    user_id: i64,
) -> Result<EmailRow, UserPersistenceError> {
    let address = email.email().as_ref();

    let Some(id) = email.id() else {
        let new_row = NewEmailRow {
            email: address,
            user_id,
        };
        let row = diesel::insert_into(emails::table)
            .values(&new_row)
            .returning(EmailRow::as_returning())
            .get_result(conn)
            .await?;
        return Ok(row);
    };

    let update = EmailUpdate {
        email: address,
        user_id,
    };
    diesel::update(emails::table.find(id.as_i64()))
        .set(&update)
        .returning(EmailRow::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or_else(|| UserPersistenceError::email_missing(id.as_i64()))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn save(&self, user: &User) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (user_id, email_rows) = conn
            .transaction(|conn| {
                async move {
                    let user_id = write_user_row(conn, user).await?;
                    // One statement per email keeps sequence order equal to
                    // attachment order.
                    let mut email_rows = Vec::with_capacity(user.emails().len());
                    for email in user.emails() {
                        email_rows.push(write_email_row(conn, email, user_id).await?);
                    }
                    Ok::<_, UserPersistenceError>((user_id, email_rows))
                }
                .scope_boxed()
            })
            .await?;

        let emails = email_rows
            .into_iter()
            .map(row_to_email)
            .collect::<Result<Vec<_>, _>>()?;
        let id = UserId::new(user_id).map_err(map_row_error)?;
        Ok(
            User::from_row(id, user.first_name().clone(), user.last_name().clone())
                .with_emails(emails),
        )
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .find(id.as_i64())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_all(&self) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<UserRow> = users::table
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_user).collect()
    }

    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(diesel::dsl::exists(users::table.find(id.as_i64())))
            .get_result::<bool>(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn count(&self) -> Result<u64, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let total = users::table
            .count()
            .get_result::<i64>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        u64::try_from(total)
            .map_err(|_| UserPersistenceError::query(format!("negative row count {total}")))
    }

    async fn delete_by_id(&self, id: &UserId) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = id.as_i64();

        let deleted_rows = conn
            .transaction(|conn| {
                async move {
                    diesel::delete(emails::table.filter(emails::user_id.eq(user_id)))
                        .execute(conn)
                        .await?;
                    let deleted = diesel::delete(users::table.find(user_id))
                        .execute(conn)
                        .await?;
                    Ok::<_, UserPersistenceError>(deleted)
                }
                .scope_boxed()
            })
            .await?;

        Ok(deleted_rows > 0)
    }

    async fn list_emails_for_user(&self, id: &UserId) -> Result<Vec<Email>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<EmailRow> = emails::table
            .filter(emails::user_id.eq(id.as_i64()))
            .order(emails::id.asc())
            .select(EmailRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_email).collect()
    }
}
