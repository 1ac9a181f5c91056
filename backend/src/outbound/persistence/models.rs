//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use diesel::prelude::*;

use super::schema::{emails, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// Insertable struct for creating user records; `id` comes from `user_seq`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Changeset struct rewriting every mutable user column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Row struct for reading from the emails table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = emails)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EmailRow {
    pub id: i64,
    pub email: String,
    pub user_id: i64,
}

/// Insertable struct for creating email records; `id` comes from `email_seq`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = emails)]
pub(crate) struct NewEmailRow<'a> {
    pub email: &'a str,
    pub user_id: i64,
}

/// Changeset struct for re-saving an already persisted email.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = emails)]
pub(crate) struct EmailUpdate<'a> {
    pub email: &'a str,
    pub user_id: i64,
}
