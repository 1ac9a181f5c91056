//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. `id` columns default
//! to `nextval('user_seq')` and `nextval('email_seq')`, so inserts never
//! supply them.

diesel::table! {
    /// People owning email addresses.
    users (id) {
        /// Primary key drawn from `user_seq`.
        id -> Int8,
        first_name -> Varchar,
        last_name -> Varchar,
    }
}

diesel::table! {
    /// Email addresses, each owned by exactly one user.
    emails (id) {
        /// Primary key drawn from `email_seq`.
        id -> Int8,
        email -> Varchar,
        /// Owning user; `NOT NULL REFERENCES users (id)`.
        user_id -> Int8,
    }
}

diesel::joinable!(emails -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(emails, users);
