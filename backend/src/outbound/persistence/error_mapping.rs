//! Translation of pool and Diesel failures into [`UserPersistenceError`].

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::UserValidationError;
use crate::domain::ports::UserPersistenceError;

use super::pool::PoolError;

/// Map pool errors to repository connection errors.
pub(super) fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(error.to_string())
}

/// Map Diesel errors to repository errors, logging the raw failure.
pub(super) fn map_diesel_error(error: DieselError) -> UserPersistenceError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => UserPersistenceError::query("record not found"),
        DieselError::QueryBuilderError(_) => UserPersistenceError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserPersistenceError::connection("database connection error")
        }
        DieselError::DatabaseError(
            kind @ (DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::CheckViolation),
            info,
        ) => UserPersistenceError::constraint(describe_constraint(kind, info.as_ref())),
        _ => UserPersistenceError::query("database error"),
    }
}

fn describe_constraint(
    kind: DatabaseErrorKind,
    info: &(dyn DatabaseErrorInformation + Send + Sync),
) -> String {
    let label = match kind {
        DatabaseErrorKind::NotNullViolation => "not null",
        DatabaseErrorKind::ForeignKeyViolation => "foreign key",
        DatabaseErrorKind::UniqueViolation => "unique",
        _ => "check",
    };
    match info.constraint_name() {
        Some(name) => format!("{label} constraint {name}"),
        None => match info.column_name() {
            Some(column) => format!("{label} constraint on {column}"),
            None => format!("{label} constraint"),
        },
    }
}

/// Map a stored value that no longer satisfies domain validation.
pub(super) fn map_row_error(error: UserValidationError) -> UserPersistenceError {
    UserPersistenceError::query(format!("stored row failed validation: {error}"))
}

/// Lets `?` on Diesel results inside transactions yield repository errors.
impl From<DieselError> for UserPersistenceError {
    fn from(error: DieselError) -> Self {
        map_diesel_error(error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for error mapping.
    use super::*;
    use rstest::rstest;

    struct FakeInfo {
        constraint: Option<&'static str>,
        column: Option<&'static str>,
    }

    impl DatabaseErrorInformation for FakeInfo {
        fn message(&self) -> &str {
            "violation"
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            Some("emails")
        }

        fn column_name(&self) -> Option<&str> {
            self.column
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(
        kind: DatabaseErrorKind,
        constraint: Option<&'static str>,
        column: Option<&'static str>,
    ) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(FakeInfo { constraint, column }))
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::Checkout {
            message: "connection refused".to_owned(),
        });

        assert!(matches!(repo_err, UserPersistenceError::Connection { .. }));
        assert!(repo_err.to_string().contains("connection refused"));
    }

    #[rstest]
    fn not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(DieselError::NotFound);

        assert_eq!(repo_err, UserPersistenceError::query("record not found"));
    }

    #[rstest]
    fn closed_connection_maps_to_connection_error() {
        let repo_err = map_diesel_error(database_error(
            DatabaseErrorKind::ClosedConnection,
            None,
            None,
        ));

        assert!(matches!(repo_err, UserPersistenceError::Connection { .. }));
    }

    #[rstest]
    #[case(
        DatabaseErrorKind::ForeignKeyViolation,
        Some("emails_user_id_fkey"),
        None,
        "foreign key constraint emails_user_id_fkey"
    )]
    #[case(
        DatabaseErrorKind::NotNullViolation,
        None,
        Some("first_name"),
        "not null constraint on first_name"
    )]
    #[case(DatabaseErrorKind::UniqueViolation, None, None, "unique constraint")]
    fn constraint_kinds_map_to_constraint_error(
        #[case] kind: DatabaseErrorKind,
        #[case] constraint: Option<&'static str>,
        #[case] column: Option<&'static str>,
        #[case] expected: &str,
    ) {
        let repo_err = map_diesel_error(database_error(kind, constraint, column));

        assert_eq!(repo_err, UserPersistenceError::constraint(expected));
    }

    #[rstest]
    fn unknown_database_errors_map_to_query_error() {
        let repo_err = map_diesel_error(database_error(DatabaseErrorKind::Unknown, None, None));

        assert_eq!(repo_err, UserPersistenceError::query("database error"));
    }

    #[rstest]
    fn invalid_rows_map_to_query_error() {
        let repo_err = map_row_error(UserValidationError::NonPositiveId { value: 0 });

        assert!(matches!(repo_err, UserPersistenceError::Query { .. }));
        assert!(repo_err.to_string().contains("identifier must be positive"));
    }
}
