use aceload_core::AppError;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a driver error onto the shared error categories by SQLSTATE.
pub(crate) fn store_error(context: &str, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                return AppError::Serialization(format!("{context}: {database_error}"));
            }
            Some(UNIQUE_VIOLATION) => {
                return AppError::Conflict(format!("{context}: {database_error}"));
            }
            _ => {}
        }
    }

    if matches!(error, sqlx::Error::RowNotFound) {
        return AppError::NotFound(context.to_owned());
    }

    AppError::Internal(format!("{context}: {error}"))
}

#[cfg(test)]
mod tests {
    use aceload_core::AppError;

    use super::store_error;

    #[test]
    fn missing_rows_map_to_not_found() {
        let error = store_error("failed to find user '3'", sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::NotFound(message) if message.contains("user '3'")));
    }

    #[test]
    fn other_driver_errors_are_internal() {
        let error = store_error(
            "failed to insert group",
            sqlx::Error::Protocol("unexpected message".to_owned()),
        );
        assert!(matches!(error, AppError::Internal(_)));
        assert!(!error.is_retryable());
    }
}
