//! Conversions from external infrastructure errors into domain errors.

use kronos_domain::KronosError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub KronosError);

impl From<InfraError> for KronosError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<KronosError> for InfraError {
    fn from(value: KronosError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and
/// within this module.
trait IntoKronosError {
    fn into_kronos(self) -> KronosError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → KronosError */
/* -------------------------------------------------------------------------- */

impl IntoKronosError for SqlError {
    fn into_kronos(self) -> KronosError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        KronosError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        KronosError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / _PRIMARYKEY: the engine
                    // treats these as "already synced".
                    (ErrorCode::ConstraintViolation, 2067) | (ErrorCode::ConstraintViolation, 1555) => {
                        KronosError::Conflict("unique constraint violation".into())
                    }
                    // SQLITE_CONSTRAINT_CHECK: degenerate time range made it
                    // past application validation.
                    (ErrorCode::ConstraintViolation, 275) => {
                        KronosError::InvalidInput("check constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        KronosError::Database("foreign key constraint violation".into())
                    }
                    _ => KronosError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => KronosError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                KronosError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                KronosError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => KronosError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                KronosError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                KronosError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => KronosError::Database("invalid SQL query".into()),
            other => KronosError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_kronos())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → KronosError */
/* -------------------------------------------------------------------------- */

impl IntoKronosError for r2d2::Error {
    fn into_kronos(self) -> KronosError {
        KronosError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_kronos())
    }
}
