//! Translation of pool and Diesel failures into port errors.

use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map a pool failure onto the repository port error.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    debug!(error = %error, "connection pool failure");
    RepositoryError::connection(error.to_string())
}

/// Map a Diesel failure onto the repository port error.
///
/// Connection losses surface as [`RepositoryError::Connection`] so callers
/// can distinguish transient unavailability from malformed queries or data.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> RepositoryError {
    debug!(error = %error, "diesel failure");
    match error {
        diesel::result::Error::BrokenTransactionManager
        | diesel::result::Error::AlreadyInTransaction => {
            RepositoryError::connection(error.to_string())
        }
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ClosedConnection,
            info,
        ) => RepositoryError::connection(info.message().to_owned()),
        other => RepositoryError::query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn broken_transaction_maps_to_connection() {
        let mapped = map_diesel_error(diesel::result::Error::BrokenTransactionManager);
        assert!(matches!(mapped, RepositoryError::Connection { .. }));
    }

    #[rstest]
    fn not_found_maps_to_query() {
        let mapped = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(mapped, RepositoryError::Query { .. }));
    }
}
