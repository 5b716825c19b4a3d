//! SQLite storage layer.
//!
//! Both tiers are backed by SQLite with WAL mode and split read/write
//! connection pools. The durable tier and the fast tier live in separate
//! database files with separate migrations.

pub mod durable;
pub mod fast;
pub mod pool;


use chatstore_types::error::RepositoryError;

/// Convert a message id for binding. SQLite integers are signed.
pub(crate) fn bind_id(id: u64) -> Result<i64, RepositoryError> {
    i64::try_from(id).map_err(|_| RepositoryError::Query(format!("message id {id} exceeds storage range")))
}

/// The stored form of an id, or `None` for ids that can never have been
/// stored.
pub(crate) fn stored_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// Map `[start, end]` onto stored ids. `None` when no stored id can fall in
/// the range; an `end` above `i64::MAX` is clamped.
pub(crate) fn stored_range(start: u64, end: u64) -> Option<(i64, i64)> {
    if start > end {
        return None;
    }
    Some((stored_id(start)?, stored_id(end).unwrap_or(i64::MAX)))
}

pub(crate) fn read_id(raw: i64) -> Result<u64, RepositoryError> {
    u64::try_from(raw).map_err(|_| RepositoryError::Corrupt(format!("negative message id {raw}")))
}

pub(crate) fn query_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => RepositoryError::Connection,
        e => RepositoryError::Query(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_range_bounds() {
        let max = i64::MAX as u64;
        assert_eq!(stored_range(1, 5), Some((1, 5)));
        assert_eq!(stored_range(5, 1), None);
        assert_eq!(stored_range(max, u64::MAX), Some((i64::MAX, i64::MAX)));
        assert_eq!(stored_range(max + 1, u64::MAX), None);
        assert_eq!(stored_id(max + 1), None);
    }
}
