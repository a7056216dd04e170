//! Mapper-level error taxonomy.

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MapperResult<T> = Result<T, MapperError>;

/// Failure reported by a mapper operation or a contract callback.
#[derive(Debug)]
pub enum MapperError {
    /// Absent/blank identity, unbindable object, or no usable template.
    InvalidArgument(String),
    /// Update or delete addressed a row that does not exist.
    NotFound {
        table: &'static str,
        identity: String,
    },
    /// A write collided with an existing unique key.
    Conflict {
        table: &'static str,
        message: String,
    },
    /// The store returned rows the contract cannot translate.
    Integrity(String),
    Store(StoreError),
}

/// Table named by conversions that happen outside a mapper operation.
const UNKNOWN_TABLE: &str = "unknown";

impl MapperError {
    /// Classifies a store failure raised while working on `table`.
    pub fn from_store(table: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(message) => Self::Conflict { table, message },
            err @ (StoreError::ColumnOutOfRange { .. }
            | StoreError::ColumnType { .. }
            | StoreError::ColumnEncoding { .. }) => Self::Integrity(err.to_string()),
            other => Self::Store(other),
        }
    }

    /// Stable snake_case code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Integrity(_) => "integrity",
            Self::Store(_) => "store",
        }
    }
}

impl Display for MapperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::NotFound { table, identity } => {
                write!(f, "{table} row not found: {identity}")
            }
            Self::Conflict { table, message } => write!(f, "{table} conflict: {message}"),
            Self::Integrity(message) => write!(f, "integrity violation: {message}"),
            Self::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for MapperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for MapperError {
    fn from(value: StoreError) -> Self {
        Self::from_store(UNKNOWN_TABLE, value)
    }
}

#[cfg(test)]
mod tests {
    use super::MapperError;
    use crate::store::StoreError;
    use std::error::Error;

    #[test]
    fn store_errors_are_classified() {
        let conflict =
            MapperError::from_store("book", StoreError::UniqueViolation("book.isbn".to_string()));
        assert_eq!(conflict.code(), "conflict");
        assert!(matches!(conflict, MapperError::Conflict { table: "book", .. }));

        let untagged = MapperError::from(StoreError::UniqueViolation("book.isbn".to_string()));
        assert!(matches!(untagged, MapperError::Conflict { table: "unknown", .. }));

        let integrity = MapperError::from(StoreError::ColumnType {
            position: 4,
            expected: "real",
            found: "text",
        });
        assert_eq!(integrity.code(), "integrity");
        assert!(integrity.to_string().contains("column 4"));

        let encoding = MapperError::from_store("book", StoreError::ColumnEncoding { position: 2 });
        assert_eq!(encoding.code(), "integrity");
        assert!(encoding.to_string().contains("column 2 holds text"));

        let store = MapperError::from(StoreError::UnboundParameter(2));
        assert_eq!(store.code(), "store");
        assert!(store.source().is_some());
    }
}
