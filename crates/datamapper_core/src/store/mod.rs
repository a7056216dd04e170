//! Relational store contract consumed by the mapper core.
//!
//! # Responsibility
//! - Describe the minimal prepare/bind/execute/query surface mappers need.
//! - Carry bound values and fetched rows in a backend-neutral shape.
//!
//! # Invariants
//! - Parameter and column positions are 1-based.
//! - A statement never executes with an unbound parameter slot.
//! - Backend failures stay inside `StoreError`; mappers translate them.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

mod sqlite;

pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Lower-level failure reported by a relational store.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A unique or primary-key constraint rejected the write.
    UniqueViolation(String),
    ParameterOutOfRange {
        position: usize,
        count: usize,
    },
    UnboundParameter(usize),
    ColumnOutOfRange {
        position: usize,
        count: usize,
    },
    ColumnType {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },
    /// A TEXT column held bytes that are not valid UTF-8.
    ColumnEncoding {
        position: usize,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::ParameterOutOfRange { position, count } => write!(
                f,
                "parameter position {position} is out of range for a statement with {count} parameters"
            ),
            Self::UnboundParameter(position) => {
                write!(f, "parameter at position {position} was never bound")
            }
            Self::ColumnOutOfRange { position, count } => write!(
                f,
                "column position {position} is out of range for a row with {count} columns"
            ),
            Self::ColumnType {
                position,
                expected,
                found,
            } => write!(f, "column {position} holds {found}, expected {expected}"),
            Self::ColumnEncoding { position } => {
                write!(f, "column {position} holds text that is not valid utf-8")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

/// One value bound into a statement or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl StoreValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for StoreValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for StoreValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for StoreValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for StoreValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<f32> for StoreValue {
    fn from(value: f32) -> Self {
        Self::Real(f64::from(value))
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for StoreValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<Vec<u8>> for StoreValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl From<Uuid> for StoreValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.hyphenated().to_string())
    }
}

impl<T: Into<StoreValue>> From<Option<T>> for StoreValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A prepared statement template with 1-based positional parameter slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    slots: Vec<Option<StoreValue>>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, parameter_count: usize) -> Self {
        Self {
            sql: sql.into(),
            slots: vec![None; parameter_count],
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    /// Binds `value` at 1-based `position`, overwriting any earlier binding.
    pub fn bind(&mut self, position: usize, value: impl Into<StoreValue>) -> StoreResult<()> {
        let count = self.slots.len();
        let slot = position
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(StoreError::ParameterOutOfRange { position, count })?;
        *slot = Some(value.into());
        Ok(())
    }

    /// Returns bound values in position order.
    ///
    /// # Errors
    /// - `UnboundParameter` for the first slot that was never bound.
    pub fn bound_values(&self) -> StoreResult<Vec<&StoreValue>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.as_ref().ok_or(StoreError::UnboundParameter(index + 1)))
            .collect()
    }
}

/// One fetched row, readable by 1-based column position.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    columns: Arc<[String]>,
    values: Vec<StoreValue>,
}

impl StoreRow {
    pub fn new(columns: Arc<[String]>, values: Vec<StoreValue>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_name(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .map(String::as_str)
    }

    pub fn value(&self, position: usize) -> StoreResult<&StoreValue> {
        position
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
            .ok_or(StoreError::ColumnOutOfRange {
                position,
                count: self.values.len(),
            })
    }

    pub fn text(&self, position: usize) -> StoreResult<&str> {
        match self.value(position)? {
            StoreValue::Text(value) => Ok(value.as_str()),
            other => Err(column_type(position, "text", other)),
        }
    }

    pub fn optional_text(&self, position: usize) -> StoreResult<Option<&str>> {
        match self.value(position)? {
            StoreValue::Null => Ok(None),
            StoreValue::Text(value) => Ok(Some(value.as_str())),
            other => Err(column_type(position, "text", other)),
        }
    }

    pub fn integer(&self, position: usize) -> StoreResult<i64> {
        match self.value(position)? {
            StoreValue::Integer(value) => Ok(*value),
            other => Err(column_type(position, "integer", other)),
        }
    }

    /// Reads a floating-point column; integer storage widens to `f64`.
    pub fn real(&self, position: usize) -> StoreResult<f64> {
        match self.value(position)? {
            StoreValue::Real(value) => Ok(*value),
            StoreValue::Integer(value) => Ok(*value as f64),
            other => Err(column_type(position, "real", other)),
        }
    }
}

fn column_type(position: usize, expected: &'static str, found: &StoreValue) -> StoreError {
    StoreError::ColumnType {
        position,
        expected,
        found: found.type_name(),
    }
}

/// Finite, forward-only sequence of fetched rows.
#[derive(Debug)]
pub struct RowSet {
    rows: std::vec::IntoIter<StoreRow>,
}

impl RowSet {
    pub fn new(rows: Vec<StoreRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl Iterator for RowSet {
    type Item = StoreRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RowSet {}

/// Backend surface consumed by `DataMapper`.
///
/// Calls may block on I/O. Implementations must not retry on their own.
pub trait RelationalStore {
    /// Validates `sql` against the backend and sizes its parameter slots.
    fn prepare(&self, sql: &str) -> StoreResult<Statement>;
    /// Runs an insert/update/delete and returns the affected-row count.
    fn execute(&self, statement: &Statement) -> StoreResult<usize>;
    /// Runs a query and returns its rows.
    fn execute_query(&self, statement: &Statement) -> StoreResult<RowSet>;
}

impl<S: RelationalStore + ?Sized> RelationalStore for &S {
    fn prepare(&self, sql: &str) -> StoreResult<Statement> {
        (**self).prepare(sql)
    }

    fn execute(&self, statement: &Statement) -> StoreResult<usize> {
        (**self).execute(statement)
    }

    fn execute_query(&self, statement: &Statement) -> StoreResult<RowSet> {
        (**self).execute_query(statement)
    }
}

impl<S: RelationalStore + ?Sized> RelationalStore for Arc<S> {
    fn prepare(&self, sql: &str) -> StoreResult<Statement> {
        (**self).prepare(sql)
    }

    fn execute(&self, statement: &Statement) -> StoreResult<usize> {
        (**self).execute(statement)
    }

    fn execute_query(&self, statement: &Statement) -> StoreResult<RowSet> {
        (**self).execute_query(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::{Statement, StoreError, StoreRow, StoreValue};
    use std::sync::Arc;

    fn sample_row() -> StoreRow {
        let columns: Arc<[String]> = ["isbn", "price", "note"]
            .into_iter()
            .map(String::from)
            .collect();
        StoreRow::new(
            columns,
            vec![
                StoreValue::from("978-X"),
                StoreValue::Integer(10),
                StoreValue::Null,
            ],
        )
    }

    #[test]
    fn bind_rejects_position_zero_and_past_end() {
        let mut statement = Statement::new("SELECT ?1, ?2", 2);
        assert!(matches!(
            statement.bind(0, "a"),
            Err(StoreError::ParameterOutOfRange {
                position: 0,
                count: 2
            })
        ));
        assert!(matches!(
            statement.bind(3, "a"),
            Err(StoreError::ParameterOutOfRange {
                position: 3,
                count: 2
            })
        ));
    }

    #[test]
    fn bound_values_reports_first_unbound_slot() {
        let mut statement = Statement::new("SELECT ?1, ?2", 2);
        statement.bind(1, "a").unwrap();
        assert!(matches!(
            statement.bound_values(),
            Err(StoreError::UnboundParameter(2))
        ));

        statement.bind(2, Option::<String>::None).unwrap();
        let values = statement.bound_values().unwrap();
        assert_eq!(values, vec![&StoreValue::from("a"), &StoreValue::Null]);
        assert!(!values[0].is_null());
        assert!(values[1].is_null());
    }

    #[test]
    fn row_reads_are_one_based_and_typed() {
        let row = sample_row();
        assert_eq!(row.text(1).unwrap(), "978-X");
        assert_eq!(row.column_name(2), Some("price"));
        assert_eq!(row.real(2).unwrap(), 10.0);
        assert_eq!(row.optional_text(3).unwrap(), None);

        assert!(matches!(
            row.text(0),
            Err(StoreError::ColumnOutOfRange { position: 0, .. })
        ));
        assert!(matches!(
            row.text(4),
            Err(StoreError::ColumnOutOfRange {
                position: 4,
                count: 3
            })
        ));
        assert!(matches!(
            row.text(2),
            Err(StoreError::ColumnType {
                expected: "text",
                found: "integer",
                ..
            })
        ));
    }
}
