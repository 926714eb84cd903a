//! Values exchanged with executors: execution outcomes, row cursors and
//! deferred single rows.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio_rusqlite::rusqlite::types::{FromSql, ValueRef};

use crate::Error;

pub use tokio_rusqlite::rusqlite::types::Value;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: i64,
}

/// A single result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert the value at `idx` to `T`.
    pub fn get<T: FromSql>(&self, idx: usize) -> Result<T, Error> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| Error::Conversion(format!("column index {idx} out of range ({} columns)", self.len())))?;

        T::column_result(ValueRef::from(value)).map_err(|e| Error::Conversion(format!("column {idx}: {e}")))
    }

    /// Convert the value of the column called `name` to `T`.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, Error> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::Conversion(format!("no column named {name:?}")))?;
        self.get(idx)
    }
}

/// Cursor over the rows returned by a query.
///
/// Rows are materialized by the driver before the call returns; iterating
/// consumes them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    columns: Arc<[String]>,
    rows: VecDeque<Row>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows.into_iter().map(|values| Row::new(columns.clone(), values)).collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }
}

/// Result of a query expected to return at most one row.
///
/// Creating a `SingleRow` never fails. Any error from the query, including
/// [`Error::NoRows`], is held until the row is read.
#[derive(Debug)]
pub struct SingleRow {
    result: Result<Row, Error>,
}

impl SingleRow {
    pub fn no_rows() -> Self {
        Self { result: Err(Error::NoRows) }
    }

    /// Take the first row of `rows`, or a deferred [`Error::NoRows`].
    pub fn first_of(mut rows: Rows) -> Self {
        match rows.next() {
            Some(row) => Self { result: Ok(row) },
            None => Self::no_rows(),
        }
    }

    pub fn into_row(self) -> Result<Row, Error> {
        self.result
    }

    /// Read the value at `idx`, surfacing any deferred error.
    pub fn get<T: FromSql>(self, idx: usize) -> Result<T, Error> {
        self.result?.get(idx)
    }

    /// Whether reading this row would fail, without consuming it.
    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }
}

impl From<Row> for SingleRow {
    fn from(row: Row) -> Self {
        Self { result: Ok(row) }
    }
}

impl From<Error> for SingleRow {
    fn from(err: Error) -> Self {
        Self { result: Err(err) }
    }
}

impl From<Result<Row, Error>> for SingleRow {
    fn from(result: Result<Row, Error>) -> Self {
        Self { result }
    }
}
