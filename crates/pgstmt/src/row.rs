//! Row mapping traits

use crate::error::{StmtError, StmtResult};
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust type.
///
/// ```ignore
/// struct Bank { id: i64, name: String }
///
/// impl FromRow for Bank {
///     fn from_row(row: &Row) -> StmtResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             name: row.try_get_column("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> StmtResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning StmtError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> StmtResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> StmtResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| StmtError::decode(column, e.to_string()))
    }
}
